//! Error types for the token converter

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Unsupported {kind} format: {value}")]
    UnsupportedFormat { kind: String, value: String },

    #[error("Invalid {kind} value '{value}': {message}")]
    InvalidValue { kind: String, value: String, message: String },

    #[error("Unresolved reference: {{{reference}}}")]
    UnresolvedReference { reference: String },

    #[error("Circular reference detected: {}", .cycle.join(" -> "))]
    CircularReference { cycle: Vec<String> },

    #[error("Kind mismatch for '{token}': declared {expected}, got {actual}")]
    KindValueMismatch { token: String, expected: String, actual: String },

    #[error("Reference {{{reference}}} depends on a failed token: {cause}")]
    DependencyFailed { reference: String, cause: Box<TokenError> },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, TokenError>;

impl TokenError {
    pub fn unsupported(kind: impl Into<String>, value: impl ToString) -> Self {
        Self::UnsupportedFormat {
            kind: kind.into(),
            value: value.to_string(),
        }
    }

    pub fn invalid(kind: impl Into<String>, value: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind: kind.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    pub fn unresolved(reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
        }
    }

    pub fn mismatch(token: impl Into<String>, expected: impl ToString, actual: impl ToString) -> Self {
        Self::KindValueMismatch {
            token: token.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Short, stable name of the error class, used in import reports
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported-format",
            Self::InvalidValue { .. } => "invalid-value",
            Self::UnresolvedReference { .. } => "unresolved-reference",
            Self::CircularReference { .. } => "circular-reference",
            Self::KindValueMismatch { .. } => "kind-value-mismatch",
            Self::DependencyFailed { .. } => "dependency-failed",
            Self::Io { .. } => "io",
            Self::FileNotFound { .. } => "file-not-found",
            Self::InvalidFormat { .. } => "invalid-format",
        }
    }

    /// The root error after unwrapping any dependency chain
    pub fn root_cause(&self) -> &TokenError {
        match self {
            Self::DependencyFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for TokenError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidFormat {
            message: format!("Invalid JSON: {}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single per-token finding recorded during conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub token: String,
    pub severity: Severity,
    pub category: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(token: impl Into<String>, err: &TokenError) -> Self {
        Self {
            token: token.into(),
            severity: Severity::Error,
            category: err.category(),
            message: err.to_string(),
        }
    }

    pub fn warning(token: impl Into<String>, err: &TokenError) -> Self {
        Self {
            token: token.into(),
            severity: Severity::Warning,
            category: err.category(),
            message: err.to_string(),
        }
    }
}
