//! Kind inference for values that carry no `$type`

use crate::types::TokenKind;
use serde_json::Value;

/// Infer the most likely kind from the shape of a raw value
pub fn detect_kind(raw: &Value) -> TokenKind {
    match raw {
        Value::String(s) => detect_string_kind(s),
        Value::Array(_) => TokenKind::Typography,
        Value::Number(_) => TokenKind::Number,
        Value::Bool(_) => TokenKind::Boolean,
        _ => TokenKind::String,
    }
}

fn detect_string_kind(input: &str) -> TokenKind {
    let lower = input.trim().to_ascii_lowercase();

    if lower.starts_with('#') || lower.starts_with("rgb") || lower.starts_with("hsl") {
        TokenKind::Color
    } else if lower.ends_with("px") || lower.ends_with("rem") {
        TokenKind::Dimension
    } else if lower.contains("px") {
        TokenKind::Spacing
    } else {
        TokenKind::String
    }
}

/// Declared kind wins; otherwise infer
pub fn resolve_kind(declared: Option<&str>, raw: &Value) -> TokenKind {
    match declared {
        Some(name) => TokenKind::from_name(name),
        None => detect_kind(raw),
    }
}
