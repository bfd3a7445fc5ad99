//! Design Token Converter
//!
//! Normalizes design-token definitions written in mixed notations into one
//! canonical value per kind, and resolves `{alias}` references between tokens
//! so every token ends up with a concrete value.
//!
//! # Features
//!
//! - Colors from hex, `rgb()`/`rgba()`, `hsl()`/`hsla()` and object notations
//! - Dimensions in px, rem, em, %, pt with pixel conversion against a base font size
//! - Typography and shadow composites that degrade per field instead of failing
//! - Durations, cubic beziers and light scalar coercion
//! - Alias resolution with cycle detection and tiered, explainable lookup
//! - Incremental imports that keep token ids stable
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use tokenc::{convert_files, ConverterOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let report = convert_files(&["tokens.json"], ConverterOptions::default())?;
//!     println!("{} tokens", report.tokens.len());
//!     Ok(())
//! }
//! ```
//!
//! # Conversion Pipeline
//!
//! 1. **Intake**: merge inputs, flatten file wrappers, collect `$value` leaves
//! 2. **Classify**: each leaf is an alias or a literal of a declared or detected kind
//! 3. **Parse**: literals are normalized by the value parsers
//! 4. **Index**: every token is registered under its qualified name
//! 5. **Resolve**: aliases are resolved in dependency order with cycle protection
//! 6. **Report**: created / updated / skipped counts and per-token diagnostics

pub mod types;
pub mod error;
pub mod color;
pub mod dimension;
pub mod typography;
pub mod shadow;
pub mod scalar;
pub mod detect;
pub mod reference;
pub mod token;
pub mod index;
pub mod resolver;
pub mod source;
pub mod converter;
pub mod cli;

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

// Re-export commonly used types and functions
pub use error::{Diagnostic, Result, Severity, TokenError};
pub use types::*;
pub use color::parse_color;
pub use dimension::{parse_dimension, to_pixels};
pub use typography::{parse_font_family, parse_font_weight, parse_typography};
pub use shadow::parse_shadow;
pub use detect::detect_kind;
pub use reference::{parse_reference, Reference};
pub use token::{Token, TokenContent, TokenId, TokenSet};
pub use index::{LookupExplanation, LookupHit, LookupTier, TokenIndex};
pub use resolver::{ReferenceResolver, ResolutionReport, ResolutionState};
pub use converter::{parse_value, ImportReport, TokenConverter};
pub use cli::TokenCli;

/// Converter version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Conversion options and settings
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// Collection the tokens belong to; also stripped from references
    pub collection: String,

    /// Base font size in pixels for rem/em/% conversion
    pub base_font_size: f64,

    /// Collection prefixes stripped from references before lookup
    pub collection_prefixes: Vec<String>,

    /// Separator joining path segments into qualified names
    pub name_separator: String,

    /// Enable debug mode with per-token logging
    pub debug_mode: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            collection: "tokens".to_string(),
            base_font_size: DEFAULT_BASE_FONT_SIZE,
            collection_prefixes: DEFAULT_COLLECTION_PREFIXES.iter().map(|p| p.to_string()).collect(),
            name_separator: "/".to_string(),
            debug_mode: false,
        }
    }
}

/// Import statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    /// Tokens that did not exist before this import
    pub created: usize,

    /// Tokens that replaced an earlier token of the same name and kind
    pub updated: usize,

    /// Tokens that failed to parse or resolve
    pub skipped: usize,

    /// Aliases that received a resolved value
    pub aliases_resolved: usize,

    /// Non-fatal findings, e.g. composite fields that fell back to defaults
    pub warnings: usize,
}

/// Convert an already merged token tree
pub fn convert_tree(root: Value, options: ConverterOptions) -> Result<ImportReport> {
    TokenConverter::new(options).convert(root)
}

/// Deep-merge several token documents, later documents winning, then convert
pub fn convert_documents(documents: Vec<Value>, options: ConverterOptions) -> Result<ImportReport> {
    convert_tree(source::merge_all(documents), options)
}

/// Convert a JSON string
pub fn convert_str(json: &str, options: ConverterOptions) -> Result<ImportReport> {
    let root: Value = serde_json::from_str(json)?;
    convert_tree(root, options)
}

/// Convert token files and directories of `*.json` files
pub fn convert_files<P: AsRef<Path>>(inputs: &[P], options: ConverterOptions) -> Result<ImportReport> {
    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::debug!("Converter options: {:?}", options);
    }
    let root = source::load_files(inputs)?;
    convert_tree(root, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_convert_files_merges_sources() {
        let temp_dir = TempDir::new().unwrap();
        let primitives = temp_dir.path().join("primitives.json");
        let semantic = temp_dir.path().join("semantic.json");

        fs::write(
            &primitives,
            r##"{ "primitive": { "color": { "gray": { "900": { "$value": "#111111" } } } } }"##,
        )
        .unwrap();
        fs::write(
            &semantic,
            r##"{ "semantic": { "color": { "text": { "$value": "{primitive.color.gray.900}", "$type": "color" } } } }"##,
        )
        .unwrap();

        let report = convert_files(&[&primitives, &semantic], ConverterOptions::default()).unwrap();

        assert_eq!(report.stats.created, 2);
        assert_eq!(report.stats.skipped, 0);
        let text = report.tokens.get("semantic/color/text").unwrap();
        assert_eq!(
            text.resolved_value().and_then(|v| v.as_color()).map(|c| c.to_hex()),
            Some("#111111".to_string())
        );
    }

    #[test]
    fn test_convert_documents_later_wins() {
        let report = convert_documents(
            vec![
                json!({ "space": { "md": { "$value": "8px" } } }),
                json!({ "space": { "md": { "$value": "1rem" } } }),
            ],
            ConverterOptions::default(),
        )
        .unwrap();

        let md = report.tokens.get("space/md").unwrap();
        assert_eq!(md.value().and_then(|v| v.as_dimension()).map(|d| d.to_pixels(16.0)), Some(16.0));
    }

    #[test]
    fn test_custom_base_font_size_and_separator() {
        let options = ConverterOptions {
            base_font_size: 10.0,
            name_separator: ".".to_string(),
            ..Default::default()
        };
        let report = convert_str(r#"{ "type": { "body": { "$value": "1.5rem", "$type": "fontSize" } } }"#, options).unwrap();
        let body = report.tokens.get("type.body").unwrap();
        assert_eq!(body.kind(), TokenKind::FontSize);
        assert_eq!(body.value().and_then(|v| v.as_dimension()).map(|d| d.to_pixels(10.0)), Some(15.0));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = convert_str("{ nope", ConverterOptions::default()).unwrap_err();
        assert!(matches!(err, TokenError::InvalidFormat { .. }));
    }

    #[test]
    fn test_report_serializes() {
        let report = convert_str(r#"{ "opacity": { "half": { "$value": 0.5 } } }"#, ConverterOptions::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["created"], 1);
        assert_eq!(json["tokens"]["tokens"][0]["qualifiedName"], "opacity/half");
    }
}
