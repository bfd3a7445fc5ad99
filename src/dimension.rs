//! Dimension parsing and pixel conversion
//!
//! `%` and `em` have no real parent element here, so both are approximated
//! against the configured base font size.

use crate::error::{Result, TokenError};
use crate::types::{Dimension, DimensionUnit, PT_TO_PX};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const KIND: &str = "dimension";

fn dimension_regex() -> &'static Regex {
    static DIMENSION_RE: OnceLock<Regex> = OnceLock::new();
    DIMENSION_RE.get_or_init(|| {
        Regex::new(r"^(-?[\d.]+)\s*([a-z%]*)$").expect("dimension pattern is valid")
    })
}

impl Dimension {
    /// Pixel equivalent using `base_font_size` for rem/em/% units
    pub fn to_pixels(&self, base_font_size: f64) -> f64 {
        match self.unit {
            DimensionUnit::Px => self.value,
            DimensionUnit::Rem | DimensionUnit::Em => self.value * base_font_size,
            DimensionUnit::Pt => self.value * PT_TO_PX,
            DimensionUnit::Percent => self.value * base_font_size / 100.0,
        }
    }
}

/// Parse a number (pixels), a `<number><unit>` string, or a `{value, unit}` object
pub fn parse_dimension(raw: &Value) -> Result<Dimension> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map(Dimension::px)
            .ok_or_else(|| TokenError::invalid(KIND, raw, "not a finite number")),
        Value::String(s) => parse_dimension_str(s),
        Value::Object(map) => {
            let value = map
                .get("value")
                .and_then(Value::as_f64)
                .ok_or_else(|| TokenError::unsupported(KIND, raw))?;
            let unit_str = map.get("unit").and_then(Value::as_str).unwrap_or("px");
            let unit = DimensionUnit::from_suffix(&unit_str.to_ascii_lowercase())
                .ok_or_else(|| TokenError::unsupported(KIND, raw))?;
            Ok(Dimension::new(value, unit))
        }
        other => Err(TokenError::unsupported(KIND, other)),
    }
}

pub fn parse_dimension_str(input: &str) -> Result<Dimension> {
    let normalized = input.trim().to_ascii_lowercase();

    let captures = dimension_regex()
        .captures(&normalized)
        .ok_or_else(|| TokenError::unsupported(KIND, input))?;

    let value: f64 = captures[1]
        .parse()
        .map_err(|_| TokenError::invalid(KIND, input, format!("'{}' is not a number", &captures[1])))?;

    let unit = DimensionUnit::from_suffix(&captures[2]).ok_or_else(|| {
        TokenError::invalid(KIND, input, format!("unrecognized unit '{}'", &captures[2]))
    })?;

    Ok(Dimension::new(value, unit))
}

/// Parse any dimension notation straight to pixels
pub fn to_pixels(raw: &Value, base_font_size: f64) -> Result<f64> {
    parse_dimension(raw).map(|d| d.to_pixels(base_font_size))
}
