//! Font and typography parsing
//!
//! The composite parser never fails on a bad sub-field: it falls back to the
//! field default and records the failure as a warning.

use crate::dimension::{parse_dimension, parse_dimension_str};
use crate::error::{Result, TokenError};
use crate::types::*;
use serde_json::{Map, Value};

/// Named weights, matched after lowercasing and dropping separators
const NAMED_WEIGHTS: &[(&str, u16)] = &[
    ("thin", 100),
    ("hairline", 100),
    ("extralight", 200),
    ("ultralight", 200),
    ("light", 300),
    ("regular", 400),
    ("normal", 400),
    ("book", 400),
    ("medium", 500),
    ("semibold", 600),
    ("demibold", 600),
    ("bold", 700),
    ("extrabold", 800),
    ("ultrabold", 800),
    ("black", 900),
    ("heavy", 900),
];

/// Unitless line heights up to this value are read as multipliers of the font size
const LINE_HEIGHT_MULTIPLIER_LIMIT: f64 = 3.0;

pub fn parse_font_weight(raw: &Value) -> Result<FontWeight> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(FontWeight::from_numeric)
            .ok_or_else(|| TokenError::invalid("fontWeight", raw, "not a finite number")),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(numeric) = trimmed.parse::<f64>() {
                if numeric.is_finite() {
                    return Ok(FontWeight::from_numeric(numeric));
                }
            }

            let key: String = trimmed
                .chars()
                .filter(|c| !matches!(c, '-' | '_' | ' '))
                .flat_map(char::to_lowercase)
                .collect();

            NAMED_WEIGHTS
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, weight)| FontWeight::from_numeric(*weight as f64))
                .ok_or_else(|| TokenError::invalid("fontWeight", s, "unknown font weight name"))
        }
        other => Err(TokenError::unsupported("fontWeight", other)),
    }
}

/// First family of a font stack, trimmed and unquoted
pub fn parse_font_family(raw: &Value) -> Result<String> {
    let first = match raw {
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| TokenError::invalid("fontFamily", raw, "expected a non-empty list of names"))?,
        Value::String(s) => s.split(',').next().unwrap_or_default(),
        other => return Err(TokenError::unsupported("fontFamily", other)),
    };

    let family = first.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if family.is_empty() {
        return Err(TokenError::invalid("fontFamily", raw, "empty family name"));
    }
    Ok(family.to_string())
}

pub fn parse_line_height(raw: &Value, base_font_size: f64) -> Result<LineHeight> {
    match raw {
        Value::Number(n) => {
            let value = n
                .as_f64()
                .ok_or_else(|| TokenError::invalid("lineHeight", raw, "not a finite number"))?;
            Ok(unitless_line_height(value))
        }
        Value::String(s) => {
            let trimmed = s.trim().to_ascii_lowercase();
            if trimmed == "auto" || trimmed == "normal" {
                return Ok(LineHeight::Auto);
            }
            if let Ok(value) = trimmed.parse::<f64>() {
                return Ok(unitless_line_height(value));
            }
            let dimension = parse_dimension_str(&trimmed)?;
            Ok(match dimension.unit {
                DimensionUnit::Percent => LineHeight::Percent(dimension.value),
                _ => LineHeight::Pixels(dimension.to_pixels(base_font_size)),
            })
        }
        Value::Object(_) => {
            let dimension = parse_dimension(raw)?;
            Ok(LineHeight::Pixels(dimension.to_pixels(base_font_size)))
        }
        other => Err(TokenError::unsupported("lineHeight", other)),
    }
}

fn unitless_line_height(value: f64) -> LineHeight {
    if value <= LINE_HEIGHT_MULTIPLIER_LIMIT {
        LineHeight::Percent(value * 100.0)
    } else {
        LineHeight::Pixels(value)
    }
}

pub fn parse_letter_spacing(raw: &Value, base_font_size: f64) -> Result<LetterSpacing> {
    let dimension = parse_dimension(raw).map_err(|err| match err {
        TokenError::UnsupportedFormat { value, .. } => TokenError::UnsupportedFormat {
            kind: "letterSpacing".to_string(),
            value,
        },
        other => other,
    })?;

    Ok(match dimension.unit {
        DimensionUnit::Percent => LetterSpacing::Percent(dimension.value),
        // em spacing is relative to the font size
        DimensionUnit::Em => LetterSpacing::Percent(dimension.value * 100.0),
        _ => LetterSpacing::Pixels(dimension.to_pixels(base_font_size)),
    })
}

fn field<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| map.get(*name))
}

/// Record a sub-field failure and fall back to `default`
fn or_default<T>(result: Result<T>, default: T, field_name: &str, warnings: &mut Vec<TokenError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            log::debug!("typography field '{}' fell back to default: {}", field_name, err);
            warnings.push(err);
            default
        }
    }
}

const POSITIONAL_FIELDS: [&str; 5] = ["fontFamily", "fontSize", "fontWeight", "lineHeight", "letterSpacing"];

/// Parse a composite typography object, or a positional array
/// `[family, size, weight, lineHeight, letterSpacing]`
pub fn parse_typography(raw: &Value, base_font_size: f64) -> Result<Parsed<Typography>> {
    let positional;
    let map = match raw {
        Value::Object(map) => map,
        Value::Array(items) if !items.is_empty() && items.len() <= POSITIONAL_FIELDS.len() => {
            positional = POSITIONAL_FIELDS
                .iter()
                .zip(items)
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect::<Map<String, Value>>();
            &positional
        }
        _ => return Err(TokenError::unsupported("typography", raw)),
    };

    let defaults = Typography::default();
    let mut warnings = Vec::new();

    let font_family = match field(map, &["fontFamily", "font_family", "font-family"]) {
        Some(value) => or_default(parse_font_family(value), defaults.font_family, "fontFamily", &mut warnings),
        None => defaults.font_family,
    };

    let font_size = match field(map, &["fontSize", "font_size", "font-size"]) {
        Some(value) => or_default(parse_dimension(value), defaults.font_size, "fontSize", &mut warnings),
        None => defaults.font_size,
    };

    let font_weight = match field(map, &["fontWeight", "font_weight", "font-weight"]) {
        Some(value) => or_default(parse_font_weight(value), defaults.font_weight, "fontWeight", &mut warnings),
        None => defaults.font_weight,
    };

    let line_height = field(map, &["lineHeight", "line_height", "line-height"]).and_then(|value| {
        match parse_line_height(value, base_font_size) {
            Ok(lh) => Some(lh),
            Err(err) => {
                warnings.push(err);
                None
            }
        }
    });

    let letter_spacing = field(map, &["letterSpacing", "letter_spacing", "letter-spacing"]).and_then(|value| {
        match parse_letter_spacing(value, base_font_size) {
            Ok(ls) => Some(ls),
            Err(err) => {
                warnings.push(err);
                None
            }
        }
    });

    Ok(Parsed {
        value: Typography {
            font_family,
            font_size,
            font_weight,
            line_height,
            letter_spacing,
        },
        warnings,
    })
}
