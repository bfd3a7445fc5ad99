//! Shadow parsing. A shadow token is a single layer object or a list of layers.

use crate::color::parse_color;
use crate::dimension::parse_dimension;
use crate::error::{Result, TokenError};
use crate::types::{Dimension, Parsed, ShadowLayer};
use serde_json::{Map, Value};

const KIND: &str = "shadow";

pub fn parse_shadow(raw: &Value) -> Result<Parsed<Vec<ShadowLayer>>> {
    match raw {
        Value::Object(map) => parse_layer(map).map(|parsed| parsed.map(|layer| vec![layer])),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(TokenError::invalid(KIND, raw, "empty shadow list"));
            }
            let mut layers = Vec::with_capacity(items.len());
            let mut warnings = Vec::new();
            for item in items {
                let map = item
                    .as_object()
                    .ok_or_else(|| TokenError::unsupported(KIND, item))?;
                let parsed = parse_layer(map)?;
                layers.push(parsed.value);
                warnings.extend(parsed.warnings);
            }
            Ok(Parsed { value: layers, warnings })
        }
        other => Err(TokenError::unsupported(KIND, other)),
    }
}

fn length_field(
    map: &Map<String, Value>,
    names: &[&str],
    allow_negative: bool,
    warnings: &mut Vec<TokenError>,
) -> Dimension {
    let Some(raw) = names.iter().find_map(|name| map.get(*name)) else {
        return Dimension::px(0.0);
    };

    match parse_dimension(raw) {
        Ok(d) if !allow_negative && d.value < 0.0 => {
            warnings.push(TokenError::invalid(KIND, raw, format!("{} must not be negative", names[0])));
            Dimension::px(0.0)
        }
        Ok(d) => d,
        Err(err) => {
            warnings.push(err);
            Dimension::px(0.0)
        }
    }
}

fn parse_layer(map: &Map<String, Value>) -> Result<Parsed<ShadowLayer>> {
    let mut warnings = Vec::new();
    let defaults = ShadowLayer::default();

    let offset_x = length_field(map, &["offsetX", "x"], true, &mut warnings);
    let offset_y = length_field(map, &["offsetY", "y"], true, &mut warnings);
    let blur = length_field(map, &["blur", "blurRadius"], false, &mut warnings);
    let spread = length_field(map, &["spread", "spreadRadius"], true, &mut warnings);

    let color = match map.get("color") {
        Some(raw) => parse_color(raw).unwrap_or_else(|err| {
            warnings.push(err);
            defaults.color
        }),
        None => defaults.color,
    };

    let inset = map.get("inset").and_then(Value::as_bool).unwrap_or(false)
        || map.get("type").and_then(Value::as_str) == Some("innerShadow");

    Ok(Parsed {
        value: ShadowLayer {
            offset_x,
            offset_y,
            blur,
            spread,
            color,
            inset,
        },
        warnings,
    })
}
