//! Scalar parsers with light coercion

use crate::error::{Result, TokenError};
use crate::types::{CubicBezier, Duration};
use serde_json::Value;

pub fn parse_number(raw: &Value) -> Result<f64> {
    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => return Err(TokenError::unsupported("number", other)),
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| TokenError::invalid("number", raw, "not a finite number"))
}

pub fn parse_string(raw: &Value) -> Result<String> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(TokenError::unsupported("string", other)),
    }
}

pub fn parse_boolean(raw: &Value) -> Result<bool> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(TokenError::invalid("boolean", s, "expected 'true' or 'false'")),
        },
        other => Err(TokenError::unsupported("boolean", other)),
    }
}

/// Numbers are milliseconds; strings accept `ms` and `s` suffixes
pub fn parse_duration(raw: &Value) -> Result<Duration> {
    let millis = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim().to_ascii_lowercase();
            if let Some(ms) = trimmed.strip_suffix("ms") {
                ms.trim().parse::<f64>().ok()
            } else if let Some(secs) = trimmed.strip_suffix('s') {
                secs.trim().parse::<f64>().ok().map(|v| v * 1000.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Object(map) => {
            let value = map.get("value").and_then(Value::as_f64);
            match map.get("unit").and_then(Value::as_str) {
                Some("s") => value.map(|v| v * 1000.0),
                Some("ms") | None => value,
                Some(_) => None,
            }
        }
        other => return Err(TokenError::unsupported("duration", other)),
    };

    let millis = millis
        .filter(|v| v.is_finite())
        .ok_or_else(|| TokenError::invalid("duration", raw, "expected a number with optional ms/s unit"))?;
    if millis < 0.0 {
        return Err(TokenError::invalid("duration", raw, "duration must not be negative"));
    }
    Ok(Duration { millis })
}

/// `[x1, y1, x2, y2]` or `cubic-bezier(x1, y1, x2, y2)`
pub fn parse_cubic_bezier(raw: &Value) -> Result<CubicBezier> {
    let points: Vec<f64> = match raw {
        Value::Array(items) => items.iter().filter_map(Value::as_f64).collect(),
        Value::String(s) => {
            let inner = s
                .trim()
                .strip_prefix("cubic-bezier(")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| TokenError::unsupported("cubicBezier", s))?;
            inner
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| TokenError::invalid("cubicBezier", s, "control points must be numbers"))?
        }
        other => return Err(TokenError::unsupported("cubicBezier", other)),
    };

    let &[x1, y1, x2, y2] = points.as_slice() else {
        return Err(TokenError::invalid("cubicBezier", raw, "expected exactly 4 control values"));
    };
    if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
        return Err(TokenError::invalid("cubicBezier", raw, "x coordinates must lie in [0, 1]"));
    }
    Ok(CubicBezier { x1, y1, x2, y2 })
}
