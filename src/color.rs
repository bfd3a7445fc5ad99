//! Color parsing: hex, rgb()/rgba(), hsl()/hsla() and structured color objects

use crate::error::{Result, TokenError};
use crate::types::Color;
use serde_json::{Map, Value};

const KIND: &str = "color";

impl Color {
    /// Build a color from 8-bit channels
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0,
            a as f64 / 255.0,
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            channel_to_u8(self.r),
            channel_to_u8(self.g),
            channel_to_u8(self.b),
            channel_to_u8(self.a),
        ]
    }

    /// `#rrggbb`, or `#rrggbbaa` when the color is not fully opaque
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == u8::MAX {
            format!("#{}", hex::encode([r, g, b]))
        } else {
            format!("#{}", hex::encode([r, g, b, a]))
        }
    }
}

fn channel_to_u8(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Parse any supported color notation
pub fn parse_color(raw: &Value) -> Result<Color> {
    match raw {
        Value::String(s) => parse_color_str(s),
        Value::Object(map) => parse_color_object(map),
        other => Err(TokenError::unsupported(KIND, other)),
    }
}

/// Parse a color string, dispatching on its leading characters
pub fn parse_color_str(color_str: &str) -> Result<Color> {
    let trimmed = color_str.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower == "transparent" {
        return Ok(Color::new(0.0, 0.0, 0.0, 0.0));
    }

    if lower.starts_with('#') {
        parse_hex(trimmed)
    } else if lower.starts_with("rgb") {
        parse_rgb_function(&lower)
    } else if lower.starts_with("hsl") {
        parse_hsl_function(&lower)
    } else {
        Err(TokenError::unsupported(KIND, color_str))
    }
}

/// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`
pub fn parse_hex(color_str: &str) -> Result<Color> {
    let trimmed = color_str.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    let expanded = match digits.len() {
        3 | 4 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 | 8 => digits.to_string(),
        _ => {
            return Err(TokenError::invalid(
                KIND,
                color_str,
                "expected 3, 4, 6, or 8 hex digits",
            ))
        }
    };

    let bytes = hex::decode(&expanded)
        .map_err(|e| TokenError::invalid(KIND, color_str, format!("invalid hex digits: {}", e)))?;

    let alpha = bytes.get(3).copied().unwrap_or(u8::MAX);
    Ok(Color::from_rgba8(bytes[0], bytes[1], bytes[2], alpha))
}

/// Split the argument list of a CSS color function, accepting commas,
/// whitespace and the `/` alpha separator.
fn function_args<'a>(input: &'a str, original: &str) -> Result<Vec<&'a str>> {
    let open = input.find('(');
    let close = input.rfind(')');
    let (open, close) = match (open, close) {
        (Some(o), Some(c)) if c > o => (o, c),
        _ => return Err(TokenError::invalid(KIND, original, "missing parentheses")),
    };

    Ok(input[open + 1..close]
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect())
}

fn parse_number(part: &str, original: &str) -> Result<f64> {
    part.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| TokenError::invalid(KIND, original, format!("'{}' is not a number", part)))
}

/// Alpha as a fraction, from either `0.5` or `50%`
fn parse_alpha(part: &str, original: &str) -> Result<f64> {
    let alpha = match part.strip_suffix('%') {
        Some(pct) => parse_number(pct, original)? / 100.0,
        None => parse_number(part, original)?,
    };
    if !(0.0..=1.0).contains(&alpha) {
        return Err(TokenError::invalid(KIND, original, format!("alpha {} out of range [0, 1]", part)));
    }
    Ok(alpha)
}

fn parse_rgb_function(input: &str) -> Result<Color> {
    let args = function_args(input, input)?;
    if args.len() != 3 && args.len() != 4 {
        return Err(TokenError::invalid(KIND, input, "expected 3 or 4 components"));
    }

    let mut channels = [0.0; 3];
    for (slot, part) in channels.iter_mut().zip(&args) {
        let value = match part.strip_suffix('%') {
            Some(pct) => parse_number(pct, input)? * 2.55,
            None => parse_number(part, input)?,
        };
        if !(0.0..=255.0).contains(&value) {
            return Err(TokenError::invalid(
                KIND,
                input,
                format!("channel {} out of range [0, 255]", part),
            ));
        }
        *slot = value / 255.0;
    }

    let alpha = match args.get(3) {
        Some(part) => parse_alpha(part, input)?,
        None => 1.0,
    };

    Ok(Color::new(channels[0], channels[1], channels[2], alpha))
}

fn parse_hsl_function(input: &str) -> Result<Color> {
    let args = function_args(input, input)?;
    if args.len() != 3 && args.len() != 4 {
        return Err(TokenError::invalid(KIND, input, "expected 3 or 4 components"));
    }

    let hue = parse_number(args[0].trim_end_matches("deg"), input)?;
    let saturation = parse_number(args[1].trim_end_matches('%'), input)?;
    let lightness = parse_number(args[2].trim_end_matches('%'), input)?;
    let alpha = match args.get(3) {
        Some(part) => parse_alpha(part, input)?,
        None => 1.0,
    };

    hsl_to_color(hue, saturation / 100.0, lightness / 100.0, alpha, input)
}

/// Standard HSL to RGB conversion. `s` and `l` are fractions.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (f64, f64, f64) {
    let h = h.rem_euclid(360.0) / 360.0;

    if s == 0.0 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn hsl_to_color(h: f64, s: f64, l: f64, alpha: f64, original: &str) -> Result<Color> {
    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&l) {
        return Err(TokenError::invalid(
            KIND,
            original,
            "saturation and lightness must lie in [0, 100]%",
        ));
    }
    let (r, g, b) = hsl_to_rgb(h, s, l);
    Ok(Color::new(r, g, b, alpha))
}

fn number_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| map.get(*key)).and_then(Value::as_f64)
}

fn object_alpha(map: &Map<String, Value>, original: &Value) -> Result<Option<f64>> {
    match number_field(map, &["alpha", "a"]) {
        Some(alpha) if (0.0..=1.0).contains(&alpha) => Ok(Some(alpha)),
        Some(alpha) => Err(TokenError::invalid(
            KIND,
            original,
            format!("alpha {} out of range [0, 1]", alpha),
        )),
        None => Ok(None),
    }
}

/// Parse a structured color. Dispatch order: `hex`, `r/g/b`, `h/s/l`, then
/// `{colorSpace, components}`.
pub fn parse_color_object(map: &Map<String, Value>) -> Result<Color> {
    let original = Value::Object(map.clone());
    let alpha = object_alpha(map, &original)?;

    if let Some(hex_value) = map.get("hex") {
        let hex_str = hex_value
            .as_str()
            .ok_or_else(|| TokenError::invalid(KIND, &original, "'hex' must be a string"))?;
        let mut color = parse_hex(hex_str)?;
        if let Some(a) = alpha {
            color.a = a;
        }
        return Ok(color);
    }

    if let (Some(r), Some(g), Some(b)) = (
        number_field(map, &["r"]),
        number_field(map, &["g"]),
        number_field(map, &["b"]),
    ) {
        // Channels above 1 mean the object is on the 0-255 scale
        let scale = if r > 1.0 || g > 1.0 || b > 1.0 { 255.0 } else { 1.0 };
        for channel in [r, g, b] {
            if channel < 0.0 || channel > scale {
                return Err(TokenError::invalid(
                    KIND,
                    &original,
                    format!("channel {} out of range", channel),
                ));
            }
        }
        return Ok(Color::new(r / scale, g / scale, b / scale, alpha.unwrap_or(1.0)));
    }

    if let (Some(h), Some(s), Some(l)) = (
        number_field(map, &["h"]),
        number_field(map, &["s"]),
        number_field(map, &["l"]),
    ) {
        let (s, l) = if s > 1.0 || l > 1.0 { (s / 100.0, l / 100.0) } else { (s, l) };
        return hsl_to_color(h, s, l, alpha.unwrap_or(1.0), &original.to_string());
    }

    if let Some(components) = map.get("components") {
        let mut color = match components {
            Value::Object(inner) => parse_color_object(inner)?,
            Value::Array(values) => {
                let space = map
                    .get("colorSpace")
                    .and_then(Value::as_str)
                    .unwrap_or("srgb");
                components_to_color(space, values, &original)?
            }
            _ => return Err(TokenError::unsupported(KIND, &original)),
        };
        if let Some(a) = alpha {
            color.a = a;
        }
        return Ok(color);
    }

    Err(TokenError::unsupported(KIND, &original))
}

fn components_to_color(space: &str, values: &[Value], original: &Value) -> Result<Color> {
    let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.len() != 3 || values.len() != 3 {
        return Err(TokenError::invalid(KIND, original, "expected 3 numeric components"));
    }

    match space.to_ascii_lowercase().as_str() {
        "srgb" => {
            if numbers.iter().any(|c| !(0.0..=1.0).contains(c)) {
                return Err(TokenError::invalid(KIND, original, "sRGB components must lie in [0, 1]"));
            }
            Ok(Color::new(numbers[0], numbers[1], numbers[2], 1.0))
        }
        "hsl" => hsl_to_color(
            numbers[0],
            numbers[1] / 100.0,
            numbers[2] / 100.0,
            1.0,
            &original.to_string(),
        ),
        _ => Err(TokenError::unsupported(KIND, original)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_parse_hex_lengths() {
        let color = parse_color_str("#FF0000").unwrap();
        assert_eq!(color, Color::new(1.0, 0.0, 0.0, 1.0));

        let color = parse_color_str("#fc4").unwrap();
        assert_eq!(color.to_rgba8(), [0xff, 0xcc, 0x44, 0xff]);

        let color = parse_color_str("#fc48").unwrap();
        assert_eq!(color.to_rgba8(), [0xff, 0xcc, 0x44, 0x88]);

        let color = parse_color_str("#12345678").unwrap();
        assert_eq!(color.to_rgba8(), [0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_all_hex_lengths_stay_in_unit_range() {
        for input in ["#000", "#fff", "#0f0a", "#abcdef", "#00000000", "#FFFFFFFF", "#7f7f7f80"] {
            let color = parse_color_str(input).unwrap();
            for channel in [color.r, color.g, color.b, color.a] {
                assert!((0.0..=1.0).contains(&channel), "{} produced {}", input, channel);
            }
        }
    }

    #[test]
    fn test_hex_round_trip() {
        for input in ["#111111", "#0a7bff", "#ffffff", "#12345678", "#00000080"] {
            let color = parse_color_str(input).unwrap();
            assert_eq!(color.to_hex(), input);
        }
        // fully opaque alpha is dropped
        assert_eq!(parse_color_str("#abcdefff").unwrap().to_hex(), "#abcdef");
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(parse_color_str("#12345"), Err(TokenError::InvalidValue { .. })));
        assert!(matches!(parse_color_str("#gggggg"), Err(TokenError::InvalidValue { .. })));
    }

    #[test]
    fn test_rgb_functions() {
        let color = parse_color_str("rgb(255, 128, 0)").unwrap();
        assert_eq!(color.to_rgba8(), [255, 128, 0, 255]);

        let color = parse_color_str("rgba(0, 0, 0, 0.5)").unwrap();
        assert_close(color.a, 0.5);

        let color = parse_color_str("rgb(0 0 255 / 25%)").unwrap();
        assert_close(color.b, 1.0);
        assert_close(color.a, 0.25);
    }

    #[test]
    fn test_rgb_out_of_range_is_rejected() {
        assert!(matches!(
            parse_color_str("rgb(256, 0, 0)"),
            Err(TokenError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_color_str("rgba(0, 0, 0, 2)"),
            Err(TokenError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_color_str("rgb(-1, 0, 0)"),
            Err(TokenError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_hsl_functions() {
        let red = parse_color_str("hsl(0, 100%, 50%)").unwrap();
        assert_eq!(red.to_rgba8(), [255, 0, 0, 255]);

        let green = parse_color_str("hsl(120deg 100% 25%)").unwrap();
        assert_eq!(green.to_rgba8(), [0, 128, 0, 255]);

        let gray = parse_color_str("hsla(200, 0%, 50%, 0.5)").unwrap();
        assert_close(gray.r, 0.5);
        assert_close(gray.a, 0.5);
    }

    #[test]
    fn test_color_objects() {
        let color = parse_color(&json!({ "hex": "#111111", "alpha": 0.5 })).unwrap();
        assert_eq!(color.to_rgba8(), [0x11, 0x11, 0x11, 128]);

        let color = parse_color(&json!({ "r": 1.0, "g": 0.5, "b": 0.0 })).unwrap();
        assert_close(color.g, 0.5);

        let color = parse_color(&json!({ "r": 255, "g": 0, "b": 0, "a": 1 })).unwrap();
        assert_eq!(color, Color::new(1.0, 0.0, 0.0, 1.0));

        let color = parse_color(&json!({ "h": 240, "s": 100, "l": 50 })).unwrap();
        assert_eq!(color.to_rgba8(), [0, 0, 255, 255]);
    }

    #[test]
    fn test_color_space_objects() {
        let color = parse_color(&json!({
            "colorSpace": "srgb",
            "components": [0.0, 0.5, 1.0],
            "alpha": 0.8
        }))
        .unwrap();
        assert_close(color.g, 0.5);
        assert_close(color.a, 0.8);

        let nested = parse_color(&json!({
            "colorSpace": "srgb",
            "components": { "colorSpace": "srgb", "components": [1.0, 1.0, 1.0] },
            "alpha": 0.5
        }))
        .unwrap();
        assert_eq!(nested, Color::new(1.0, 1.0, 1.0, 0.5));

        let hsl = parse_color(&json!({ "colorSpace": "hsl", "components": [0, 100, 50] })).unwrap();
        assert_eq!(hsl.to_rgba8(), [255, 0, 0, 255]);
    }

    #[test]
    fn test_unsupported_shapes() {
        let err = parse_color(&json!({ "foo": 1 })).unwrap_err();
        assert!(matches!(err, TokenError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("foo"));

        assert!(matches!(parse_color(&json!(42)), Err(TokenError::UnsupportedFormat { .. })));
        assert!(matches!(parse_color_str("papayawhip"), Err(TokenError::UnsupportedFormat { .. })));
        assert!(matches!(
            parse_color(&json!({ "colorSpace": "oklch", "components": [0.5, 0.1, 200] })),
            Err(TokenError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_transparent_keyword() {
        assert_eq!(parse_color_str("transparent").unwrap().a, 0.0);
    }
}
