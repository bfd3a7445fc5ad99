//! Core types and constants for the token converter

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TokenError;

// Conversion constants
pub const DEFAULT_BASE_FONT_SIZE: f64 = 16.0;
pub const PT_TO_PX: f64 = 1.333333;
pub const DEFAULT_FONT_FAMILY: &str = "Inter";
pub const DEFAULT_FONT_WEIGHT: u16 = 400;
pub const MIN_FONT_WEIGHT: u16 = 100;
pub const MAX_FONT_WEIGHT: u16 = 900;

/// Collection prefixes stripped from references before lookup
pub const DEFAULT_COLLECTION_PREFIXES: &[&str] = &["primitive", "semantic"];

// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Color,
    Dimension,
    FontSize,
    FontWeight,
    FontFamily,
    LineHeight,
    LetterSpacing,
    Spacing,
    Shadow,
    Duration,
    CubicBezier,
    Number,
    String,
    Boolean,
    Typography,
    Other,
}

impl TokenKind {
    /// Map a `$type` marker to a kind. Unknown names map to `Other`.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "color" | "colors" => Self::Color,
            "dimension" | "sizing" | "size" | "borderradius" | "borderwidth" => Self::Dimension,
            "fontsize" | "fontsizes" => Self::FontSize,
            "fontweight" | "fontweights" => Self::FontWeight,
            "fontfamily" | "fontfamilies" => Self::FontFamily,
            "lineheight" | "lineheights" => Self::LineHeight,
            "letterspacing" => Self::LetterSpacing,
            "spacing" => Self::Spacing,
            "shadow" | "boxshadow" => Self::Shadow,
            "duration" | "transition" => Self::Duration,
            "cubicbezier" => Self::CubicBezier,
            "number" | "opacity" => Self::Number,
            "string" | "text" => Self::String,
            "boolean" => Self::Boolean,
            "typography" => Self::Typography,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Dimension => "dimension",
            Self::FontSize => "fontSize",
            Self::FontWeight => "fontWeight",
            Self::FontFamily => "fontFamily",
            Self::LineHeight => "lineHeight",
            Self::LetterSpacing => "letterSpacing",
            Self::Spacing => "spacing",
            Self::Shadow => "shadow",
            Self::Duration => "duration",
            Self::CubicBezier => "cubicBezier",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Typography => "typography",
            Self::Other => "other",
        }
    }

    fn is_length(&self) -> bool {
        matches!(
            self,
            Self::Dimension | Self::FontSize | Self::Spacing | Self::LineHeight | Self::LetterSpacing
        )
    }

    /// Whether a value of kind `other` may stand in for a token declared as `self`.
    ///
    /// Length-like kinds are interchangeable, plain numbers are accepted wherever a
    /// numeric quantity is expected, and `Other` accepts anything.
    pub fn is_compatible_with(&self, other: TokenKind) -> bool {
        if *self == other || *self == Self::Other || other == Self::Other {
            return true;
        }
        if self.is_length() && other.is_length() {
            return true;
        }
        match (*self, other) {
            (k, Self::Number) | (Self::Number, k) => {
                k.is_length() || matches!(k, Self::FontWeight | Self::Duration)
            }
            (Self::String, Self::FontFamily) | (Self::FontFamily, Self::String) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized RGBA color, every channel in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DimensionUnit {
    #[serde(rename = "px")]
    Px,
    #[serde(rename = "rem")]
    Rem,
    #[serde(rename = "em")]
    Em,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "pt")]
    Pt,
}

impl DimensionUnit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" | "px" => Some(Self::Px),
            "rem" => Some(Self::Rem),
            "em" => Some(Self::Em),
            "%" => Some(Self::Percent),
            "pt" => Some(Self::Pt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Rem => "rem",
            Self::Em => "em",
            Self::Percent => "%",
            Self::Pt => "pt",
        }
    }
}

impl fmt::Display for DimensionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimension {
    pub value: f64,
    pub unit: DimensionUnit,
}

impl Dimension {
    pub fn new(value: f64, unit: DimensionUnit) -> Self {
        Self { value, unit }
    }

    pub fn px(value: f64) -> Self {
        Self::new(value, DimensionUnit::Px)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Font weight on the 100-step scale, always within [100, 900]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FontWeight(u16);

impl FontWeight {
    pub const REGULAR: FontWeight = FontWeight(DEFAULT_FONT_WEIGHT);

    /// Round to the nearest hundred and clamp into range
    pub fn from_numeric(value: f64) -> Self {
        let rounded = (value / 100.0).round() * 100.0;
        let clamped = rounded.clamp(MIN_FONT_WEIGHT as f64, MAX_FONT_WEIGHT as f64);
        Self(clamped as u16)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum LineHeight {
    Pixels(f64),
    Percent(f64),
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum LetterSpacing {
    Pixels(f64),
    Percent(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub font_size: Dimension,
    pub font_weight: FontWeight,
    pub line_height: Option<LineHeight>,
    pub letter_spacing: Option<LetterSpacing>,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: Dimension::px(DEFAULT_BASE_FONT_SIZE),
            font_weight: FontWeight::REGULAR,
            line_height: None,
            letter_spacing: None,
        }
    }
}

/// One layer of a (possibly stacked) shadow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowLayer {
    pub offset_x: Dimension,
    pub offset_y: Dimension,
    pub blur: Dimension,
    pub spread: Dimension,
    pub color: Color,
    pub inset: bool,
}

impl Default for ShadowLayer {
    fn default() -> Self {
        Self {
            offset_x: Dimension::px(0.0),
            offset_y: Dimension::px(0.0),
            blur: Dimension::px(0.0),
            spread: Dimension::px(0.0),
            color: Color::BLACK,
            inset: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Duration {
    pub millis: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Canonical token value. Each variant carries the shape of exactly one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TokenValue {
    Color(Color),
    Dimension(Dimension),
    FontSize(Dimension),
    FontWeight(FontWeight),
    FontFamily(String),
    LineHeight(LineHeight),
    LetterSpacing(LetterSpacing),
    Spacing(Dimension),
    Shadow(Vec<ShadowLayer>),
    Duration(Duration),
    CubicBezier(CubicBezier),
    Number(f64),
    String(String),
    Boolean(bool),
    Typography(Typography),
    Other(serde_json::Value),
}

impl TokenValue {
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Color(_) => TokenKind::Color,
            Self::Dimension(_) => TokenKind::Dimension,
            Self::FontSize(_) => TokenKind::FontSize,
            Self::FontWeight(_) => TokenKind::FontWeight,
            Self::FontFamily(_) => TokenKind::FontFamily,
            Self::LineHeight(_) => TokenKind::LineHeight,
            Self::LetterSpacing(_) => TokenKind::LetterSpacing,
            Self::Spacing(_) => TokenKind::Spacing,
            Self::Shadow(_) => TokenKind::Shadow,
            Self::Duration(_) => TokenKind::Duration,
            Self::CubicBezier(_) => TokenKind::CubicBezier,
            Self::Number(_) => TokenKind::Number,
            Self::String(_) => TokenKind::String,
            Self::Boolean(_) => TokenKind::Boolean,
            Self::Typography(_) => TokenKind::Typography,
            Self::Other(_) => TokenKind::Other,
        }
    }

    pub fn as_color(&self) -> Option<&Color> {
        match self {
            Self::Color(color) => Some(color),
            _ => None,
        }
    }

    /// The dimension carried by any length-like variant
    pub fn as_dimension(&self) -> Option<&Dimension> {
        match self {
            Self::Dimension(d) | Self::FontSize(d) | Self::Spacing(d) => Some(d),
            _ => None,
        }
    }
}

/// A successfully parsed value plus any sub-field failures that fell back to defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub warnings: Vec<TokenError>,
}

impl<T> Parsed<T> {
    pub fn clean(value: T) -> Self {
        Self { value, warnings: Vec::new() }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
