use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Declared value type of an animation track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Number,
    Color,
    Position,
    Rotation,
    Scale,
    Opacity,
    Text,
    Path,
}

impl PropertyType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Number | Self::Rotation | Self::Scale | Self::Opacity
        )
    }

    /// Value used when a track has neither keyframes nor a default.
    pub fn default_value(self) -> KeyframeValue {
        match self {
            Self::Number | Self::Rotation => KeyframeValue::Number(0.0),
            Self::Scale | Self::Opacity => KeyframeValue::Number(1.0),
            Self::Position => KeyframeValue::Position(Position::default()),
            Self::Color => KeyframeValue::Color("#000000".to_string()),
            Self::Text => KeyframeValue::Text(String::new()),
            Self::Path => KeyframeValue::Path(String::new()),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::Color => "color",
            Self::Position => "position",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
            Self::Opacity => "opacity",
            Self::Text => "text",
            Self::Path => "path",
        };
        f.write_str(name)
    }
}

/// How two neighbouring keyframe values are combined.
///
/// `Bezier` and `Spline` are kept distinct for round-tripping but blend the
/// same way as `Linear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Discrete,
    Linear,
    Bezier,
    Spline,
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::Bezier
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Keyframe payload. The variant always agrees with the owning track's
/// [`PropertyType`]; numeric types share `Number`.
///
/// Serializes to the bare document form: a number, an `{x, y}` object or a
/// string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyframeValue {
    Number(f64),
    Position(Position),
    /// `#rrggbb` or `rgb(r, g, b)`; blended colors come back in the latter
    /// form.
    Color(String),
    Text(String),
    Path(String),
}

impl KeyframeValue {
    pub fn matches(&self, property_type: PropertyType) -> bool {
        match self {
            Self::Number(_) => property_type.is_numeric(),
            Self::Position(_) => property_type == PropertyType::Position,
            Self::Color(_) => property_type == PropertyType::Color,
            Self::Text(_) => property_type == PropertyType::Text,
            Self::Path(_) => property_type == PropertyType::Path,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_position(&self) -> Option<Position> {
        match self {
            Self::Position(position) => Some(*position),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Color(text) | Self::Text(text) | Self::Path(text) => Some(text),
            _ => None,
        }
    }

    /// Read a document value as `property_type`; `None` when the JSON shape
    /// does not fit.
    pub fn from_json(property_type: PropertyType, value: &Value) -> Option<Self> {
        match property_type {
            PropertyType::Number
            | PropertyType::Rotation
            | PropertyType::Scale
            | PropertyType::Opacity => value.as_f64().map(Self::Number),
            PropertyType::Position => {
                let x = value.get("x")?.as_f64()?;
                let y = value.get("y")?.as_f64()?;
                Some(Self::Position(Position { x, y }))
            }
            PropertyType::Color => value.as_str().map(|s| Self::Color(s.to_string())),
            PropertyType::Text => value.as_str().map(|s| Self::Text(s.to_string())),
            PropertyType::Path => value.as_str().map(|s| Self::Path(s.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(value) => json!(value),
            Self::Position(position) => json!({ "x": position.x, "y": position.y }),
            Self::Color(text) | Self::Text(text) | Self::Path(text) => json!(text),
        }
    }

    /// Combine two keyframe values at eased `progress`.
    ///
    /// Values that do not fit `property_type`, or colors that [`Rgb::parse`]
    /// rejects, yield `start` unchanged.
    pub fn blend(
        property_type: PropertyType,
        start: &KeyframeValue,
        end: &KeyframeValue,
        progress: f64,
        interpolation: Interpolation,
    ) -> KeyframeValue {
        let hold = || {
            if progress < 1.0 {
                start.clone()
            } else {
                end.clone()
            }
        };

        match (property_type, start, end) {
            (ty, Self::Number(a), Self::Number(b)) if ty.is_numeric() => {
                if interpolation == Interpolation::Discrete {
                    hold()
                } else {
                    Self::Number(lerp(*a, *b, progress))
                }
            }
            (PropertyType::Position, Self::Position(a), Self::Position(b)) => {
                Self::Position(Position {
                    x: lerp(a.x, b.x, progress),
                    y: lerp(a.y, b.y, progress),
                })
            }
            (PropertyType::Color, Self::Color(a), Self::Color(b)) => {
                if interpolation == Interpolation::Discrete {
                    return hold();
                }
                match (Rgb::parse(a), Rgb::parse(b)) {
                    (Some(a), Some(b)) => Self::Color(a.lerp(b, progress).to_css()),
                    _ => start.clone(),
                }
            }
            (PropertyType::Text, Self::Text(_), Self::Text(_))
            | (PropertyType::Path, Self::Path(_), Self::Path(_)) => hold(),
            _ => start.clone(),
        }
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse either `#rrggbb` or the `rgb(r, g, b)` form produced by blending.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::parse_hex(text).or_else(|| Self::parse_css(text))
    }

    /// Parse `#rrggbb` or `rrggbb`, case-insensitive.
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#').unwrap_or(text);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    fn parse_css(text: &str) -> Option<Self> {
        let inner = text.strip_prefix("rgb(")?.strip_suffix(')')?;
        let mut channels = inner.split(',').map(|part| part.trim().parse::<u8>().ok());
        let rgb = Self {
            r: channels.next()??,
            g: channels.next()??,
            b: channels.next()??,
        };
        if channels.next().is_some() {
            return None;
        }
        Some(rgb)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let channel = |a: u8, b: u8| lerp(a as f64, b as f64, t).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }

    pub fn to_css(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}
