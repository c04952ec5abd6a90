use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// A 24-bit RGB color stored as `0xRRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(u32);

impl Color {
    pub const MAX: u32 = 0xFF_FFFF;

    pub fn new(rgb: u32) -> Option<Self> {
        (rgb <= Self::MAX).then_some(Color(rgb))
    }

    pub fn rgb(self) -> u32 {
        self.0
    }

    /// Parses `"#RRGGBB"`, `"RRGGBB"` or a decimal integer string.
    pub fn parse_str(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(Color::new);
        }
        if trimmed.starts_with('#') {
            return None;
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Color::from_number)
    }

    /// Integral part of a finite, in-range number.
    pub fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value > f64::from(Self::MAX) {
            return None;
        }
        Color::new(value.trunc() as u32)
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().and_then(Color::from_number),
            Value::String(s) => Color::parse_str(s),
            _ => None,
        }
    }

    /// Conversion from the signed column type used by the store
    pub fn from_column(value: Option<i32>) -> Option<Self> {
        value.and_then(|v| u32::try_from(v).ok()).and_then(Color::new)
    }

    pub fn to_column(color: Option<Color>) -> Option<i32> {
        color.map(|c| c.0 as i32)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Color as posted by a client. Anything unusable parses to `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorInput(pub Option<Color>);

impl From<Color> for ColorInput {
    fn from(color: Color) -> Self {
        ColorInput(Some(color))
    }
}

impl<'de> Deserialize<'de> for ColorInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ColorInput(Color::from_json(&value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hex_and_integer_agree() {
        let from_hex = Color::parse_str("#FF00AA").unwrap();
        let from_int = Color::from_json(&json!(16711850)).unwrap();
        assert_eq!(from_hex, from_int);
        assert_eq!(from_hex.rgb(), 0xFF00AA);
    }

    #[test]
    fn test_hex_without_hash_and_lowercase() {
        assert_eq!(Color::parse_str("ff00aa").map(Color::rgb), Some(0xFF00AA));
        assert_eq!(Color::parse_str(" #112233 ").map(Color::rgb), Some(0x112233));
    }

    #[test]
    fn test_decimal_strings() {
        assert_eq!(Color::parse_str("16711850").map(Color::rgb), Some(0xFF00AA));
        assert_eq!(Color::parse_str("0").map(Color::rgb), Some(0));
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(Color::parse_str("#GG0000"), None);
        assert_eq!(Color::parse_str("#FFF"), None);
        assert_eq!(Color::parse_str("red"), None);
        assert_eq!(Color::parse_str(""), None);
        assert_eq!(Color::from_json(&json!(-1)), None);
        assert_eq!(Color::from_json(&json!(16777216)), None);
        assert_eq!(Color::from_json(&json!(null)), None);
        assert_eq!(Color::from_json(&json!(true)), None);
        assert_eq!(Color::from_number(f64::NAN), None);
        assert_eq!(Color::from_number(f64::INFINITY), None);
    }

    #[test]
    fn test_display_is_uppercase_hex() {
        assert_eq!(Color::new(0x0a0b0c).unwrap().to_string(), "#0A0B0C");
    }

    #[test]
    fn test_column_conversion() {
        let color = Color::new(0x445566);
        assert_eq!(Color::from_column(Color::to_column(color)), color);
        assert_eq!(Color::from_column(Some(-5)), None);
        assert_eq!(Color::from_column(None), None);
    }

    #[test]
    fn test_serializes_as_integer() {
        let color = Color::new(0x112233).unwrap();
        assert_eq!(serde_json::to_value(color).unwrap(), json!(0x112233));
    }
}
