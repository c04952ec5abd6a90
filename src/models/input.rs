//! Lenient request values.
//!
//! Corner controls post whatever the browser has at hand: numbers, numeric
//! strings, checkbox values. These wrappers accept all of them and leave the
//! decision about a fallback to the operation that consumes the value.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A number that may be absent or unusable.
///
/// Holds `None` for missing fields, `null`, unparseable strings and
/// non-finite values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lenient(Option<f64>);

impl Lenient {
    pub const MISSING: Lenient = Lenient(None);

    pub fn value(self) -> Option<f64> {
        self.0
    }

    fn from_json(value: &Value) -> Self {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        Lenient(number.filter(|n| n.is_finite()))
    }
}

impl From<f64> for Lenient {
    fn from(value: f64) -> Self {
        Lenient(Some(value).filter(|n| n.is_finite()))
    }
}

impl<'de> Deserialize<'de> for Lenient {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Lenient::from_json(&value))
    }
}

/// A boolean toggle. Non-zero numbers and the usual form spellings are true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LenientFlag(pub bool);

impl LenientFlag {
    fn from_json(value: &Value) -> Self {
        let flag = match value {
            Value::Bool(b) => *b,
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" => true,
                other => other.parse::<f64>().map(|n| n.is_finite() && n != 0.0).unwrap_or(false),
            },
            other => Lenient::from_json(other).value().is_some_and(|n| n != 0.0),
        };
        LenientFlag(flag)
    }
}

impl From<bool> for LenientFlag {
    fn from(value: bool) -> Self {
        LenientFlag(value)
    }
}

impl<'de> Deserialize<'de> for LenientFlag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(LenientFlag::from_json(&value))
    }
}
