//! Cell values as held by the row store

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// A positional row: one cell per column, header included at index 0 of a table.
pub type Row = Vec<CellValue>;

/// A single raw cell.
///
/// Serialized untagged, so a cell is a plain JSON string, number, or boolean.
/// An empty cell is `Text("")`. Integers too large for an exact `f64` are read
/// as their decimal text so long part numbers keep every digit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Which view of the stored values a read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    /// Native values as they were appended.
    Raw,
    /// Every cell rendered to its display string, as a reviewer sees it.
    Display,
}

impl CellValue {
    /// An empty text cell.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Text(String::new())
    }

    /// True for an empty or whitespace-only text cell.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    /// The display-fidelity form of this cell.
    #[must_use]
    pub fn to_display(&self) -> Self {
        match self {
            Self::Text(_) => self.clone(),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Largest magnitude below which every integer has an exact `f64`.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellVisitor)
    }
}

struct CellVisitor;

impl Visitor<'_> for CellVisitor {
    type Value = CellValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, or boolean")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<CellValue, E> {
        Ok(CellValue::Bool(value))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, value: i64) -> Result<CellValue, E> {
        if value.unsigned_abs() <= MAX_EXACT_INTEGER {
            Ok(CellValue::Number(value as f64))
        } else {
            Ok(CellValue::Text(value.to_string()))
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, value: u64) -> Result<CellValue, E> {
        if value <= MAX_EXACT_INTEGER {
            Ok(CellValue::Number(value as f64))
        } else {
            Ok(CellValue::Text(value.to_string()))
        }
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<CellValue, E> {
        Ok(CellValue::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<CellValue, E> {
        Ok(CellValue::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<CellValue, E> {
        Ok(CellValue::Text(value))
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Number(value) => f.write_str(&format_number(*value)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

// Whole numbers render without a decimal point, the way a sheet shows them.
#[allow(clippy::float_cmp)]
fn format_number(value: f64) -> String {
    if value.is_finite() && value.trunc() == value && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_a_sheet() {
        assert_eq!(CellValue::Number(12.0).to_string(), "12");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Number(0.1).to_string(), "0.1");
        assert_eq!(CellValue::Number(-3.0).to_string(), "-3");
    }

    #[test]
    fn booleans_render_upper_case() {
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Bool(false).to_string(), "FALSE");
    }

    #[test]
    fn deserializes_untagged_json_scalars() {
        let cells: Vec<CellValue> = serde_json::from_str(r#"["OK", 93.5, true, ""]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::from("OK"),
                CellValue::Number(93.5),
                CellValue::Bool(true),
                CellValue::empty(),
            ]
        );
    }

    #[test]
    fn integers_beyond_f64_precision_keep_their_digits() {
        let cells: Vec<CellValue> =
            serde_json::from_str("[12345678901234567, -12345678901234567, 9007199254740992]")
                .unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::from("12345678901234567"),
                CellValue::from("-12345678901234567"),
                CellValue::Number(9_007_199_254_740_992.0),
            ]
        );
    }

    #[test]
    fn to_display_converts_native_values_to_text() {
        assert_eq!(
            CellValue::Number(7.0).to_display(),
            CellValue::Text("7".to_string())
        );
        assert!(CellValue::from("  ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
