use std::fmt;

/// A single dynamically typed value extracted from a decoded revision.
///
/// [`Cell`] covers the value shapes that survive the upstream ledger's
/// self-describing document format once decoded to JSON. Structured values
/// (arrays and nested documents) are carried as [`Cell::Json`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(serde_json::Value),
}

impl Cell {
    /// Converts a decoded JSON value into a [`Cell`].
    ///
    /// Numbers that fit an `i64` stay integral; any other number becomes a float.
    pub fn from_json(value: serde_json::Value) -> Cell {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(value) => Cell::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Cell::I64(value),
                None => Cell::F64(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Cell::String(value),
            value @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Cell::Json(value)
            }
        }
    }

    /// Returns true if this cell is the SQL NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::I64(value) => write!(f, "{value}"),
            Cell::F64(value) => write!(f, "{value}"),
            Cell::String(value) => f.write_str(value),
            Cell::Json(value) => write!(f, "{value}"),
        }
    }
}
