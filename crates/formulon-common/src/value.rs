use std::fmt;

use crate::error::ErrorKind;

/// The tagged cell value: a 64-bit float, string, boolean, error code, or
/// empty. Empty is distinct from both empty string and numeric zero.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorKind),
    Empty,
}

impl CellValue {
    pub fn error(kind: ErrorKind) -> Self {
        Self::Error(kind)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_error(&self) -> Option<ErrorKind> {
        match self {
            Self::Error(k) => Some(*k),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Empty, Self::Empty) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Self::Error(e) => write!(f, "{e}"),
            Self::Empty => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<ErrorKind> for CellValue {
    fn from(e: ErrorKind) -> Self {
        Self::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_distinct_from_zero_and_empty_string() {
        assert_ne!(CellValue::Empty, CellValue::Number(0.0));
        assert_ne!(CellValue::Empty, CellValue::Text(String::new()));
    }

    #[test]
    fn display_matches_excel_rendering() {
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::Error(ErrorKind::Na).to_string(), "#N/A");
    }
}
