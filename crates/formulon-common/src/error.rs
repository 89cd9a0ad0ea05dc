use std::fmt;

/// One of the seven Excel error tokens. These are values in the formula
/// algebra (see `CellValue::Error`), never Rust-level exceptions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Null,
    DivZero,
    Value,
    Ref,
    Num,
    Name,
    Na,
}

impl ErrorKind {
    /// Parses one of the canonical wire tokens, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "#NULL!" => Some(Self::Null),
            "#DIV/0!" => Some(Self::DivZero),
            "#VALUE!" => Some(Self::Value),
            "#REF!" => Some(Self::Ref),
            "#NUM!" => Some(Self::Num),
            "#NAME?" => Some(Self::Name),
            "#N/A" => Some(Self::Na),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Null => "#NULL!",
            Self::DivZero => "#DIV/0!",
            Self::Value => "#VALUE!",
            Self::Ref => "#REF!",
            Self::Num => "#NUM!",
            Self::Name => "#NAME?",
            Self::Na => "#N/A",
        };
        f.write_str(s)
    }
}
