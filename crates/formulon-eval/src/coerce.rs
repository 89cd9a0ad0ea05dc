//! The three coercion tables from the function library contract.

use formulon_common::{CellValue, ErrorKind};

pub fn to_number(v: &CellValue) -> Result<f64, ErrorKind> {
    match v {
        CellValue::Number(n) => Ok(*n),
        CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| ErrorKind::Value),
        CellValue::Empty => Ok(0.0),
        CellValue::Error(e) => Err(*e),
    }
}

pub fn to_text(v: &CellValue) -> Result<String, ErrorKind> {
    match v {
        CellValue::Number(n) => Ok(format_number(*n)),
        CellValue::Text(s) => Ok(s.clone()),
        CellValue::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        CellValue::Empty => Ok(String::new()),
        CellValue::Error(e) => Err(*e),
    }
}

pub fn to_bool(v: &CellValue) -> Result<bool, ErrorKind> {
    match v {
        CellValue::Boolean(b) => Ok(*b),
        CellValue::Number(n) => Ok(*n != 0.0),
        CellValue::Text(s) => Ok(!s.is_empty()),
        CellValue::Empty => Ok(false),
        CellValue::Error(e) => Err(*e),
    }
}

/// Shortest decimal representation that round-trips, matching the "to
/// string" coercion's "shortest lossless decimal" requirement. Rust's own
/// `f64` `Display` already produces this.
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
