//! The operator precedence table from the component design: higher level
//! binds tighter. Range/intersection bind tightest, comparisons loosest.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Precedence/associativity of a binary operator (including the range
/// `:` and synthetic intersection operators). Returns `None` for tokens
/// that are never binary operators.
pub fn binary_precedence(op: &str) -> Option<(u8, Assoc)> {
    match op {
        ":" | " " => Some((8, Assoc::Left)),
        "^" => Some((5, Assoc::Right)),
        "*" | "/" => Some((4, Assoc::Left)),
        "+" | "-" => Some((3, Assoc::Left)),
        "&" => Some((2, Assoc::Left)),
        "=" | "<" | ">" | "<=" | ">=" | "<>" => Some((1, Assoc::Left)),
        _ => None,
    }
}

/// Precedence/associativity of the prefix unary `+`/`-` operators.
pub const UNARY_PRECEDENCE: u8 = 7;

/// Precedence of the postfix `%` operator.
pub const POSTFIX_PRECEDENCE: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_binds_tighter_than_everything_else() {
        let (range_prec, _) = binary_precedence(":").unwrap();
        assert!(range_prec > UNARY_PRECEDENCE);
        assert!(UNARY_PRECEDENCE > POSTFIX_PRECEDENCE);
        let (pow_prec, assoc) = binary_precedence("^").unwrap();
        assert!(POSTFIX_PRECEDENCE > pow_prec);
        assert_eq!(assoc, Assoc::Right);
    }

    #[test]
    fn concat_binds_looser_than_arithmetic() {
        let (plus, _) = binary_precedence("+").unwrap();
        let (concat, _) = binary_precedence("&").unwrap();
        assert!(plus > concat);
    }
}
