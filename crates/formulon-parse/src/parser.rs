use std::fmt;

use formulon_common::address::column_to_number;

use crate::ast::{Ast, BinaryOp, Reference, UnaryOp};
use crate::precedence::{self, Assoc};
use crate::tokenizer::{Token, TokenKind, Tokenizer};

#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    UnexpectedEnd,
    UnexpectedToken { expected: String, found: String },
    MismatchedParen,
    InvalidReference(String),
    InvalidRangeOperands,
    TrailingTokens,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of formula"),
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::MismatchedParen => write!(f, "mismatched parenthesis"),
            Self::InvalidReference(s) => write!(f, "invalid reference '{s}'"),
            Self::InvalidRangeOperands => {
                write!(f, "':' may only combine two cell references into a range")
            }
            Self::TrailingTokens => write!(f, "trailing tokens after a complete expression"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub enum FormulaError {
    Tokenizer(crate::tokenizer::TokenizerError),
    Parse(ParseError),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenizer(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FormulaError {}

/// Parses Excel-compatible formula text (with or without the leading
/// `=`) into an AST.
pub fn parse(src: &str) -> Result<Ast, FormulaError> {
    let tokens = Tokenizer::tokenize(src).map_err(FormulaError::Tokenizer)?;
    Parser::new(tokens).parse_formula().map_err(FormulaError::Parse)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_formula(&mut self) -> Result<Ast, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::UnexpectedEnd);
        }
        let ast = self.parse_binary(1)?;
        if self.pos != self.tokens.len() {
            return Err(ParseError::TrailingTokens);
        }
        Ok(ast)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        match self.advance() {
            Some(t) if &t.kind == kind => Ok(()),
            Some(t) => Err(ParseError::UnexpectedToken {
                expected: format!("{kind:?}"),
                found: format!("{:?}", t.kind),
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn op_text(kind: &TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Op(s) => Some(s),
            TokenKind::Intersect => Some(" "),
            _ => None,
        }
    }

    /// Precedence-climbing binary-operator loop. `min_prec` is the lowest
    /// precedence level this call is allowed to consume.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some(op_str) = self.peek().and_then(|t| Self::op_text(&t.kind)) else {
                break;
            };
            let Some((prec, assoc)) = precedence::binary_precedence(op_str) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let op_str = op_str.to_string();
            self.advance();
            let next_min = match assoc {
                Assoc::Left => prec + 1,
                Assoc::Right => prec,
            };
            let rhs = self.parse_binary(next_min)?;
            lhs = self.combine_binary(&op_str, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn combine_binary(&self, op: &str, lhs: Ast, rhs: Ast) -> Result<Ast, ParseError> {
        let op = BinaryOp::from_token(op).unwrap_or(if op == " " {
            BinaryOp::Intersect
        } else {
            unreachable!("unknown operator token reached combine_binary: {op}")
        });
        if op == BinaryOp::Range {
            if !matches!(lhs, Ast::Reference(Reference::Cell { .. }))
                || !matches!(rhs, Ast::Reference(Reference::Cell { .. }))
            {
                return Err(ParseError::InvalidRangeOperands);
            }
            let (sheet, start_col, start_row) = match &lhs {
                Ast::Reference(Reference::Cell { sheet, col, row }) => {
                    (sheet.clone(), *col, *row)
                }
                _ => unreachable!(),
            };
            let (end_col, end_row) = match &rhs {
                Ast::Reference(Reference::Cell { col, row, .. }) => (*col, *row),
                _ => unreachable!(),
            };
            let (start_col, end_col) = (start_col.min(end_col), start_col.max(end_col));
            let (start_row, end_row) = (start_row.min(end_row), start_row.max(end_row));
            return Ok(Ast::Reference(Reference::Range {
                sheet,
                start_col: Some(start_col),
                start_row: Some(start_row),
                end_col: Some(end_col),
                end_row: Some(end_row),
            }));
        }
        Ok(Ast::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_unary(&mut self) -> Result<Ast, ParseError> {
        if let Some(t) = self.peek() {
            if let TokenKind::Op(op @ ("+" | "-")) = t.kind {
                let unary = if op == "+" { UnaryOp::Plus } else { UnaryOp::Neg };
                self.advance();
                let inner = self.parse_unary()?;
                return Ok(Ast::Unary(unary, Box::new(inner)));
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Ast, ParseError> {
        let mut node = self.parse_primary()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Op("%"))) {
            self.advance();
            node = Ast::Unary(UnaryOp::Percent, Box::new(node));
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Ast, ParseError> {
        let token = self.advance().ok_or(ParseError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Ast::Number(n)),
            TokenKind::Text(s) => Ok(Ast::Text(s)),
            TokenKind::Boolean(b) => Ok(Ast::Boolean(b)),
            TokenKind::ErrorLit(e) => Ok(Ast::Error(e)),
            TokenKind::Ident(name) => Ok(Ast::Reference(Reference::Name(name))),
            TokenKind::Reference(raw) => {
                parse_reference_text(&raw).map(Ast::Reference)
            }
            TokenKind::FuncHead(name) => self.parse_call(name),
            TokenKind::LParen => {
                let inner = self.parse_binary(1)?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_array(),
            other => Err(ParseError::UnexpectedToken {
                expected: "an expression".into(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.advance();
            return Ok(Ast::Call(name.to_uppercase(), args));
        }
        loop {
            let elided = matches!(
                self.peek().map(|t| &t.kind),
                Some(TokenKind::Comma) | Some(TokenKind::RParen)
            );
            if elided {
                args.push(Ast::Empty);
            } else {
                args.push(self.parse_binary(1)?);
            }
            match self.advance().map(|t| t.kind) {
                Some(TokenKind::Comma) => continue,
                Some(TokenKind::RParen) => break,
                Some(other) => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "',' or ')'".into(),
                        found: format!("{other:?}"),
                    })
                }
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
        Ok(Ast::Call(name.to_uppercase(), args))
    }

    fn parse_array(&mut self) -> Result<Ast, ParseError> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        loop {
            row.push(self.parse_array_cell()?);
            match self.advance().map(|t| t.kind) {
                Some(TokenKind::Comma) => continue,
                Some(TokenKind::Semicolon) => {
                    rows.push(std::mem::take(&mut row));
                }
                Some(TokenKind::RBrace) => {
                    rows.push(std::mem::take(&mut row));
                    break;
                }
                Some(other) => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "',', ';', or '}'".into(),
                        found: format!("{other:?}"),
                    })
                }
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
        Ok(Ast::Array(rows))
    }

    /// Array-constant cells are literals, optionally unary-negated — not
    /// arbitrary expressions, matching Excel's own array-constant grammar.
    fn parse_array_cell(&mut self) -> Result<Ast, ParseError> {
        if let Some(t) = self.peek() {
            if let TokenKind::Op(op @ ("+" | "-")) = t.kind {
                let unary = if op == "+" { UnaryOp::Plus } else { UnaryOp::Neg };
                self.advance();
                let inner = self.parse_array_cell()?;
                return Ok(Ast::Unary(unary, Box::new(inner)));
            }
        }
        let token = self.advance().ok_or(ParseError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Ast::Number(n)),
            TokenKind::Text(s) => Ok(Ast::Text(s)),
            TokenKind::Boolean(b) => Ok(Ast::Boolean(b)),
            TokenKind::ErrorLit(e) => Ok(Ast::Error(e)),
            other => Err(ParseError::UnexpectedToken {
                expected: "a literal".into(),
                found: format!("{other:?}"),
            }),
        }
    }
}

/// Decodes the raw reference text captured by the tokenizer (sheet
/// prefix, `$` markers, optional `:` tail) into a structured `Reference`.
fn parse_reference_text(raw: &str) -> Result<Reference, ParseError> {
    let (sheet, rest) = split_sheet_prefix(raw);
    if let Some((lhs, rhs)) = rest.split_once(':') {
        let lhs_comp = parse_component(lhs)?;
        let rhs_comp = parse_component(rhs)?;
        return match (lhs_comp, rhs_comp) {
            (RefComponent::Cell(c1, r1), RefComponent::Cell(c2, r2)) => Ok(Reference::Range {
                sheet,
                start_col: Some(c1.min(c2)),
                start_row: Some(r1.min(r2)),
                end_col: Some(c1.max(c2)),
                end_row: Some(r1.max(r2)),
            }),
            (RefComponent::Col(c1), RefComponent::Col(c2)) => Ok(Reference::Range {
                sheet,
                start_col: Some(c1.min(c2)),
                start_row: None,
                end_col: Some(c1.max(c2)),
                end_row: None,
            }),
            (RefComponent::Row(r1), RefComponent::Row(r2)) => Ok(Reference::Range {
                sheet,
                start_col: None,
                start_row: Some(r1.min(r2)),
                end_col: None,
                end_row: Some(r1.max(r2)),
            }),
            _ => Err(ParseError::InvalidReference(raw.to_string())),
        };
    }
    match parse_component(rest)? {
        RefComponent::Cell(col, row) => Ok(Reference::Cell { sheet, col, row }),
        _ => Err(ParseError::InvalidReference(raw.to_string())),
    }
}

fn split_sheet_prefix(raw: &str) -> (Option<String>, &str) {
    if let Some(rest) = raw.strip_prefix('\'') {
        if let Some(end) = rest.find("'!") {
            let name = rest[..end].replace("''", "'");
            return (Some(name), &rest[end + 2..]);
        }
    }
    if let Some(idx) = raw.find('!') {
        return (Some(raw[..idx].to_string()), &raw[idx + 1..]);
    }
    (None, raw)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefComponent {
    Cell(u32, u32),
    Col(u32),
    Row(u32),
}

fn parse_component(s: &str) -> Result<RefComponent, ParseError> {
    let s = s.trim_start_matches('$');
    let letters_end = s.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(s.len());
    let (letters, rest) = s.split_at(letters_end);
    let rest = rest.trim_start_matches('$');
    if !letters.is_empty() && !rest.is_empty() {
        let col = column_to_number(letters)
            .ok_or_else(|| ParseError::InvalidReference(s.to_string()))?;
        let row: u32 = rest
            .parse()
            .map_err(|_| ParseError::InvalidReference(s.to_string()))?;
        Ok(RefComponent::Cell(col, row))
    } else if !letters.is_empty() {
        let col = column_to_number(letters)
            .ok_or_else(|| ParseError::InvalidReference(s.to_string()))?;
        Ok(RefComponent::Col(col))
    } else if !rest.is_empty() {
        let row: u32 = rest
            .parse()
            .map_err(|_| ParseError::InvalidReference(s.to_string()))?;
        Ok(RefComponent::Row(row))
    } else {
        Err(ParseError::InvalidReference(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(src: &str) -> Ast {
        parse(src).unwrap()
    }

    #[test]
    fn precedence_multiplication_binds_tighter_than_addition() {
        assert_eq!(
            p("=1+2*3"),
            Ast::Binary(
                BinaryOp::Add,
                Box::new(Ast::Number(1.0)),
                Box::new(Ast::Binary(
                    BinaryOp::Mul,
                    Box::new(Ast::Number(2.0)),
                    Box::new(Ast::Number(3.0))
                ))
            )
        );
    }

    #[test]
    fn concat_binds_looser_than_addition() {
        // =1+2&"x" must parse as (1+2)&"x": concatenation binds looser than addition.
        assert_eq!(
            p(r#"=1+2&"x""#),
            Ast::Binary(
                BinaryOp::Concat,
                Box::new(Ast::Binary(
                    BinaryOp::Add,
                    Box::new(Ast::Number(1.0)),
                    Box::new(Ast::Number(2.0))
                )),
                Box::new(Ast::Text("x".into()))
            )
        );
    }

    #[test]
    fn unary_minus_binds_tighter_than_power_rhs_but_power_tighter_than_unary_on_lhs() {
        // Excel: -2^2 == -4 (unary minus outside), 2^-2 is legal (unary inside power rhs).
        assert_eq!(
            p("=-2^2"),
            Ast::Unary(
                UnaryOp::Neg,
                Box::new(Ast::Binary(
                    BinaryOp::Pow,
                    Box::new(Ast::Number(2.0)),
                    Box::new(Ast::Number(2.0))
                ))
            )
        );
    }

    #[test]
    fn postfix_percent() {
        assert_eq!(
            p("=50%"),
            Ast::Unary(UnaryOp::Percent, Box::new(Ast::Number(50.0)))
        );
    }

    #[test]
    fn range_from_two_cell_references() {
        assert_eq!(
            p("=A1:B2"),
            Ast::Reference(Reference::Range {
                sheet: None,
                start_col: Some(1),
                start_row: Some(1),
                end_col: Some(2),
                end_row: Some(2),
            })
        );
    }

    #[test]
    fn range_operator_on_non_references_is_an_error() {
        assert!(parse("=1:2").is_err());
    }

    #[test]
    fn function_call_zero_args() {
        assert_eq!(p("=PI()"), Ast::Call("PI".into(), vec![]));
    }

    #[test]
    fn elided_function_arguments_become_empty() {
        assert_eq!(
            p("=IF(A1,,2)"),
            Ast::Call(
                "IF".into(),
                vec![
                    Ast::Reference(Reference::Cell {
                        sheet: None,
                        col: 1,
                        row: 1
                    }),
                    Ast::Empty,
                    Ast::Number(2.0),
                ]
            )
        );
    }

    #[test]
    fn array_constant_with_rows_and_columns() {
        assert_eq!(
            p("={1,2;3,4}"),
            Ast::Array(vec![
                vec![Ast::Number(1.0), Ast::Number(2.0)],
                vec![Ast::Number(3.0), Ast::Number(4.0)],
            ])
        );
    }

    #[test]
    fn mismatched_parenthesis_is_an_error() {
        assert!(parse("=(1+2").is_err());
    }

    #[test]
    fn trailing_tokens_is_an_error() {
        assert!(parse("=1 2").is_err());
    }

    #[test]
    fn sheet_qualified_cross_sheet_reference() {
        assert_eq!(
            p("=Sheet2!C3"),
            Ast::Reference(Reference::Cell {
                sheet: Some("Sheet2".into()),
                col: 3,
                row: 3,
            })
        );
    }
}
