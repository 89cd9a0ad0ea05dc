//! Canonical AST-to-text pretty-printer. Used only for the parse-stability
//! testable property and for debugging — normal formula export always
//! emits the cell's original source text unchanged, per the external
//! interface contract.

use crate::ast::{Ast, BinaryOp, Reference, UnaryOp};
use formulon_common::address::{number_to_column, render_sheet_name};

pub fn to_formula_text(ast: &Ast) -> String {
    format!("={}", render(ast, 0))
}

/// Renders `ast` wrapping it in parens if its own precedence is lower
/// than `parent_min`, so re-parsing recovers the same tree.
fn render(ast: &Ast, parent_min: u8) -> String {
    match ast {
        Ast::Number(n) => n.to_string(),
        Ast::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        Ast::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Ast::Error(e) => e.to_string(),
        Ast::Empty => String::new(),
        Ast::Reference(r) => render_reference(r),
        Ast::Unary(op, inner) => render_unary(*op, inner),
        Ast::Binary(op, lhs, rhs) => render_binary(*op, lhs, rhs, parent_min),
        Ast::Call(name, args) => {
            let parts: Vec<String> = args.iter().map(|a| render(a, 1)).collect();
            format!("{name}({})", parts.join(","))
        }
        Ast::Array(rows) => {
            let rows: Vec<String> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|c| render(c, 1))
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .collect();
            format!("{{{}}}", rows.join(";"))
        }
    }
}

fn render_unary(op: UnaryOp, inner: &Ast) -> String {
    let (prec, inner_min) = match op {
        UnaryOp::Plus | UnaryOp::Neg => (7, 7),
        UnaryOp::Percent => (6, 6),
    };
    let rendered_inner = render(inner, inner_min);
    let _ = prec;
    match op {
        UnaryOp::Plus => format!("+{rendered_inner}"),
        UnaryOp::Neg => format!("-{rendered_inner}"),
        UnaryOp::Percent => format!("{rendered_inner}%"),
    }
}

fn render_binary(op: BinaryOp, lhs: &Ast, rhs: &Ast, parent_min: u8) -> String {
    let (prec, sym, next_min) = match op {
        BinaryOp::Range => (8, ":", 9),
        BinaryOp::Intersect => (8, " ", 9),
        BinaryOp::Pow => (5, "^", 5),
        BinaryOp::Mul => (4, "*", 5),
        BinaryOp::Div => (4, "/", 5),
        BinaryOp::Add => (3, "+", 4),
        BinaryOp::Sub => (3, "-", 4),
        BinaryOp::Concat => (2, "&", 3),
        BinaryOp::Eq => (1, "=", 2),
        BinaryOp::Ne => (1, "<>", 2),
        BinaryOp::Lt => (1, "<", 2),
        BinaryOp::Gt => (1, ">", 2),
        BinaryOp::Le => (1, "<=", 2),
        BinaryOp::Ge => (1, ">=", 2),
    };
    let text = format!("{}{}{}", render(lhs, prec), sym, render(rhs, next_min));
    if prec < parent_min {
        format!("({text})")
    } else {
        text
    }
}

fn render_reference(r: &Reference) -> String {
    match r {
        Reference::Cell { sheet, col, row } => {
            format!("{}{}{}", sheet_prefix(sheet), number_to_column(*col), row)
        }
        Reference::Range {
            sheet,
            start_col,
            start_row,
            end_col,
            end_row,
        } => {
            let start = render_corner(*start_col, *start_row);
            let end = render_corner(*end_col, *end_row);
            format!("{}{}:{}", sheet_prefix(sheet), start, end)
        }
        Reference::Name(n) => n.clone(),
    }
}

fn render_corner(col: Option<u32>, row: Option<u32>) -> String {
    match (col, row) {
        (Some(c), Some(r)) => format!("{}{}", number_to_column(c), r),
        (Some(c), None) => number_to_column(c),
        (None, Some(r)) => r.to_string(),
        (None, None) => String::new(),
    }
}

fn sheet_prefix(sheet: &Option<String>) -> String {
    match sheet {
        Some(s) => format!("{}!", render_sheet_name(s)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn round_trips_precedence_correctly() {
        let ast = parse(r#"=1+2&"x""#).unwrap();
        let text = to_formula_text(&ast);
        let reparsed = parse(&text).unwrap();
        assert_eq!(ast, reparsed);
    }

    #[test]
    fn round_trips_nested_parens() {
        let ast = parse("=(1+2)*3").unwrap();
        let text = to_formula_text(&ast);
        let reparsed = parse(&text).unwrap();
        assert_eq!(ast, reparsed);
    }

    #[test]
    fn round_trips_range_and_function_call() {
        let ast = parse("=SUM(Sheet1!A1:B2,3)").unwrap();
        let text = to_formula_text(&ast);
        let reparsed = parse(&text).unwrap();
        assert_eq!(ast, reparsed);
    }
}
