//! Evaluates a parsed formula against an `EvalContext`. The single entry
//! point is [`eval`], which recurses the AST, resolving references as it
//! goes and centrally short-circuiting on error so individual builtins
//! don't each have to repeat that check.

use formulon_common::{Address, CellValue, ErrorKind};
use formulon_parse::ast::{Ast, BinaryOp, Reference, UnaryOp};

use crate::context::EvalContext;
use crate::function::{FnArg, FnCtx};
use crate::reference::{self, ResolvedRef};
use crate::{coerce, registry};

/// An evaluated AST node: either a plain scalar, or the 2-D shape a range
/// reference covers. Only ever produced at the top level of `eval`; once
/// consumed by a binary/unary operator or passed to a function it collapses
/// to a scalar via `into_scalar`.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalValue {
    Scalar(CellValue),
    Array(Vec<Vec<CellValue>>),
}

impl EvalValue {
    pub fn into_scalar(self) -> CellValue {
        match self {
            EvalValue::Scalar(v) => v,
            EvalValue::Array(rows) => rows
                .into_iter()
                .next()
                .and_then(|r| r.into_iter().next())
                .unwrap_or(CellValue::Empty),
        }
    }

    fn into_fn_arg(self) -> FnArg {
        match self {
            EvalValue::Scalar(v) => FnArg::Scalar(v),
            EvalValue::Array(rows) => FnArg::Array(rows),
        }
    }
}

pub fn eval(ast: &Ast, ctx: &dyn EvalContext, fctx: &FnCtx) -> EvalValue {
    match ast {
        Ast::Number(n) => EvalValue::Scalar(CellValue::Number(*n)),
        Ast::Text(s) => EvalValue::Scalar(CellValue::Text(s.clone())),
        Ast::Boolean(b) => EvalValue::Scalar(CellValue::Boolean(*b)),
        Ast::Error(e) => EvalValue::Scalar(CellValue::Error(*e)),
        Ast::Empty => EvalValue::Scalar(CellValue::Empty),
        Ast::Reference(r) => eval_reference(r, ctx),
        Ast::Unary(op, inner) => eval_unary(*op, eval(inner, ctx, fctx).into_scalar()),
        Ast::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, ctx, fctx),
        Ast::Call(name, args) => eval_call(name, args, ctx, fctx),
        Ast::Array(rows) => EvalValue::Array(
            rows.iter()
                .map(|row| row.iter().map(|cell| eval(cell, ctx, fctx).into_scalar()).collect())
                .collect(),
        ),
    }
}

fn eval_reference(r: &Reference, ctx: &dyn EvalContext) -> EvalValue {
    let resolved = match reference::resolve(r, ctx) {
        Ok(r) => r,
        Err(e) => return EvalValue::Scalar(CellValue::Error(e)),
    };
    read_resolved(&resolved, ctx)
}

fn read_resolved(resolved: &ResolvedRef, ctx: &dyn EvalContext) -> EvalValue {
    match resolved {
        ResolvedRef::Cell(addr) => EvalValue::Scalar(ctx.get(addr)),
        ResolvedRef::Range(range) => {
            let mut rows = Vec::with_capacity(range.height() as usize);
            for row in range.start_row..=range.end_row {
                let mut cells = Vec::with_capacity(range.width() as usize);
                for col in range.start_col..=range.end_col {
                    cells.push(ctx.get(&Address::new(range.sheet.clone(), col, row)));
                }
                rows.push(cells);
            }
            EvalValue::Array(rows)
        }
    }
}

fn eval_unary(op: UnaryOp, v: CellValue) -> EvalValue {
    if let CellValue::Error(e) = v {
        return EvalValue::Scalar(CellValue::Error(e));
    }
    let result = match op {
        UnaryOp::Plus => coerce::to_number(&v).map(CellValue::Number),
        UnaryOp::Neg => coerce::to_number(&v).map(|n| CellValue::Number(-n)),
        UnaryOp::Percent => coerce::to_number(&v).map(|n| CellValue::Number(n / 100.0)),
    };
    EvalValue::Scalar(result.unwrap_or_else(CellValue::Error))
}

fn eval_binary(op: BinaryOp, lhs: &Ast, rhs: &Ast, ctx: &dyn EvalContext, fctx: &FnCtx) -> EvalValue {
    if op == BinaryOp::Range {
        // Parenthesized/indirect range operands already folded to a
        // reference at parse time when both sides were literal cells;
        // this path only runs when the parser couldn't fold it (e.g. it
        // would have needed function results), which isn't reachable from
        // valid formulas, so `#REF!` is the defensible fallback.
        return EvalValue::Scalar(CellValue::Error(ErrorKind::Ref));
    }
    if op == BinaryOp::Intersect {
        return eval_intersect(lhs, rhs, ctx);
    }

    let l = eval(lhs, ctx, fctx).into_scalar();
    if let CellValue::Error(e) = l {
        return EvalValue::Scalar(CellValue::Error(e));
    }
    let r = eval(rhs, ctx, fctx).into_scalar();
    if let CellValue::Error(e) = r {
        return EvalValue::Scalar(CellValue::Error(e));
    }

    let result = match op {
        BinaryOp::Add => arith(l, r, |a, b| Ok(a + b)),
        BinaryOp::Sub => arith(l, r, |a, b| Ok(a - b)),
        BinaryOp::Mul => arith(l, r, |a, b| Ok(a * b)),
        BinaryOp::Div => arith(l, r, |a, b| if b == 0.0 { Err(ErrorKind::DivZero) } else { Ok(a / b) }),
        BinaryOp::Pow => arith(l, r, |a, b| Ok(a.powf(b))),
        BinaryOp::Concat => (|| {
            let a = coerce::to_text(&l)?;
            let b = coerce::to_text(&r)?;
            Ok(CellValue::Text(a + &b))
        })(),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            Ok(CellValue::Boolean(compare(op, &l, &r)))
        }
        BinaryOp::Range | BinaryOp::Intersect => unreachable!("handled above"),
    };
    EvalValue::Scalar(result.unwrap_or_else(CellValue::Error))
}

fn arith(l: CellValue, r: CellValue, f: impl FnOnce(f64, f64) -> Result<f64, ErrorKind>) -> Result<CellValue, ErrorKind> {
    let a = coerce::to_number(&l)?;
    let b = coerce::to_number(&r)?;
    f(a, b).map(CellValue::Number)
}

/// Rank used when two values of genuinely incomparable type meet: Boolean
/// sorts above Text, which sorts above Number. Same-type comparisons never
/// consult this; Empty coerces into whatever type it's compared against.
fn type_rank(v: &CellValue) -> u8 {
    match v {
        CellValue::Boolean(_) => 2,
        CellValue::Text(_) => 1,
        CellValue::Number(_) | CellValue::Empty => 0,
        CellValue::Error(_) => 3,
    }
}

fn compare(op: BinaryOp, l: &CellValue, r: &CellValue) -> bool {
    use std::cmp::Ordering;
    let ordering = match (l, r) {
        (CellValue::Empty, CellValue::Empty) => Ordering::Equal,
        (CellValue::Empty, other) => {
            // Empty coerces to the other side's own type before comparing,
            // keeping l/r order (empty is the left operand here).
            match other {
                CellValue::Number(_) => 0.0_f64.partial_cmp(&coerce::to_number(other).unwrap_or(0.0)).unwrap(),
                CellValue::Text(_) => "".cmp(&coerce::to_text(other).unwrap_or_default()),
                CellValue::Boolean(_) => false.cmp(&coerce::to_bool(other).unwrap_or(false)),
                _ => Ordering::Equal,
            }
        }
        (other, CellValue::Empty) => {
            // Same coercion, but empty is the right operand: reverse of the arm above.
            match other {
                CellValue::Number(_) => coerce::to_number(other).unwrap_or(0.0).partial_cmp(&0.0_f64).unwrap(),
                CellValue::Text(_) => coerce::to_text(other).unwrap_or_default().cmp(""),
                CellValue::Boolean(_) => coerce::to_bool(other).unwrap_or(false).cmp(&false),
                _ => Ordering::Equal,
            }
        }
        (CellValue::Number(a), CellValue::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (CellValue::Text(a), CellValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
        _ => type_rank(l).cmp(&type_rank(r)),
    };
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => unreachable!(),
    }
}

fn eval_intersect(lhs: &Ast, rhs: &Ast, ctx: &dyn EvalContext) -> EvalValue {
    let (Ast::Reference(l), Ast::Reference(r)) = (lhs, rhs) else {
        return EvalValue::Scalar(CellValue::Error(ErrorKind::Value));
    };
    let (Ok(l), Ok(r)) = (reference::resolve(l, ctx), reference::resolve(r, ctx)) else {
        return EvalValue::Scalar(CellValue::Error(ErrorKind::Ref));
    };
    match reference::intersect(&l, &r) {
        Ok(resolved) => read_resolved(&resolved, ctx),
        Err(e) => EvalValue::Scalar(CellValue::Error(e)),
    }
}

fn eval_call(name: &str, args: &[Ast], ctx: &dyn EvalContext, fctx: &FnCtx) -> EvalValue {
    let upper = name.to_uppercase();
    match upper.as_str() {
        "IF" => return eval_if(args, ctx, fctx),
        "IFS" => return eval_ifs(args, ctx, fctx),
        "SWITCH" => return eval_switch(args, ctx, fctx),
        _ => {}
    }

    let Some(f) = registry::lookup(&upper) else {
        return EvalValue::Scalar(CellValue::Error(ErrorKind::Name));
    };

    let evaluated: Vec<EvalValue> = args.iter().map(|a| eval(a, ctx, fctx)).collect();
    for v in &evaluated {
        if let EvalValue::Scalar(CellValue::Error(e)) = v {
            return EvalValue::Scalar(CellValue::Error(*e));
        }
        if let EvalValue::Array(rows) = v {
            for row in rows {
                for cell in row {
                    if let CellValue::Error(e) = cell {
                        return EvalValue::Scalar(CellValue::Error(*e));
                    }
                }
            }
        }
    }

    let fn_args: Vec<FnArg> = evaluated.into_iter().map(EvalValue::into_fn_arg).collect();
    EvalValue::Scalar(f(&fn_args, fctx))
}

fn eval_if(args: &[Ast], ctx: &dyn EvalContext, fctx: &FnCtx) -> EvalValue {
    let Some(cond) = args.first() else {
        return EvalValue::Scalar(CellValue::Error(ErrorKind::Na));
    };
    let cond_val = eval(cond, ctx, fctx).into_scalar();
    let cond_bool = match cond_val {
        CellValue::Error(e) => return EvalValue::Scalar(CellValue::Error(e)),
        other => match coerce::to_bool(&other) {
            Ok(b) => b,
            Err(e) => return EvalValue::Scalar(CellValue::Error(e)),
        },
    };
    let branch = if cond_bool { args.get(1) } else { args.get(2) };
    match branch {
        Some(ast) => eval(ast, ctx, fctx),
        None => EvalValue::Scalar(if cond_bool { CellValue::Empty } else { CellValue::Boolean(false) }),
    }
}

fn eval_ifs(args: &[Ast], ctx: &dyn EvalContext, fctx: &FnCtx) -> EvalValue {
    let mut pairs = args.chunks_exact(2);
    for pair in &mut pairs {
        let cond_val = eval(&pair[0], ctx, fctx).into_scalar();
        match cond_val {
            CellValue::Error(e) => return EvalValue::Scalar(CellValue::Error(e)),
            other => match coerce::to_bool(&other) {
                Ok(true) => return eval(&pair[1], ctx, fctx),
                Ok(false) => continue,
                Err(e) => return EvalValue::Scalar(CellValue::Error(e)),
            },
        }
    }
    EvalValue::Scalar(CellValue::Error(ErrorKind::Na))
}

fn eval_switch(args: &[Ast], ctx: &dyn EvalContext, fctx: &FnCtx) -> EvalValue {
    let Some(expr) = args.first() else {
        return EvalValue::Scalar(CellValue::Error(ErrorKind::Na));
    };
    let target = eval(expr, ctx, fctx).into_scalar();
    if let CellValue::Error(e) = target {
        return EvalValue::Scalar(CellValue::Error(e));
    }
    let rest = &args[1..];
    let mut cases = rest.chunks_exact(2);
    for case in &mut cases {
        let candidate = eval(&case[0], ctx, fctx).into_scalar();
        if let CellValue::Error(e) = candidate {
            return EvalValue::Scalar(CellValue::Error(e));
        }
        if candidate == target {
            return eval(&case[1], ctx, fctx);
        }
    }
    // An odd trailing argument after the case/result pairs is the default.
    if rest.len() % 2 == 1 {
        return eval(&rest[rest.len() - 1], ctx, fctx);
    }
    EvalValue::Scalar(CellValue::Error(ErrorKind::Na))
}
