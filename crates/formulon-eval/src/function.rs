//! The function library's argument shape and call signature.
//!
//! Every builtin receives already-evaluated arguments and must not
//! perform I/O or consult the store directly. Most arguments arrive as a
//! single scalar; a range reference passed directly as an argument arrives
//! as the un-flattened 2-D array it covers, so that lookup-family
//! functions can see its matrix shape while ordinary aggregators flatten
//! it themselves (row-major) with `flatten_row_major`.

use std::cell::RefCell;

use formulon_common::CellValue;
use rand::rngs::SmallRng;

use crate::clock::Clock;

#[derive(Clone, Debug, PartialEq)]
pub enum FnArg {
    Scalar(CellValue),
    Array(Vec<Vec<CellValue>>),
}

impl FnArg {
    /// The top-left cell if this is an array, or the scalar itself.
    pub fn as_scalar(&self) -> CellValue {
        match self {
            FnArg::Scalar(v) => v.clone(),
            FnArg::Array(rows) => rows
                .first()
                .and_then(|r| r.first())
                .cloned()
                .unwrap_or(CellValue::Empty),
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Vec<CellValue>>> {
        match self {
            FnArg::Array(rows) => Some(rows),
            FnArg::Scalar(_) => None,
        }
    }
}

/// Flattens every argument in row-major order; scalars contribute a
/// single element. This is the shape variadic aggregators consume.
pub fn flatten_row_major(args: &[FnArg]) -> Vec<CellValue> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            FnArg::Scalar(v) => out.push(v.clone()),
            FnArg::Array(rows) => {
                for row in rows {
                    out.extend(row.iter().cloned());
                }
            }
        }
    }
    out
}

/// The evaluation context a builtin may need: the isolatable wall clock
/// for `NOW`/`TODAY`, and a seeded PRNG for `RAND`/`RANDBETWEEN`. No
/// builtin reads the store directly.
pub struct FnCtx<'a> {
    pub clock: &'a dyn Clock,
    pub rng: &'a RefCell<SmallRng>,
}

pub type BuiltinFn = fn(&[FnArg], &FnCtx) -> CellValue;
