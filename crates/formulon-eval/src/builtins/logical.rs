//! `AND`/`OR`/`NOT`. `IF`/`IFS`/`SWITCH` are evaluated lazily straight out
//! of the interpreter's `Call` dispatch, since they must not evaluate the
//! branch they don't take — they are not registered here.

use formulon_common::{CellValue, ErrorKind};

use crate::coerce;
use crate::function::{flatten_row_major, FnArg, FnCtx};

pub fn and(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let mut result = true;
    for v in flatten_row_major(args) {
        match v {
            CellValue::Error(e) => return CellValue::Error(e),
            other => match coerce::to_bool(&other) {
                Ok(b) => result &= b,
                Err(e) => return CellValue::Error(e),
            },
        }
    }
    CellValue::Boolean(result)
}

pub fn or(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let mut result = false;
    for v in flatten_row_major(args) {
        match v {
            CellValue::Error(e) => return CellValue::Error(e),
            other => match coerce::to_bool(&other) {
                Ok(b) => result |= b,
                Err(e) => return CellValue::Error(e),
            },
        }
    }
    CellValue::Boolean(result)
}

pub fn not(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let Some(arg) = args.first() else {
        return CellValue::Error(ErrorKind::Na);
    };
    match coerce::to_bool(&arg.as_scalar()) {
        Ok(b) => CellValue::Boolean(!b),
        Err(e) => CellValue::Error(e),
    }
}
