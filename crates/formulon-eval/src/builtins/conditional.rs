//! `COUNTIF`/`SUMIF`. Both walk a range argument in lockstep with an
//! (optional, separate) sum range, so they need the un-flattened array
//! shape rather than the aggregator's flat value list.

use formulon_common::{CellValue, ErrorKind};

use crate::builtins::criteria;
use crate::coerce;
use crate::function::{FnArg, FnCtx};

fn flatten(arg: &FnArg) -> Vec<CellValue> {
    match arg {
        FnArg::Scalar(v) => vec![v.clone()],
        FnArg::Array(rows) => rows.iter().flat_map(|r| r.iter().cloned()).collect(),
    }
}

pub fn countif(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let Some(range) = args.first() else {
        return CellValue::Error(ErrorKind::Na);
    };
    let Some(criteria_arg) = args.get(1) else {
        return CellValue::Error(ErrorKind::Na);
    };
    let criterion = criteria_arg.as_scalar();
    let n = flatten(range).iter().filter(|v| criteria::matches(v, &criterion)).count();
    CellValue::Number(n as f64)
}

pub fn sumif(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let Some(range) = args.first() else {
        return CellValue::Error(ErrorKind::Na);
    };
    let Some(criteria_arg) = args.get(1) else {
        return CellValue::Error(ErrorKind::Na);
    };
    let criterion = criteria_arg.as_scalar();
    let test_values = flatten(range);
    let sum_values = match args.get(2) {
        Some(sum_range) => flatten(sum_range),
        None => test_values.clone(),
    };
    if sum_values.len() != test_values.len() {
        return CellValue::Error(ErrorKind::Value);
    }
    let mut total = 0.0;
    for (test, sum) in test_values.iter().zip(sum_values.iter()) {
        if criteria::matches(test, &criterion) {
            match coerce::to_number(sum) {
                Ok(n) => total += n,
                Err(_) => {}
            }
        }
    }
    CellValue::Number(total)
}
