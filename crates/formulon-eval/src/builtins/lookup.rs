//! `VLOOKUP`/`HLOOKUP`/`INDEX` — the functions that need a range
//! argument's un-flattened matrix shape rather than a flat value list.

use formulon_common::{CellValue, ErrorKind};

use crate::coerce;
use crate::function::{FnArg, FnCtx};

fn table_arg(args: &[FnArg], i: usize) -> Result<Vec<Vec<CellValue>>, ErrorKind> {
    match args.get(i) {
        Some(FnArg::Array(rows)) => Ok(rows.clone()),
        Some(FnArg::Scalar(v)) => Ok(vec![vec![v.clone()]]),
        None => Err(ErrorKind::Na),
    }
}

fn approx_match(col: &[CellValue], key: &CellValue) -> Option<usize> {
    // Assumes ascending sort, as Excel's approximate-match VLOOKUP does:
    // the last row whose value is <= key.
    let key_num = coerce::to_number(key).ok();
    let mut best = None;
    for (i, v) in col.iter().enumerate() {
        let cmp = match (coerce::to_number(v).ok(), key_num) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        };
        if cmp {
            best = Some(i);
        } else {
            break;
        }
    }
    best
}

fn exact_match(col: &[CellValue], key: &CellValue) -> Option<usize> {
    col.iter().position(|v| values_equal(v, key))
}

fn values_equal(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x == y,
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x == y,
        (CellValue::Empty, CellValue::Empty) => true,
        _ => coerce::to_text(a).ok().zip(coerce::to_text(b).ok()).map_or(false, |(x, y)| x.eq_ignore_ascii_case(&y)),
    }
}

pub fn vlookup(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<CellValue, ErrorKind> {
        let key = args.first().ok_or(ErrorKind::Na)?.as_scalar();
        let table = table_arg(args, 1)?;
        let col_index = coerce::to_number(&args.get(2).map(FnArg::as_scalar).unwrap_or(CellValue::Empty))? as usize;
        let range_lookup = args
            .get(3)
            .map(FnArg::as_scalar)
            .map(|v| coerce::to_bool(&v).unwrap_or(true))
            .unwrap_or(true);
        if col_index == 0 || table.is_empty() {
            return Err(ErrorKind::Value);
        }
        let first_col: Vec<CellValue> = table.iter().map(|row| row.first().cloned().unwrap_or(CellValue::Empty)).collect();
        let row_idx = if range_lookup { approx_match(&first_col, &key) } else { exact_match(&first_col, &key) };
        let row_idx = row_idx.ok_or(ErrorKind::Na)?;
        table[row_idx].get(col_index - 1).cloned().ok_or(ErrorKind::Ref)
    })() {
        Ok(v) => v,
        Err(e) => CellValue::Error(e),
    }
}

pub fn hlookup(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<CellValue, ErrorKind> {
        let key = args.first().ok_or(ErrorKind::Na)?.as_scalar();
        let table = table_arg(args, 1)?;
        let row_index = coerce::to_number(&args.get(2).map(FnArg::as_scalar).unwrap_or(CellValue::Empty))? as usize;
        let range_lookup = args
            .get(3)
            .map(FnArg::as_scalar)
            .map(|v| coerce::to_bool(&v).unwrap_or(true))
            .unwrap_or(true);
        if row_index == 0 || table.is_empty() {
            return Err(ErrorKind::Value);
        }
        let first_row = table.first().cloned().unwrap_or_default();
        let col_idx = if range_lookup { approx_match(&first_row, &key) } else { exact_match(&first_row, &key) };
        let col_idx = col_idx.ok_or(ErrorKind::Na)?;
        table.get(row_index - 1).and_then(|r| r.get(col_idx)).cloned().ok_or(ErrorKind::Ref)
    })() {
        Ok(v) => v,
        Err(e) => CellValue::Error(e),
    }
}

pub fn index(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<CellValue, ErrorKind> {
        let table = table_arg(args, 0)?;
        let row = coerce::to_number(&args.get(1).map(FnArg::as_scalar).unwrap_or(CellValue::Number(0.0)))? as usize;
        let col = coerce::to_number(&args.get(2).map(FnArg::as_scalar).unwrap_or(CellValue::Number(0.0)))? as usize;
        if row == 0 && col == 0 {
            return Err(ErrorKind::Value);
        }
        if table.len() == 1 && row == 0 {
            return table[0].get(col.saturating_sub(1)).cloned().ok_or(ErrorKind::Ref);
        }
        if table.first().map(|r| r.len()) == Some(1) && col == 0 {
            return table.get(row.saturating_sub(1)).and_then(|r| r.first()).cloned().ok_or(ErrorKind::Ref);
        }
        table
            .get(row.saturating_sub(1))
            .and_then(|r| r.get(col.saturating_sub(1)))
            .cloned()
            .ok_or(ErrorKind::Ref)
    })() {
        Ok(v) => v,
        Err(e) => CellValue::Error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use rand::SeedableRng;

    fn fctx() -> (FixedClock, RefCell<rand::rngs::SmallRng>) {
        (
            FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()),
            RefCell::new(rand::rngs::SmallRng::seed_from_u64(1)),
        )
    }

    fn table() -> Vec<Vec<CellValue>> {
        vec![
            vec![CellValue::Text("apple".into()), CellValue::Number(1.0)],
            vec![CellValue::Text("banana".into()), CellValue::Number(2.0)],
            vec![CellValue::Text("cherry".into()), CellValue::Number(3.0)],
        ]
    }

    #[test]
    fn vlookup_exact_match() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let args = vec![
            FnArg::Scalar(CellValue::Text("banana".into())),
            FnArg::Array(table()),
            FnArg::Scalar(CellValue::Number(2.0)),
            FnArg::Scalar(CellValue::Boolean(false)),
        ];
        assert_eq!(vlookup(&args, &ctx), CellValue::Number(2.0));
    }

    #[test]
    fn vlookup_missing_key_is_na() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let args = vec![
            FnArg::Scalar(CellValue::Text("durian".into())),
            FnArg::Array(table()),
            FnArg::Scalar(CellValue::Number(2.0)),
            FnArg::Scalar(CellValue::Boolean(false)),
        ];
        assert_eq!(vlookup(&args, &ctx), CellValue::Error(ErrorKind::Na));
    }

    #[test]
    fn index_single_row_uses_column_only() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let row = vec![vec![CellValue::Number(10.0), CellValue::Number(20.0), CellValue::Number(30.0)]];
        let args = vec![FnArg::Array(row), FnArg::Scalar(CellValue::Number(0.0)), FnArg::Scalar(CellValue::Number(2.0))];
        assert_eq!(index(&args, &ctx), CellValue::Number(20.0));
    }
}
