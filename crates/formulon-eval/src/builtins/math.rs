//! Aggregate and arithmetic functions.

use formulon_common::{CellValue, ErrorKind};
use rand::Rng;

use crate::coerce;
use crate::function::{flatten_row_major, FnArg, FnCtx};

fn numbers_only(args: &[FnArg]) -> Result<Vec<f64>, ErrorKind> {
    let mut out = Vec::new();
    for v in flatten_row_major(args) {
        match v {
            CellValue::Error(e) => return Err(e),
            CellValue::Number(n) => out.push(n),
            CellValue::Boolean(b) => out.push(if b { 1.0 } else { 0.0 }),
            CellValue::Text(_) | CellValue::Empty => {}
        }
    }
    Ok(out)
}

fn err_or<T>(r: Result<T, ErrorKind>, f: impl FnOnce(T) -> CellValue) -> CellValue {
    match r {
        Ok(v) => f(v),
        Err(e) => CellValue::Error(e),
    }
}

pub fn sum(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args), |ns| CellValue::Number(ns.iter().sum()))
}

pub fn average(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args), |ns| {
        if ns.is_empty() {
            CellValue::Error(ErrorKind::DivZero)
        } else {
            CellValue::Number(ns.iter().sum::<f64>() / ns.len() as f64)
        }
    })
}

pub fn min(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args), |ns| {
        CellValue::Number(if ns.is_empty() { 0.0 } else { ns.into_iter().fold(f64::INFINITY, f64::min) })
    })
}

pub fn max(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args), |ns| {
        CellValue::Number(if ns.is_empty() { 0.0 } else { ns.into_iter().fold(f64::NEG_INFINITY, f64::max) })
    })
}

pub fn count(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let n = flatten_row_major(args)
        .into_iter()
        .filter(|v| matches!(v, CellValue::Number(_)))
        .count();
    CellValue::Number(n as f64)
}

pub fn counta(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let n = flatten_row_major(args)
        .into_iter()
        .filter(|v| !matches!(v, CellValue::Empty))
        .count();
    CellValue::Number(n as f64)
}

pub fn median(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args), |mut ns| {
        if ns.is_empty() {
            return CellValue::Error(ErrorKind::Num);
        }
        ns.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = ns.len() / 2;
        CellValue::Number(if ns.len() % 2 == 0 {
            (ns[mid - 1] + ns[mid]) / 2.0
        } else {
            ns[mid]
        })
    })
}

fn variance(ns: &[f64], sample: bool) -> Result<f64, ErrorKind> {
    let n = ns.len();
    let min_n = if sample { 2 } else { 1 };
    if n < min_n {
        return Err(ErrorKind::DivZero);
    }
    let mean = ns.iter().sum::<f64>() / n as f64;
    let sq: f64 = ns.iter().map(|x| (x - mean).powi(2)).sum();
    let divisor = if sample { (n - 1) as f64 } else { n as f64 };
    Ok(sq / divisor)
}

pub fn stdev(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args).and_then(|ns| variance(&ns, true)), |v| {
        CellValue::Number(v.sqrt())
    })
}

pub fn stdev_p(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args).and_then(|ns| variance(&ns, false)), |v| {
        CellValue::Number(v.sqrt())
    })
}

pub fn var_s(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args).and_then(|ns| variance(&ns, true)), CellValue::Number)
}

pub fn var_p(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    err_or(numbers_only(args).and_then(|ns| variance(&ns, false)), CellValue::Number)
}

fn two_number_args(args: &[FnArg]) -> Result<(f64, f64), ErrorKind> {
    let a = coerce::to_number(&args.first().map(FnArg::as_scalar).unwrap_or(CellValue::Empty))?;
    let b = coerce::to_number(&args.get(1).map(FnArg::as_scalar).unwrap_or(CellValue::Number(0.0)))?;
    Ok((a, b))
}

fn round_like(args: &[FnArg], f: impl Fn(f64, i32) -> f64) -> CellValue {
    match two_number_args(args) {
        Ok((n, digits)) => CellValue::Number(f(n, digits as i32)),
        Err(e) => CellValue::Error(e),
    }
}

pub fn round(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    round_like(args, |n, d| {
        let m = 10f64.powi(d);
        (n * m).round() / m
    })
}

pub fn roundup(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    round_like(args, |n, d| {
        let m = 10f64.powi(d);
        if n >= 0.0 {
            (n * m).ceil() / m
        } else {
            (n * m).floor() / m
        }
    })
}

pub fn rounddown(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    round_like(args, |n, d| {
        let m = 10f64.powi(d);
        if n >= 0.0 {
            (n * m).floor() / m
        } else {
            (n * m).ceil() / m
        }
    })
}

pub fn ceiling(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match two_number_args(args) {
        Ok((n, sig)) if sig != 0.0 => CellValue::Number((n / sig).ceil() * sig),
        Ok(_) => CellValue::Error(ErrorKind::DivZero),
        Err(e) => CellValue::Error(e),
    }
}

pub fn floor(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match two_number_args(args) {
        Ok((n, sig)) if sig != 0.0 => CellValue::Number((n / sig).floor() * sig),
        Ok(_) => CellValue::Error(ErrorKind::DivZero),
        Err(e) => CellValue::Error(e),
    }
}

pub fn int(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match coerce::to_number(&args.first().map(FnArg::as_scalar).unwrap_or(CellValue::Empty)) {
        Ok(n) => CellValue::Number(n.floor()),
        Err(e) => CellValue::Error(e),
    }
}

pub fn abs(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match coerce::to_number(&args.first().map(FnArg::as_scalar).unwrap_or(CellValue::Empty)) {
        Ok(n) => CellValue::Number(n.abs()),
        Err(e) => CellValue::Error(e),
    }
}

pub fn power(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match two_number_args(args) {
        Ok((base, exp)) => CellValue::Number(base.powf(exp)),
        Err(e) => CellValue::Error(e),
    }
}

pub fn sqrt(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match coerce::to_number(&args.first().map(FnArg::as_scalar).unwrap_or(CellValue::Empty)) {
        Ok(n) if n < 0.0 => CellValue::Error(ErrorKind::Num),
        Ok(n) => CellValue::Number(n.sqrt()),
        Err(e) => CellValue::Error(e),
    }
}

pub fn modulo(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match two_number_args(args) {
        Ok((_, d)) if d == 0.0 => CellValue::Error(ErrorKind::DivZero),
        Ok((n, d)) => CellValue::Number(n - d * (n / d).floor()),
        Err(e) => CellValue::Error(e),
    }
}

pub fn rand(_args: &[FnArg], ctx: &FnCtx) -> CellValue {
    CellValue::Number(ctx.rng.borrow_mut().gen::<f64>())
}

pub fn randbetween(args: &[FnArg], ctx: &FnCtx) -> CellValue {
    match two_number_args(args) {
        Ok((lo, hi)) if lo > hi => CellValue::Error(ErrorKind::Num),
        Ok((lo, hi)) => {
            let (lo, hi) = (lo.ceil() as i64, hi.floor() as i64);
            CellValue::Number(ctx.rng.borrow_mut().gen_range(lo..=hi) as f64)
        }
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

    fn ctx() -> (FixedClock, RefCell<rand::rngs::SmallRng>) {
        (
            FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()),
            RefCell::new(rand::rngs::SmallRng::seed_from_u64(1)),
        )
    }

    fn args_num(ns: &[f64]) -> Vec<FnArg> {
        ns.iter().map(|n| FnArg::Scalar(CellValue::Number(*n))).collect()
    }

    #[test]
    fn sum_and_average() {
        let (clock, rng) = ctx();
        let fctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(sum(&args_num(&[1.0, 2.0, 3.0]), &fctx), CellValue::Number(6.0));
        assert_eq!(average(&args_num(&[1.0, 2.0, 3.0]), &fctx), CellValue::Number(2.0));
    }

    #[test]
    fn average_of_empty_is_div_zero() {
        let (clock, rng) = ctx();
        let fctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(average(&[], &fctx), CellValue::Error(ErrorKind::DivZero));
    }

    #[test]
    fn round_half_up() {
        let (clock, rng) = ctx();
        let fctx = FnCtx { clock: &clock, rng: &rng };
        let args = vec![FnArg::Scalar(CellValue::Number(2.345)), FnArg::Scalar(CellValue::Number(2.0))];
        assert_eq!(round(&args, &fctx), CellValue::Number(2.35));
    }

    #[test]
    fn mod_matches_excel_sign_convention() {
        let (clock, rng) = ctx();
        let fctx = FnCtx { clock: &clock, rng: &rng };
        let args = vec![FnArg::Scalar(CellValue::Number(-7.0)), FnArg::Scalar(CellValue::Number(3.0))];
        assert_eq!(modulo(&args, &fctx), CellValue::Number(2.0));
    }

    #[test]
    fn median_even_count_averages_middle_pair() {
        let (clock, rng) = ctx();
        let fctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(median(&args_num(&[1.0, 2.0, 3.0, 4.0]), &fctx), CellValue::Number(2.5));
    }
}
