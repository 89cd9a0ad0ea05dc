//! Calendar functions, built on the 1900 serial-date system.

use chrono::{Datelike, NaiveDate};
use formulon_common::{CellValue, ErrorKind};

use crate::coerce;
use crate::function::{FnArg, FnCtx};
use crate::serial_date::{date_to_serial, datetime_to_serial, serial_to_date};

fn date_arg(args: &[FnArg], i: usize) -> Result<NaiveDate, ErrorKind> {
    let n = coerce::to_number(&args.get(i).map(FnArg::as_scalar).unwrap_or(CellValue::Empty))?;
    serial_to_date(n).ok_or(ErrorKind::Num)
}

pub fn today(_args: &[FnArg], ctx: &FnCtx) -> CellValue {
    CellValue::Number(date_to_serial(ctx.clock.now().date()))
}

pub fn now(_args: &[FnArg], ctx: &FnCtx) -> CellValue {
    CellValue::Number(datetime_to_serial(ctx.clock.now()))
}

pub fn year(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match date_arg(args, 0) {
        Ok(d) => CellValue::Number(d.year() as f64),
        Err(e) => CellValue::Error(e),
    }
}

pub fn month(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match date_arg(args, 0) {
        Ok(d) => CellValue::Number(d.month() as f64),
        Err(e) => CellValue::Error(e),
    }
}

pub fn day(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match date_arg(args, 0) {
        Ok(d) => CellValue::Number(d.day() as f64),
        Err(e) => CellValue::Error(e),
    }
}

/// Last day of the month `months` away from `start_date` (negative steps
/// back). `months = 0` is the end of `start_date`'s own month.
pub fn eomonth(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<NaiveDate, ErrorKind> {
        let start = date_arg(args, 0)?;
        let months = coerce::to_number(&args.get(1).map(FnArg::as_scalar).unwrap_or(CellValue::Number(0.0)))? as i32;
        let total = start.year() * 12 + (start.month() as i32 - 1) + months;
        let (year, month0) = (total.div_euclid(12), total.rem_euclid(12));
        let next_month_first = if month0 == 11 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, (month0 + 2) as u32, 1)
        }
        .ok_or(ErrorKind::Num)?;
        next_month_first.pred_opt().ok_or(ErrorKind::Num)
    })() {
        Ok(d) => CellValue::Number(date_to_serial(d)),
        Err(e) => CellValue::Error(e),
    }
}

/// `DATEDIF(start, end, unit)`: whole years ("Y"), whole months ("M"), or
/// whole days ("D") elapsed between two dates.
pub fn datedif(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<f64, ErrorKind> {
        let start = date_arg(args, 0)?;
        let end = date_arg(args, 1)?;
        let unit = coerce::to_text(&args.get(2).map(FnArg::as_scalar).unwrap_or(CellValue::Text("D".into())))?
            .to_uppercase();
        if end < start {
            return Err(ErrorKind::Num);
        }
        match unit.as_str() {
            "D" => Ok((end - start).num_days() as f64),
            "M" => {
                let mut months = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
                if end.day() < start.day() {
                    months -= 1;
                }
                Ok(months.max(0) as f64)
            }
            "Y" => {
                let mut years = end.year() - start.year();
                if (end.month(), end.day()) < (start.month(), start.day()) {
                    years -= 1;
                }
                Ok(years.max(0) as f64)
            }
            _ => Err(ErrorKind::Num),
        }
    })() {
        Ok(n) => CellValue::Number(n),
        Err(e) => CellValue::Error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::clock::FixedClock;
    use rand::SeedableRng;

    fn fctx_at(date: NaiveDate) -> (FixedClock, RefCell<rand::rngs::SmallRng>) {
        (FixedClock(date.and_hms_opt(0, 0, 0).unwrap()), RefCell::new(rand::rngs::SmallRng::seed_from_u64(1)))
    }

    #[test]
    fn today_reflects_the_injected_clock() {
        let (clock, rng) = fctx_at(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        let ctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(today(&[], &ctx), CellValue::Number(date_to_serial(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())));
    }

    #[test]
    fn year_month_day_roundtrip() {
        let (clock, rng) = fctx_at(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let serial = date_to_serial(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        let arg = vec![FnArg::Scalar(CellValue::Number(serial))];
        assert_eq!(year(&arg, &ctx), CellValue::Number(2024.0));
        assert_eq!(month(&arg, &ctx), CellValue::Number(6.0));
        assert_eq!(day(&arg, &ctx), CellValue::Number(15.0));
    }

    #[test]
    fn eomonth_zero_is_end_of_same_month() {
        let (clock, rng) = fctx_at(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let serial = date_to_serial(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        let args = vec![FnArg::Scalar(CellValue::Number(serial)), FnArg::Scalar(CellValue::Number(0.0))];
        let expect = date_to_serial(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(eomonth(&args, &ctx), CellValue::Number(expect));
    }

    #[test]
    fn datedif_whole_years() {
        let (clock, rng) = fctx_at(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let start = date_to_serial(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        let end = date_to_serial(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let args = vec![
            FnArg::Scalar(CellValue::Number(start)),
            FnArg::Scalar(CellValue::Number(end)),
            FnArg::Scalar(CellValue::Text("Y".into())),
        ];
        assert_eq!(datedif(&args, &ctx), CellValue::Number(3.0));
    }
}
