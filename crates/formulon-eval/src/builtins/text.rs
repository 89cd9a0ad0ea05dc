//! String functions.

use formulon_common::{CellValue, ErrorKind};

use crate::builtins::criteria;
use crate::coerce;
use crate::function::{FnArg, FnCtx};

fn text_arg(args: &[FnArg], i: usize) -> Result<String, ErrorKind> {
    coerce::to_text(&args.get(i).map(FnArg::as_scalar).unwrap_or(CellValue::Empty))
}

fn num_arg(args: &[FnArg], i: usize) -> Result<f64, ErrorKind> {
    coerce::to_number(&args.get(i).map(FnArg::as_scalar).unwrap_or(CellValue::Empty))
}

fn wrap(r: Result<String, ErrorKind>) -> CellValue {
    match r {
        Ok(s) => CellValue::Text(s),
        Err(e) => CellValue::Error(e),
    }
}

pub fn concat(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    let mut out = String::new();
    for (i, _) in args.iter().enumerate() {
        match text_arg(args, i) {
            Ok(s) => out.push_str(&s),
            Err(e) => return CellValue::Error(e),
        }
    }
    CellValue::Text(out)
}

pub fn left(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap((|| {
        let s = text_arg(args, 0)?;
        let n = if args.len() > 1 { num_arg(args, 1)? } else { 1.0 } as usize;
        Ok(s.chars().take(n).collect())
    })())
}

pub fn right(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap((|| {
        let s = text_arg(args, 0)?;
        let n = if args.len() > 1 { num_arg(args, 1)? } else { 1.0 } as usize;
        let chars: Vec<char> = s.chars().collect();
        let start = chars.len().saturating_sub(n);
        Ok(chars[start..].iter().collect())
    })())
}

pub fn mid(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<String, ErrorKind> {
        let s = text_arg(args, 0)?;
        let start = num_arg(args, 1)? as i64;
        let len = num_arg(args, 2)? as i64;
        if start < 1 || len < 0 {
            return Err(ErrorKind::Value);
        }
        let chars: Vec<char> = s.chars().collect();
        let start = (start as usize).saturating_sub(1).min(chars.len());
        let end = (start + len as usize).min(chars.len());
        Ok(chars[start..end].iter().collect())
    })() {
        Ok(s) => CellValue::Text(s),
        Err(e) => CellValue::Error(e),
    }
}

pub fn len(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match text_arg(args, 0) {
        Ok(s) => CellValue::Number(s.chars().count() as f64),
        Err(e) => CellValue::Error(e),
    }
}

pub fn upper(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap(text_arg(args, 0).map(|s| s.to_uppercase()))
}

pub fn lower(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap(text_arg(args, 0).map(|s| s.to_lowercase()))
}

pub fn trim(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap(text_arg(args, 0).map(|s| {
        let collapsed: Vec<&str> = s.split_whitespace().collect();
        collapsed.join(" ")
    }))
}

pub fn proper(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap(text_arg(args, 0).map(|s| {
        let mut out = String::with_capacity(s.len());
        let mut start_of_word = true;
        for c in s.chars() {
            if c.is_alphanumeric() {
                if start_of_word {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                start_of_word = false;
            } else {
                out.push(c);
                start_of_word = true;
            }
        }
        out
    }))
}

pub fn find(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<f64, ErrorKind> {
        let needle = text_arg(args, 0)?;
        let hay = text_arg(args, 1)?;
        let start = if args.len() > 2 { num_arg(args, 2)? as usize } else { 1 };
        let hay_chars: Vec<char> = hay.chars().collect();
        let skip = start.saturating_sub(1).min(hay_chars.len());
        let haystack_from: String = hay_chars[skip..].iter().collect();
        haystack_from
            .find(needle.as_str())
            .map(|byte_pos| (haystack_from[..byte_pos].chars().count() + skip + 1) as f64)
            .ok_or(ErrorKind::Value)
    })() {
        Ok(n) => CellValue::Number(n),
        Err(e) => CellValue::Error(e),
    }
}

/// Case-insensitive `FIND` that also honours `*`/`?` wildcards in the
/// needle, via the same glob matcher `COUNTIF`/`SUMIF` use for criteria.
pub fn search(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<f64, ErrorKind> {
        let needle = text_arg(args, 0)?;
        let hay = text_arg(args, 1)?;
        let start = if args.len() > 2 { num_arg(args, 2)? as usize } else { 1 };
        let hay_chars: Vec<char> = hay.chars().collect();
        let skip = start.saturating_sub(1).min(hay_chars.len());
        let haystack_from: String = hay_chars[skip..].iter().collect();

        if needle.contains('*') || needle.contains('?') {
            criteria::glob_find(&needle, &haystack_from)
                .map(|idx| (idx + skip + 1) as f64)
                .ok_or(ErrorKind::Value)
        } else {
            let haystack_from_lc = haystack_from.to_lowercase();
            let needle_lc = needle.to_lowercase();
            haystack_from_lc
                .find(needle_lc.as_str())
                .map(|byte_pos| (haystack_from_lc[..byte_pos].chars().count() + skip + 1) as f64)
                .ok_or(ErrorKind::Value)
        }
    })() {
        Ok(n) => CellValue::Number(n),
        Err(e) => CellValue::Error(e),
    }
}

pub fn substitute(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<String, ErrorKind> {
        let s = text_arg(args, 0)?;
        let old = text_arg(args, 1)?;
        let new = text_arg(args, 2)?;
        if old.is_empty() {
            return Ok(s);
        }
        if args.len() > 3 {
            let which = num_arg(args, 3)? as usize;
            if which == 0 {
                return Err(ErrorKind::Value);
            }
            let mut count = 0;
            let mut out = String::new();
            let mut rest = s.as_str();
            while let Some(pos) = rest.find(&old) {
                count += 1;
                if count == which {
                    out.push_str(&rest[..pos]);
                    out.push_str(&new);
                    out.push_str(&rest[pos + old.len()..]);
                    return Ok(out);
                } else {
                    out.push_str(&rest[..pos + old.len()]);
                    rest = &rest[pos + old.len()..];
                }
            }
            out.push_str(rest);
            Ok(out)
        } else {
            Ok(s.replace(&old, &new))
        }
    })() {
        Ok(s) => CellValue::Text(s),
        Err(e) => CellValue::Error(e),
    }
}

pub fn text(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    // A simplified formatter: only recognises the handful of numeric
    // patterns the required function set actually needs ("0", "0.00",
    // "#,##0"), falling back to the shortest round-tripping decimal.
    match (|| -> Result<String, ErrorKind> {
        let n = num_arg(args, 0)?;
        let fmt = text_arg(args, 1)?;
        Ok(apply_number_format(n, &fmt))
    })() {
        Ok(s) => CellValue::Text(s),
        Err(e) => CellValue::Error(e),
    }
}

fn apply_number_format(n: f64, fmt: &str) -> String {
    let decimals = fmt.split('.').nth(1).map(|frac| frac.chars().filter(|c| *c == '0').count());
    let grouped = fmt.contains(',');
    let rendered = match decimals {
        Some(d) => format!("{:.*}", d, n),
        None => coerce::format_number(n),
    };
    if grouped {
        group_thousands(&rendered)
    } else {
        rendered
    }
}

fn group_thousands(s: &str) -> String {
    let neg = s.starts_with('-');
    let s = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();
    let mut out = String::new();
    if neg {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}

pub fn value(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match text_arg(args, 0) {
        Ok(s) => match s.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Error(ErrorKind::Value),
        },
        Err(e) => CellValue::Error(e),
    }
}

pub fn clean(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    wrap(text_arg(args, 0).map(|s| s.chars().filter(|c| !c.is_control()).collect()))
}

pub fn exact(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (text_arg(args, 0), text_arg(args, 1)) {
        (Ok(a), Ok(b)) => CellValue::Boolean(a == b),
        (Err(e), _) | (_, Err(e)) => CellValue::Error(e),
    }
}

pub fn rept(args: &[FnArg], _ctx: &FnCtx) -> CellValue {
    match (|| -> Result<String, ErrorKind> {
        let s = text_arg(args, 0)?;
        let n = num_arg(args, 1)?;
        if n < 0.0 {
            return Err(ErrorKind::Value);
        }
        Ok(s.repeat(n as usize))
    })() {
        Ok(s) => CellValue::Text(s),
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

    fn text_args(vals: &[&str]) -> Vec<FnArg> {
        vals.iter().map(|s| FnArg::Scalar(CellValue::Text(s.to_string()))).collect()
    }

    #[test]
    fn left_right_mid() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(left(&text_args(&["hello", "2"]), &ctx), CellValue::Text("he".into()));
        assert_eq!(right(&text_args(&["hello", "2"]), &ctx), CellValue::Text("lo".into()));
        assert_eq!(mid(&text_args(&["hello", "2", "3"]), &ctx), CellValue::Text("ell".into()));
    }

    #[test]
    fn proper_capitalizes_each_word() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(proper(&text_args(&["mary ann smith"]), &ctx), CellValue::Text("Mary Ann Smith".into()));
    }

    #[test]
    fn substitute_all_occurrences() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(
            substitute(&text_args(&["a-b-c", "-", "/"]), &ctx),
            CellValue::Text("a/b/c".into())
        );
    }

    #[test]
    fn find_is_case_sensitive() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(find(&text_args(&["l", "hello"]), &ctx), CellValue::Number(3.0));
        assert_eq!(find(&text_args(&["L", "hello"]), &ctx), CellValue::Error(ErrorKind::Value));
    }

    #[test]
    fn search_is_case_insensitive_and_honours_wildcards() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        assert_eq!(search(&text_args(&["L", "hello"]), &ctx), CellValue::Number(3.0));
        assert_eq!(search(&text_args(&["a*c", "xabcy"]), &ctx), CellValue::Number(2.0));
    }

    #[test]
    fn text_applies_decimal_and_grouping() {
        let (clock, rng) = fctx();
        let ctx = FnCtx { clock: &clock, rng: &rng };
        let args = vec![FnArg::Scalar(CellValue::Number(1234.5)), FnArg::Scalar(CellValue::Text("#,##0.00".into()))];
        assert_eq!(text(&args, &ctx), CellValue::Text("1,234.50".into()));
    }
}
