//! Maps a formula's uppercased function name to its implementation.
//!
//! `IF`/`IFS`/`SWITCH` are deliberately absent — the interpreter dispatches
//! them straight to its own lazy handling before ever consulting this
//! table, since a registered `BuiltinFn` only ever sees already-evaluated
//! arguments.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::builtins::{conditional, date, lookup, logical, math, text};
use crate::function::BuiltinFn;

static REGISTRY: Lazy<FxHashMap<&'static str, BuiltinFn>> = Lazy::new(|| {
    let mut m: FxHashMap<&'static str, BuiltinFn> = FxHashMap::default();
    m.insert("SUM", math::sum);
    m.insert("AVERAGE", math::average);
    m.insert("MIN", math::min);
    m.insert("MAX", math::max);
    m.insert("COUNT", math::count);
    m.insert("COUNTA", math::counta);
    m.insert("MEDIAN", math::median);
    m.insert("STDEV", math::stdev);
    m.insert("STDEV.P", math::stdev_p);
    m.insert("VAR.S", math::var_s);
    m.insert("VAR.P", math::var_p);
    m.insert("ROUND", math::round);
    m.insert("ROUNDUP", math::roundup);
    m.insert("ROUNDDOWN", math::rounddown);
    m.insert("CEILING", math::ceiling);
    m.insert("FLOOR", math::floor);
    m.insert("INT", math::int);
    m.insert("ABS", math::abs);
    m.insert("POWER", math::power);
    m.insert("SQRT", math::sqrt);
    m.insert("MOD", math::modulo);
    m.insert("RAND", math::rand);
    m.insert("RANDBETWEEN", math::randbetween);

    m.insert("AND", logical::and);
    m.insert("OR", logical::or);
    m.insert("NOT", logical::not);

    m.insert("CONCAT", text::concat);
    m.insert("CONCATENATE", text::concat);
    m.insert("LEFT", text::left);
    m.insert("RIGHT", text::right);
    m.insert("MID", text::mid);
    m.insert("LEN", text::len);
    m.insert("UPPER", text::upper);
    m.insert("LOWER", text::lower);
    m.insert("TRIM", text::trim);
    m.insert("PROPER", text::proper);
    m.insert("FIND", text::find);
    m.insert("SEARCH", text::search);
    m.insert("SUBSTITUTE", text::substitute);
    m.insert("TEXT", text::text);
    m.insert("VALUE", text::value);
    m.insert("CLEAN", text::clean);
    m.insert("EXACT", text::exact);
    m.insert("REPT", text::rept);

    m.insert("TODAY", date::today);
    m.insert("NOW", date::now);
    m.insert("YEAR", date::year);
    m.insert("MONTH", date::month);
    m.insert("DAY", date::day);
    m.insert("DATEDIF", date::datedif);
    m.insert("EOMONTH", date::eomonth);

    m.insert("COUNTIF", conditional::countif);
    m.insert("SUMIF", conditional::sumif);

    m.insert("VLOOKUP", lookup::vlookup);
    m.insert("HLOOKUP", lookup::hlookup);
    m.insert("INDEX", lookup::index);

    m
});

/// Looks up a builtin by name (case-insensitive). Returns `None` for
/// `IF`/`IFS`/`SWITCH`, which the interpreter never routes through here.
pub fn lookup(name: &str) -> Option<BuiltinFn> {
    REGISTRY.get(name.to_uppercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("sum").is_some());
        assert!(lookup("Sum").is_some());
        assert!(lookup("SUM").is_some());
    }

    #[test]
    fn conditional_dispatch_functions_are_not_registered() {
        assert!(lookup("IF").is_none());
        assert!(lookup("IFS").is_none());
        assert!(lookup("SWITCH").is_none());
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(lookup("NOT_A_FUNCTION").is_none());
    }
}
