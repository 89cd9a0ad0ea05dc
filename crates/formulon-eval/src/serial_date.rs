//! Excel's 1900 date system: days since 1899-12-31, with the historical
//! (incorrect) leap-year quirk that treats 1900 as a leap year. Serial 60
//! is the phantom 1900-02-29; serial 1 is 1900-01-01.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    let days = (date - epoch()).num_days();
    // Every real date on/after 1900-03-01 is one serial number higher than
    // a naive day-count would give, because Excel's phantom Feb 29 1900
    // occupies serial 60.
    if date >= NaiveDate::from_ymd_opt(1900, 3, 1).unwrap() {
        (days + 1) as f64
    } else {
        days as f64
    }
}

pub fn datetime_to_serial(dt: NaiveDateTime) -> f64 {
    let day_part = date_to_serial(dt.date());
    let seconds = dt.time().num_seconds_from_midnight() as f64;
    day_part + seconds / 86_400.0
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let whole = serial.floor() as i64;
    if whole == 60 {
        return None; // the phantom date has no real calendar value
    }
    let adjusted = if whole > 60 { whole - 1 } else { whole };
    epoch().checked_add_signed(chrono::Duration::days(adjusted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_one_is_1900_01_01() {
        assert_eq!(date_to_serial(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()), 1.0);
    }

    #[test]
    fn leap_year_quirk_gives_serial_60_to_feb_29_1900() {
        // 1900-02-28 is serial 59, the next representable serial after
        // the phantom 60 is 1900-03-01 at serial 61.
        assert_eq!(date_to_serial(NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()), 59.0);
        assert_eq!(date_to_serial(NaiveDate::from_ymd_opt(1900, 3, 1).unwrap()), 61.0);
    }

    #[test]
    fn round_trips_a_modern_date() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let serial = date_to_serial(d);
        assert_eq!(serial_to_date(serial), Some(d));
    }
}
