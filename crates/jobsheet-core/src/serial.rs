//! Spreadsheet date serials (1900 date system)
//!
//! Serial 1 is 1900-01-01. The format counts a 1900-02-29 that never
//! existed (serial 60), so every date from 1900-03-01 on is one higher than
//! a plain day count would give.

use chrono::{Days, NaiveDate};

/// Serial of the non-existent 1900-02-29
pub const PHANTOM_LEAP_DAY: u32 = 60;

fn first_day() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1900, 1, 1)
}

/// Convert a calendar date into its date serial.
///
/// Returns `None` for dates before 1900-01-01.
pub fn date_to_serial(date: NaiveDate) -> Option<u32> {
    let first = first_day()?;
    if date < first {
        return None;
    }
    let days = (date - first).num_days() + 1;
    let serial = if days >= i64::from(PHANTOM_LEAP_DAY) {
        days + 1
    } else {
        days
    };
    u32::try_from(serial).ok()
}

/// Convert a date serial back into a calendar date.
///
/// Serial 0 and the phantom leap day have no calendar date.
pub fn serial_to_date(serial: u32) -> Option<NaiveDate> {
    let first = first_day()?;
    match serial {
        0 | PHANTOM_LEAP_DAY => None,
        s if s < PHANTOM_LEAP_DAY => first.checked_add_days(Days::new(u64::from(s - 1))),
        s => first.checked_add_days(Days::new(u64::from(s - 2))),
    }
}
