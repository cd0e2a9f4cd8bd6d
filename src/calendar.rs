use chrono::{Datelike, Duration, NaiveDate};

use crate::types::Frequency;

/// advance a date by a whole number of billing periods
///
/// monthly advancement is always computed from the anchor date, so a plan
/// anchored on the 31st lands on the last day of short months and returns
/// to the 31st afterwards.
pub fn advance(anchor: NaiveDate, frequency: Frequency, periods: u32) -> NaiveDate {
    match frequency {
        Frequency::Weekly => anchor + Duration::days(7 * periods as i64),
        Frequency::Biweekly => anchor + Duration::days(14 * periods as i64),
        Frequency::Monthly => add_months(anchor, periods),
    }
}

/// add calendar months, preserving day-of-month with end-of-month clamping
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
