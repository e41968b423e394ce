//! Calendar parsing for target dates and corpus record dates.
//!
//! Target dates arrive in display format (`"14 July 1789"`) and are parsed
//! through an explicit month-name table, so parsing never depends on the
//! process locale. Record dates in the corpus are free-form; the robust
//! parser tries numeric formats first and falls back to interpreting the
//! string as a bare year.

use chrono::NaiveDate;

use crate::error::GenerateError;

/// Month and day a year-only record date is anchored to, so such records
/// remain comparable on a day-granularity timeline. Midyear by policy.
pub const YEAR_ONLY_ANCHOR: (u32, u32) = (6, 15);

/// English month names, in the input language of the display format.
const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}

/// Parse a display-format target date like `"14 July 1789"`.
///
/// # Errors
///
/// [`GenerateError::InvalidTargetDate`] if the string is not
/// day-month-name-year or names an impossible calendar date.
pub fn parse_target_date(input: &str) -> Result<NaiveDate, GenerateError> {
    let invalid = || {
        GenerateError::InvalidTargetDate(format!(
            "'{input}' — expected day-month-year, e.g. '14 July 1789'"
        ))
    };

    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(invalid());
    }

    let day: u32 = parts[0].parse().map_err(|_| invalid())?;
    let month = month_number(parts[1]).ok_or_else(invalid)?;
    let year: i32 = parts[2].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Best-effort parse of a corpus record's date string.
///
/// Tries the numeric formats `YYYY-MM-DD`, `DD-MM-YYYY`, and `DD.MM.YYYY`
/// in that order; if all fail, interprets the string as a bare year and
/// anchors it to [`YEAR_ONLY_ANCHOR`]. Returns `None` when nothing
/// matches; such records are dropped from date filtering.
pub fn parse_record_date(input: &str) -> Option<NaiveDate> {
    parse_record_date_anchored(input, YEAR_ONLY_ANCHOR)
}

fn parse_record_date_anchored(input: &str, anchor: (u32, u32)) -> Option<NaiveDate> {
    let trimmed = input.trim();

    for format in ["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    if let Ok(year) = trimmed.parse::<i32>() {
        return NaiveDate::from_ymd_opt(year, anchor.0, anchor.1);
    }

    None
}

/// Absolute distance between two dates in whole days.
pub fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}
