//! Parsing of observation instants from user input.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Date-time formats tried after RFC 3339, in order. Values are UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Date-only formats; the instant is midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse a date or date-time string.
///
/// Accepts RFC 3339 (with offset) and the day-first and ISO layouts listed in
/// [`supported_formats`]. Ambiguous slash dates are read day-first; the
/// month-first reading is only used when the day-first one is invalid.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }

    let full = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok());
    let date_only = || {
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    };

    full.or_else(date_only)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidDate {
            input: input.to_string(),
        })
}

/// Every accepted layout, for help text.
pub fn supported_formats() -> Vec<&'static str> {
    let mut formats = vec!["RFC 3339"];
    formats.extend(DATETIME_FORMATS);
    formats.extend(DATE_FORMATS);
    formats
}
