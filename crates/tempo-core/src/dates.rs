//! Calendar-date handling for completion scoping.
//!
//! Every date that scopes a completion lookup or write is reduced to
//! date-only precision first. Stored values are `YYYY-MM-DD` strings, and
//! all matching uses the half-open range `[day, next_day)` so that legacy
//! rows carrying a residual time component (`YYYY-MM-DDTHH:MM:SS`) still
//! land inside the right day lexicographically.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Weekday column names indexed by days-from-Sunday (0 = Sunday).
/// A fixed table rather than a locale-dependent day-name API.
pub const WEEKDAY_COLUMNS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

#[derive(Debug, thiserror::Error)]
#[error("invalid date: {0}")]
pub struct InvalidDate(pub String);

/// Parse an ISO-8601 date or datetime, truncating any time component.
pub fn normalize_date(input: &str) -> Result<NaiveDate, InvalidDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    Err(InvalidDate(trimmed.to_owned()))
}

/// Storage form of a normalized date.
pub fn storage_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Half-open `[start, end)` bounds covering one calendar day.
pub fn day_range(date: NaiveDate) -> (String, String) {
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    (storage_key(date), storage_key(next))
}

/// Boolean column selecting playlists scheduled on this date's weekday.
pub fn weekday_column(date: NaiveDate) -> &'static str {
    WEEKDAY_COLUMNS[date.weekday().num_days_from_sunday() as usize]
}

/// Today in the server's local timezone.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
