//! Calendar-date helpers. Everything here works on UTC calendar dates (`NaiveDate`);
//! conversion to a display timezone belongs to the presentation layer.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use crate::error::AppError;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses `YYYY-MM-DD`. A full RFC 3339 timestamp is accepted and truncated to its UTC date.
pub fn date_from_iso_date_string(value: &str) -> Result<NaiveDate, AppError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT) {
        return Ok(date);
    }
    chrono::DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.naive_utc().date())
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn time_from_string(value: &str) -> Result<NaiveTime, AppError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", value)))
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Inclusive on both ends.
pub fn is_within_range(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    from <= date && date <= to
}

pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn validate_range(from: NaiveDate, to: NaiveDate) -> Result<(), AppError> {
    if from > to {
        return Err(AppError::Validation(format!(
            "date_from {} is after date_to {}",
            format_iso_date(from),
            format_iso_date(to)
        )));
    }
    Ok(())
}
