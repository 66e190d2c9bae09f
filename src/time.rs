use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use crate::error::{ContextError, Result};

/// Format used for `timestamp` query parameters.
pub const QUERY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format used to display visit dates.
pub const DISPLAY_FORMAT: &str = "%d %B %Y, %H:%M:%S UTC";

/// Parse a visit timestamp given as ISO 8601 (with or without time and
/// offset) or as a number of seconds since the epoch.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&date));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    if let Ok(seconds) = value.parse::<i64>() {
        if let Some(date) = DateTime::from_timestamp(seconds, 0) {
            return Ok(date);
        }
    }
    Err(ContextError::bad_input(format!("Invalid timestamp: {}", value)))
}

pub fn format_query_timestamp(date: &DateTime<Utc>) -> String {
    date.format(QUERY_TIMESTAMP_FORMAT).to_string()
}

pub fn format_display_date(date: &DateTime<Utc>) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}
