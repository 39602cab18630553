//! Duration and run-date formatting

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// Format milliseconds as `HH:MM:SS`, hours not wrapped at 24
pub fn ms_to_time(duration_ms: u64) -> String {
    let hours = duration_ms / MS_PER_HOUR;
    let minutes = (duration_ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (duration_ms % MS_PER_MINUTE) / MS_PER_SECOND;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Read a duration in milliseconds from any non-negative JSON number.
///
/// Hosts report fractional milliseconds; the value is rounded to the nearest
/// whole millisecond.
pub fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 {
        return Err(D::Error::custom(format!(
            "invalid duration {}, expected non-negative milliseconds",
            value
        )));
    }
    Ok(value.round() as u64)
}

/// RFC 3339 UTC timestamp as stored in the history database
pub fn format_run_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human-readable local rendering of a stored run date; unparseable input is
/// returned unchanged
pub fn format_local(run_date: &str) -> String {
    match DateTime::parse_from_rfc3339(run_date) {
        Ok(date) => date
            .with_timezone(&Local)
            .format("%d-%b-%Y %I:%M %p")
            .to_string(),
        Err(_) => run_date.to_string(),
    }
}
