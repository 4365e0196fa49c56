//! Tolerant parsing of the timestamp strings the server hands out.
//!
//! The server is inconsistent: recipe `dateUpdated` values may carry a zone
//! and fractional seconds, be naive, or be plain dates. Every accepted form
//! maps to a UTC instant; anything else is treated as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Two timestamps closer than this are considered the same revision.
pub const TIMESTAMP_TOLERANCE_MS: i64 = 1_000;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses an API timestamp. Never fails: empty or unrecognised input is `None`.
pub fn parse_api_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Naive timestamps are UTC on the server side.
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    tracing::debug!("Could not parse date: {}", value);
    None
}

/// Like [`parse_api_date`] but sorts unparseable values first.
pub fn parse_api_date_for_sort(value: Option<&str>) -> DateTime<Utc> {
    parse_api_date(value).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// True when two instants are within [`TIMESTAMP_TOLERANCE_MS`] of each other.
pub fn effectively_equal(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_milliseconds().abs() < TIMESTAMP_TOLERANCE_MS
}

/// Formats the calendar day of `date` (in its own zone) as the start of that
/// day in UTC, with millisecond precision, the way the server stores
/// `dateAdded`/`dateUpdated` on edits.
pub fn format_date_for_api<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    let day = date.date_naive();
    let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&midnight)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
