//! Timestamp parsing for webhook payloads
//!
//! Reservation services emit ISO-8601 timestamps with either a `Z` suffix or
//! an explicit offset, and some of them use nanosecond precision. All values
//! are normalized to `DateTime<Utc>` at parse time so window comparisons never
//! mix naive and offset-aware values.
//!
//! Fractional seconds beyond six digits are truncated, never rounded. A
//! timestamp can therefore move down by up to 999 nanoseconds, which matters
//! only when it lands exactly on a reservation window boundary.
//! Timestamps without any offset are interpreted as UTC.

use crate::error::EventError;
use chrono::{DateTime, SecondsFormat, Utc};

const UTC_OFFSET: &str = "+00:00";
const MAX_FRACTION_DIGITS: usize = 6;

/// Parse an ISO-8601 timestamp into UTC
///
/// # Arguments
/// * `raw` - Timestamp such as `2024-01-01T00:00:00.1234567Z` or `2024-01-01T01:00:00+01:00`
///
/// # Returns
/// * `Ok(DateTime<Utc>)` - Parsed timestamp truncated to microseconds
/// * `Err(EventError::InvalidTimestamp)` - If the value is not a valid timestamp
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, EventError> {
    let trimmed = raw.trim();
    let (body, offset) = split_offset(trimmed);
    let normalized = format!("{}{}", truncate_fraction(body), offset);

    DateTime::parse_from_rfc3339(&normalized)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| EventError::InvalidTimestamp(format!("{}: {}", raw, e)))
}

/// Format a timestamp the way it is echoed back to callers
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Split a timestamp into its date-time body and its UTC offset
fn split_offset(value: &str) -> (&str, &str) {
    if let Some(body) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        return (body, UTC_OFFSET);
    }

    // Offsets only appear after the time separator; the date part is full of '-'
    let time_start = value.find(['T', 't', ' ']).map_or(value.len(), |i| i + 1);
    match value[time_start..].rfind(['+', '-']) {
        Some(pos) => value.split_at(time_start + pos),
        None => (value, UTC_OFFSET),
    }
}

/// Truncate fractional seconds to microsecond precision
fn truncate_fraction(body: &str) -> String {
    let Some(dot) = body.rfind('.') else {
        return body.to_string();
    };

    let (head, fraction) = body.split_at(dot);
    let digits = &fraction[1..];
    if digits.len() <= MAX_FRACTION_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return body.to_string();
    }

    format!("{}.{}", head, &digits[..MAX_FRACTION_DIGITS])
}

/// Serde adapter for required timestamp fields
pub mod serde_timestamp {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(value))
    }

    /// Serde adapter for optional timestamp fields
    pub mod option {
        use super::super::{format_timestamp, parse_timestamp};
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse_timestamp(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_str(&format_timestamp(value)),
                None => serializer.serialize_none(),
            }
        }
    }
}
