use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{DomainError, DomainResult};

/// Outbound timestamp layout, `YYYYMMDDHHMMSS`
pub const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn format_compact(at: DateTime<Utc>) -> String {
    at.format(COMPACT_FORMAT).to_string()
}

/// Parses an inbound transport timestamp
///
/// Accepts the compact form, RFC 3339, and ISO-8601 without an offset (read as
/// UTC). Fractional seconds are allowed in the ISO forms.
pub fn parse_timestamp(value: &str) -> DomainResult<DateTime<Utc>> {
    let value = value.trim();

    if value.len() == 14 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDateTime::parse_from_str(value, COMPACT_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| DomainError::InvalidTimestamp(format!("{}: {}", value, e)));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| DomainError::InvalidTimestamp(value.to_string()))
}
