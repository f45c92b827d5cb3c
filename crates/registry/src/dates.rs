//! Lenient timestamp parsing for client-supplied date strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an optional ISO-8601 string.
///
/// Accepts RFC 3339 (any offset, normalized to UTC), a naive date-time which is
/// taken as UTC, or a bare `YYYY-MM-DD`. Anything else yields `None`; a bad
/// date never fails the surrounding operation.
pub fn parse_lenient_timestamp(field: &'static str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.and_utc());
        }
    }

    if let Some(ts) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(ts.and_utc());
    }

    tracing::debug!(field, value = raw, "unparseable timestamp left unset");
    None
}
