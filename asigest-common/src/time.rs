//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 text (microseconds, `Z` suffix)
///
/// Columns that are ordered by time store this form so that text order
/// matches time order.
pub fn sortable(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whole minutes elapsed between two instants (negative spans clamp to 0)
pub fn whole_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().max(0) / 60
}
