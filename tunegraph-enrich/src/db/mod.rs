//! Entity store access
//!
//! Free functions over `&SqlitePool`, one statement each. Nothing here wraps
//! several writes in a transaction: every write is independent and idempotent,
//! so an interrupted run leaves the store consistent and the next run simply
//! picks up whatever is still pending.

pub mod artists;
pub mod genres;
pub mod history;
pub mod settings;
pub mod similar;
pub mod status;
pub mod tracks;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp the way it is stored (RFC 3339, UTC, second precision)
///
/// A single fixed format keeps text comparison and `MAX()` chronological.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2023, 9, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2023, 10, 1, 7, 0, 0).unwrap();

        assert_eq!(format_timestamp(early), "2023-09-01T08:00:00Z");
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(parse_timestamp(&format_timestamp(late)), Some(late));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
