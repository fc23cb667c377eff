//! Timestamp and hour-key utilities
//!
//! Hour keys (`YYYY-MM-DD-HH`, UTC) are the sole aggregation granularity and
//! cache partition unit for epinet bins.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, Utc};

/// Hour key format (UTC)
pub const HOUR_KEY_FORMAT: &str = "%Y-%m-%d-%H";

/// Canonical storage format for event timestamps (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Truncate a timestamp to the start of its UTC hour
pub fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::hours(1)).unwrap_or(ts)
}

/// Hour key for a timestamp
pub fn hour_key(ts: DateTime<Utc>) -> String {
    ts.format(HOUR_KEY_FORMAT).to_string()
}

/// Format a timestamp in canonical storage form
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an hour key back into the start of its hour
///
/// Returns `None` for anything that is not a canonical hour key.
pub fn parse_hour_key(key: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(&format!("{}:00", key), "%Y-%m-%d-%H:%M").ok()?;
    let ts = naive.and_utc();
    // Reject non-canonical spellings such as single-digit months
    (hour_key(ts) == key).then_some(ts)
}

/// Whether `key` names the hour that contains `now`
pub fn is_current_hour(key: &str, now: DateTime<Utc>) -> bool {
    key == hour_key(now)
}

/// Hour keys for every hour start in `[start, end)`, oldest first
///
/// `start` is truncated to its hour first, so a partial leading hour is included.
pub fn hour_keys_in_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor = truncate_to_hour(start);
    while cursor < end {
        keys.push(hour_key(cursor));
        cursor += Duration::hours(1);
    }
    keys
}

/// Hour keys between `start_hours_back` (exclusive) and `end_hours_back`
/// (inclusive) relative to `now`, oldest first
///
/// A range where `start_hours_back <= end_hours_back` is treated as empty.
pub fn hour_keys_for_custom_range(
    start_hours_back: u32,
    end_hours_back: u32,
    now: DateTime<Utc>,
) -> Vec<String> {
    if start_hours_back <= end_hours_back {
        return Vec::new();
    }
    (end_hours_back..start_hours_back)
        .rev()
        .map(|back| hour_key(now - Duration::hours(i64::from(back))))
        .collect()
}

/// Hour keys for the last `hours` hours including the current one, oldest first
pub fn hour_keys_back(hours: u32, now: DateTime<Utc>) -> Vec<String> {
    hour_keys_for_custom_range(hours, 0, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_hour_key_truncates_minutes() {
        assert_eq!(hour_key(at(2024, 3, 5, 7, 59)), "2024-03-05-07");
        assert_eq!(hour_key(at(2024, 3, 5, 0, 0)), "2024-03-05-00");
    }

    #[test]
    fn test_truncate_to_hour() {
        assert_eq!(truncate_to_hour(at(2024, 3, 5, 7, 42)), at(2024, 3, 5, 7, 0));
    }

    #[test]
    fn test_parse_hour_key_roundtrip() {
        let ts = parse_hour_key("2024-12-31-23").unwrap();
        assert_eq!(ts, at(2024, 12, 31, 23, 0));
    }

    #[test]
    fn test_parse_hour_key_rejects_garbage() {
        assert!(parse_hour_key("2024-12-31").is_none());
        assert!(parse_hour_key("2024-1-3-5").is_none());
        assert!(parse_hour_key("2024-12-31-24").is_none());
        assert!(parse_hour_key("").is_none());
    }

    #[test]
    fn test_hour_keys_in_span_includes_partial_first_hour() {
        let keys = hour_keys_in_span(at(2024, 3, 5, 22, 30), at(2024, 3, 6, 1, 0));
        assert_eq!(keys, vec!["2024-03-05-22", "2024-03-05-23", "2024-03-06-00"]);
    }

    #[test]
    fn test_custom_range_empty_when_start_not_greater() {
        let now = at(2024, 3, 5, 12, 10);
        assert!(hour_keys_for_custom_range(5, 5, now).is_empty());
        assert!(hour_keys_for_custom_range(2, 10, now).is_empty());
    }

    #[test]
    fn test_custom_range_oldest_first() {
        let now = at(2024, 3, 5, 12, 10);
        let keys = hour_keys_for_custom_range(3, 0, now);
        assert_eq!(keys, vec!["2024-03-05-10", "2024-03-05-11", "2024-03-05-12"]);

        let keys = hour_keys_for_custom_range(5, 3, now);
        assert_eq!(keys, vec!["2024-03-05-08", "2024-03-05-09"]);
    }

    #[test]
    fn test_hour_keys_back_count() {
        let now = at(2024, 3, 5, 12, 10);
        let keys = hour_keys_back(168, now);
        assert_eq!(keys.len(), 168);
        assert_eq!(keys.last().unwrap(), "2024-03-05-12");
    }

    #[test]
    fn test_is_current_hour() {
        let now = at(2024, 3, 5, 12, 10);
        assert!(is_current_hour("2024-03-05-12", now));
        assert!(!is_current_hour("2024-03-05-11", now));
    }
}
