//! Time utilities for usage timestamps
//!
//! The traffic report carries millisecond epochs while usage facts are keyed
//! on whole seconds. Every path that builds a `UsageKey` goes through
//! [`canonical_timestamp`] so writes and existence checks agree.

use chrono::{DateTime, Days, NaiveDate, Utc};
use std::time::Duration;

/// Floor-truncate a millisecond epoch to whole seconds.
///
/// Floors toward negative infinity so `-1ms` lands on `-1s`, never on `0s`.
pub fn truncate_millis_to_seconds(timestamp_ms: i64) -> i64 {
    timestamp_ms.div_euclid(1000)
}

/// Canonical UTC instant for an upstream millisecond timestamp
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn canonical_timestamp(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(truncate_millis_to_seconds(timestamp_ms), 0)
}

/// Start of the reconciliation window as unix seconds (`now - lookback`)
pub fn window_start(now: DateTime<Utc>, lookback: Duration) -> i64 {
    let lookback = chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::days(1));
    (now - lookback).timestamp()
}

/// Half-open epoch-second range `[start_date 00:00, end_date + 1 day 00:00)`
pub fn day_range_seconds(start_date: NaiveDate, end_date: NaiveDate) -> (i64, i64) {
    let start = start_date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    let end = end_date
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp());
    (start.unwrap_or(i64::MIN), end.unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_floors_milliseconds() {
        assert_eq!(truncate_millis_to_seconds(1_700_000_000_000), 1_700_000_000);
        assert_eq!(truncate_millis_to_seconds(1_700_000_000_999), 1_700_000_000);
        assert_eq!(truncate_millis_to_seconds(-1), -1);
        assert_eq!(truncate_millis_to_seconds(0), 0);
    }

    #[test]
    fn test_canonical_timestamp_matches_for_same_second() {
        let a = canonical_timestamp(1_700_000_000_001).unwrap();
        let b = canonical_timestamp(1_700_000_000_900).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_canonical_timestamp_out_of_range() {
        assert!(canonical_timestamp(i64::MAX).is_none());
    }

    #[test]
    fn test_window_start() {
        let now = DateTime::from_timestamp(1_700_086_400, 0).unwrap();
        assert_eq!(
            window_start(now, Duration::from_secs(86_400)),
            1_700_000_000
        );
    }

    #[test]
    fn test_day_range_covers_whole_days() {
        let start = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        let (from, to) = day_range_seconds(start, end);
        assert_eq!(from, 1_699_920_000);
        assert_eq!(to, 1_700_092_800);
    }
}
