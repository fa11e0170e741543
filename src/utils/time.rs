use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};

/// Cadence at which the runtime checks the live round for expiry.
pub const ROUND_TICK: StdDuration = StdDuration::from_secs(1);

pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| StdDuration::from_secs(0))
        .as_secs()
}

/// Whole seconds left until `close`, never negative.
pub fn seconds_remaining(close: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (close - now).num_seconds().max(0)
}

/// `start + secs`, saturating at chrono's representable maximum.
pub fn add_secs(start: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    Duration::try_seconds(secs)
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Countdown label: `42s`, `4m 10s`, `3h 5m`, `2d 7h`.
pub fn format_countdown(seconds: i64) -> String {
    let s = seconds.max(0);
    if s < 60 {
        format!("{s}s")
    } else if s < 3_600 {
        format!("{}m {}s", s / 60, s % 60)
    } else if s < 86_400 {
        format!("{}h {}m", s / 3_600, (s % 3_600) / 60)
    } else {
        format!("{}d {}h", s / 86_400, (s % 86_400) / 3_600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_seconds_remaining() {
        let close = ts("2024-01-01T12:00:30Z");
        assert_eq!(seconds_remaining(close, ts("2024-01-01T12:00:00Z")), 30);
        assert_eq!(seconds_remaining(close, ts("2024-01-01T12:01:00Z")), 0);
    }

    #[test]
    fn test_add_secs() {
        let start = ts("2024-01-01T12:00:00Z");
        assert_eq!(add_secs(start, 90).to_rfc3339(), "2024-01-01T12:01:30+00:00");
        assert_eq!(add_secs(start, u64::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(-3), "0s");
        assert_eq!(format_countdown(42), "42s");
        assert_eq!(format_countdown(250), "4m 10s");
        assert_eq!(format_countdown(3 * 3_600 + 5 * 60 + 9), "3h 5m");
        assert_eq!(format_countdown(2 * 86_400 + 7 * 3_600), "2d 7h");
    }
}
