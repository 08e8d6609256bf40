//! Wall-clock helpers.
//!
//! Change-history timestamps are stored as RFC3339 strings (UTC, second
//! precision) so that any consumer can parse them without this crate.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::MktError;

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as an RFC3339 string, e.g. `2024-01-02T03:04:05Z`.
pub fn now_rfc3339() -> String {
    format_rfc3339(Utc::now())
}

pub fn format_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp (any offset) into UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, MktError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MktError::Parse(format!("invalid RFC3339 timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_second_precision_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_rfc3339(ts), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn parse_accepts_offsets() {
        let ts = parse_rfc3339("2024-01-02T05:04:05+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_rfc3339("yesterday"), Err(MktError::Parse(_))));
    }

    #[test]
    fn now_round_trips() {
        let parsed = parse_rfc3339(&now_rfc3339()).unwrap();
        assert!((parsed.timestamp_millis() - now_ms()).abs() < 5_000);
    }
}
