//! Time handling utilities for observations.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::ObservationError;

/// Parse an observation timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T12:00:00Z`), naive ISO 8601 without a zone
/// (assumed UTC, optional fractional seconds or a space separator), and Unix
/// epoch seconds (`1705320000` or `1705320000.5`).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ObservationError> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Epoch seconds
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            if let Some(dt) = DateTime::from_timestamp(whole as i64, nanos.min(999_999_999)) {
                return Ok(dt);
            }
        }
    }

    Err(ObservationError::InvalidTimestamp(s.to_string()))
}

/// Signed minutes from `from` to `to`.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Signed seconds from `from` to `to`.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_with_offset() {
        let dt = parse_timestamp("2024-01-15T14:00:00+02:00").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_naive() {
        let dt = parse_timestamp("2024-01-15 12:30:15.250").unwrap();
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_epoch() {
        let dt = parse_timestamp("1705320000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday at noon"),
            Err(ObservationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_minutes_between() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(minutes_between(t0, t0 + Duration::seconds(90)), 1.5);
        assert_eq!(minutes_between(t0 + Duration::minutes(2), t0), -2.0);
    }
}
