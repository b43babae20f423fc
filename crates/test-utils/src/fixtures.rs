//! Common test fixtures for wind-fusion tests.
//!
//! This module provides pre-defined areas, times and sensor identifiers that
//! represent common scenarios in wind observation processing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use wind_common::BoundingBox;

/// Common bounding box definitions for testing, as
/// `(min_lon, min_lat, max_lon, max_lat)`.
pub mod bbox {
    /// A ~2 km square sailing area off the Dutch coast
    pub const HARBOR: (f64, f64, f64, f64) = (4.10, 52.00, 4.13, 52.018);

    /// A ~20 km square regatta course
    pub const BAY: (f64, f64, f64, f64) = (-122.50, 37.70, -122.27, 37.88);

    /// Straddles the equator and the prime meridian
    pub const ORIGIN: (f64, f64, f64, f64) = (-0.01, -0.01, 0.01, 0.01);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);
}

/// Build a [`BoundingBox`] from one of the [`bbox`] tuples.
pub fn bounding_box(extent: (f64, f64, f64, f64)) -> BoundingBox {
    BoundingBox::new(extent.0, extent.1, extent.2, extent.3)
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests
    pub const REFERENCE_TIME: &str = "2024-01-15T12:00:00Z";

    /// Typical sensor reporting interval in seconds
    pub const REPORT_INTERVAL_SECS: i64 = 30;
}

/// The reference time as a `DateTime`.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

/// Reference time shifted by `minutes`.
pub fn minutes_after_reference(minutes: i64) -> DateTime<Utc> {
    reference_time() + Duration::minutes(minutes)
}

/// Common sensor identifiers.
pub mod sources {
    pub const BUOY: &str = "buoy-7";
    pub const DRIFTER_A: &str = "drifter-a";
    pub const DRIFTER_B: &str = "drifter-b";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_time_matches_string() {
        let parsed = DateTime::parse_from_rfc3339(time::REFERENCE_TIME)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, reference_time());
    }

    #[test]
    fn test_bounding_boxes_are_ordered() {
        for extent in [bbox::HARBOR, bbox::BAY, bbox::ORIGIN] {
            let b = bounding_box(extent);
            assert!(b.width() > 0.0 && b.height() > 0.0);
        }
    }
}
