//! Synthetic observation generators.
//!
//! These generators create predictable, verifiable observation patterns
//! that can be used across the test suite.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wind_common::geo::destination_point;
use wind_common::observation::RawTimestamp;
use wind_common::{BoundingBox, RawRecord, SourceSeries, SpeedUnit, WindObservation};

/// A sensor drifting in a straight line.
#[derive(Debug, Clone)]
pub struct DriftingSensor {
    pub source_id: String,
    pub start: DateTime<Utc>,
    /// Starting `(lat, lon)`
    pub origin: (f64, f64),
    /// Bearing the sensor moves toward, degrees
    pub heading: f64,
    /// Ground speed in m/s
    pub ground_speed: f64,
    /// Reported wind direction, degrees
    pub wind_direction: f64,
    /// Reported wind speed in m/s
    pub wind_speed: f64,
    pub interval_secs: i64,
}

impl DriftingSensor {
    /// A sensor carried along the wind at `fraction` of its speed.
    pub fn carried_by_wind(
        source_id: &str,
        start: DateTime<Utc>,
        origin: (f64, f64),
        wind_direction: f64,
        wind_speed: f64,
        fraction: f64,
    ) -> Self {
        Self {
            source_id: source_id.to_string(),
            start,
            origin,
            heading: wind_direction,
            ground_speed: wind_speed * fraction,
            wind_direction,
            wind_speed,
            interval_secs: 30,
        }
    }

    /// Generate `n` readings, one every `interval_secs`.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::{reference_time, DriftingSensor};
    ///
    /// let sensor =
    ///     DriftingSensor::carried_by_wind("a", reference_time(), (50.0, 1.0), 90.0, 5.0, 0.6);
    /// let track = sensor.observations(4);
    /// assert_eq!(track.len(), 4);
    /// assert!(track[3].longitude > track[0].longitude);
    /// ```
    pub fn observations(&self, n: usize) -> Vec<WindObservation> {
        (0..n)
            .map(|i| {
                let elapsed = i as f64 * self.interval_secs as f64;
                let (lat, lon) = destination_point(
                    self.origin.0,
                    self.origin.1,
                    self.heading,
                    self.ground_speed * elapsed,
                );
                WindObservation::new(
                    self.start + Duration::seconds(i as i64 * self.interval_secs),
                    lat,
                    lon,
                    self.wind_direction,
                    self.wind_speed,
                )
                .with_source(self.source_id.clone())
            })
            .collect()
    }
}

/// Readings scattered uniformly over `bbox` with noisy direction and speed.
///
/// The same `seed` always yields the same observations.
pub fn scattered_observations(
    seed: u64,
    n: usize,
    bbox: &BoundingBox,
    start: DateTime<Utc>,
    wind_direction: f64,
    wind_speed: f64,
) -> Vec<WindObservation> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let lat = rng.gen_range(bbox.min_lat..=bbox.max_lat);
            let lon = rng.gen_range(bbox.min_lon..=bbox.max_lon);
            let dir = wind_direction + rng.gen_range(-10.0..=10.0);
            let speed = (wind_speed + rng.gen_range(-0.5..=0.5)).max(0.0);
            WindObservation::new(start + Duration::seconds(i as i64 * 10), lat, lon, dir, speed)
                .with_confidence(rng.gen_range(0.6..=1.0))
        })
        .collect()
}

/// Raw record equivalent to an observation, speed expressed in `unit`.
pub fn raw_record(obs: &WindObservation, unit: SpeedUnit) -> RawRecord {
    RawRecord {
        timestamp: Some(RawTimestamp::Parsed(obs.timestamp)),
        latitude: Some(obs.latitude),
        longitude: Some(obs.longitude),
        wind_direction: Some(obs.wind_direction),
        wind_speed: Some(obs.wind_speed / unit.to_mps_factor()),
        confidence: obs.confidence,
    }
}

/// Wrap observations into a source series reported in `unit`.
pub fn source_series(
    source_id: &str,
    unit: SpeedUnit,
    observations: &[WindObservation],
) -> SourceSeries {
    let mut series = SourceSeries::new(source_id, unit.as_str());
    for obs in observations {
        series.push(raw_record(obs, unit));
    }
    series
}

/// `sources` drifting sensors with `points` readings each, spread across
/// `bbox` and reporting in knots.
pub fn drifting_fleet(
    sources: usize,
    points: usize,
    bbox: &BoundingBox,
    start: DateTime<Utc>,
    wind_direction: f64,
    wind_speed: f64,
) -> Vec<SourceSeries> {
    (0..sources)
        .map(|s| {
            let frac = (s as f64 + 0.5) / sources.max(1) as f64;
            let origin = (
                bbox.min_lat + frac * bbox.height(),
                bbox.min_lon + 0.1 * bbox.width(),
            );
            let id = format!("sensor-{s:02}");
            let carried = DriftingSensor::carried_by_wind(
                &id,
                start,
                origin,
                wind_direction,
                wind_speed,
                0.6,
            );
            let sensor = DriftingSensor {
                interval_secs: 5,
                ..carried
            };
            source_series(&id, SpeedUnit::Knots, &sensor.observations(points))
        })
        .collect()
}
