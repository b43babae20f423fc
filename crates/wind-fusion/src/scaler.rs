//! Coordinate normalization for interpolation.
//!
//! Observations from one or two slow-moving sensors tend to be nearly
//! collinear or exactly duplicated, which makes kernel systems singular. The
//! scaler pads tiny spans, maps positions and speeds into `[0, 1]` and adds a
//! small jitter drawn from a fixed-seed generator so the same batch always
//! produces the same scaled coordinates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wind_common::{BoundingBox, WindObservation};

use crate::config::ScalerConfig;

/// Linear maps between geographic/speed space and the unit square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    /// Padded geographic extent of the batch
    pub bbox: BoundingBox,
    pub speed_min: f64,
    pub speed_span: f64,
}

impl ScaleBounds {
    /// Map a position into scaled `(x, y)`; x follows longitude, y latitude.
    pub fn to_unit(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            (lon - self.bbox.min_lon) / self.bbox.width(),
            (lat - self.bbox.min_lat) / self.bbox.height(),
        )
    }

    pub fn speed_to_unit(&self, speed: f64) -> f64 {
        (speed - self.speed_min) / self.speed_span
    }

    pub fn speed_from_unit(&self, unit: f64) -> f64 {
        unit * self.speed_span + self.speed_min
    }
}

/// A batch of observations whose `latitude`/`longitude` hold scaled `y`/`x`.
#[derive(Debug, Clone)]
pub struct ScaledBatch {
    pub points: Vec<WindObservation>,
    /// Original `(lat, lon)` per point
    originals: Vec<(f64, f64)>,
    /// Jitter `(dx, dy)` added to each point
    pub jitter: Vec<(f64, f64)>,
    pub bounds: ScaleBounds,
}

impl ScaledBatch {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Scaled `(x, y)` of point `i`, jitter included.
    pub fn xy(&self, i: usize) -> (f64, f64) {
        let p = &self.points[i];
        (p.longitude, p.latitude)
    }

    /// Write the original coordinates back and hand the observations out.
    pub fn restore_coordinates(self) -> Vec<WindObservation> {
        self.points
            .into_iter()
            .zip(self.originals)
            .map(|(mut obs, (lat, lon))| {
                obs.latitude = lat;
                obs.longitude = lon;
                obs
            })
            .collect()
    }
}

/// Normalizes point coordinates ahead of interpolation.
#[derive(Debug, Clone)]
pub struct CoordinateScaler {
    config: ScalerConfig,
}

impl CoordinateScaler {
    pub fn new(config: ScalerConfig) -> Self {
        Self { config }
    }

    /// Bounds of a set of observations with tiny spans padded.
    ///
    /// An empty set is centered on `fallback`.
    pub fn bounds_for(&self, points: &[WindObservation], fallback: &BoundingBox) -> ScaleBounds {
        let bbox = BoundingBox::from_positions(points.iter().map(|p| (p.latitude, p.longitude)))
            .unwrap_or(*fallback)
            .pad_to_min_span(self.config.min_position_span_m);

        let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.wind_speed), hi.max(p.wind_speed))
        });
        let (mut speed_min, mut speed_span) = if points.is_empty() {
            (0.0, 0.0)
        } else {
            (lo, hi - lo)
        };
        if speed_span < self.config.min_speed_span {
            let center = speed_min + speed_span / 2.0;
            speed_min = center - self.config.min_speed_span / 2.0;
            speed_span = self.config.min_speed_span;
        }

        ScaleBounds {
            bbox,
            speed_min,
            speed_span,
        }
    }

    /// Map points into the unit square with reproducible jitter.
    pub fn scale_points(&self, points: &[WindObservation]) -> ScaledBatch {
        let bounds = self.bounds_for(points, &BoundingBox::default());
        let mut rng = StdRng::seed_from_u64(self.config.jitter_seed);
        let amp = self.config.jitter_amplitude;

        let mut scaled = Vec::with_capacity(points.len());
        let mut originals = Vec::with_capacity(points.len());
        let mut jitter = Vec::with_capacity(points.len());

        for p in points {
            let (x, y) = bounds.to_unit(p.latitude, p.longitude);
            let (jx, jy) = if amp > 0.0 {
                (rng.gen_range(-amp..=amp), rng.gen_range(-amp..=amp))
            } else {
                (0.0, 0.0)
            };

            let mut obs = p.clone();
            obs.longitude = x + jx;
            obs.latitude = y + jy;

            scaled.push(obs);
            originals.push((p.latitude, p.longitude));
            jitter.push((jx, jy));
        }

        ScaledBatch {
            points: scaled,
            originals,
            jitter,
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn obs(lat: f64, lon: f64, speed: f64) -> WindObservation {
        WindObservation::new(Utc::now(), lat, lon, 90.0, speed)
    }

    #[test]
    fn test_restore_round_trips_exactly() {
        let points = vec![
            obs(52.123456789, 4.987654321, 3.0),
            obs(52.2, 4.9, 5.0),
            obs(52.15, 5.05, 4.0),
        ];
        let scaler = CoordinateScaler::new(ScalerConfig::default());
        let batch = scaler.scale_points(&points);
        assert!(batch.points.iter().all(|p| p.latitude < 2.0));

        let restored = batch.restore_coordinates();
        for (a, b) in points.iter().zip(&restored) {
            assert_eq!(a.latitude, b.latitude);
            assert_eq!(a.longitude, b.longitude);
            assert_eq!(a.wind_speed, b.wind_speed);
        }
    }

    #[test]
    fn test_scaled_range_and_jitter() {
        let points = vec![obs(10.0, 10.0, 1.0), obs(10.1, 10.2, 2.0)];
        let config = ScalerConfig::default();
        let batch = CoordinateScaler::new(config.clone()).scale_points(&points);

        let (x0, y0) = batch.xy(0);
        let (x1, y1) = batch.xy(1);
        assert!(x0.abs() <= config.jitter_amplitude && y0.abs() <= config.jitter_amplitude);
        assert!((x1 - 1.0).abs() <= config.jitter_amplitude);
        assert!((y1 - 1.0).abs() <= config.jitter_amplitude);
    }

    #[test]
    fn test_jitter_is_reproducible() {
        let points = vec![obs(1.0, 1.0, 1.0); 4];
        let scaler = CoordinateScaler::new(ScalerConfig::default());
        let a = scaler.scale_points(&points);
        let b = scaler.scale_points(&points);
        assert_eq!(a.jitter, b.jitter);
        // duplicates no longer coincide
        assert_ne!(a.xy(0), a.xy(1));
    }

    #[test]
    fn test_duplicate_points_are_padded() {
        let points = vec![obs(45.0, 7.0, 4.0); 3];
        let scaler = CoordinateScaler::new(ScalerConfig::default());
        let bounds = scaler.bounds_for(&points, &BoundingBox::default());

        assert!(bounds.bbox.height() > 0.0 && bounds.bbox.width() > 0.0);
        assert!((bounds.speed_span - 1.0).abs() < 1e-12);
        assert!((bounds.speed_to_unit(4.0) - 0.5).abs() < 1e-12);
        assert!((bounds.speed_from_unit(0.5) - 4.0).abs() < 1e-12);

        let (x, y) = bounds.to_unit(45.0, 7.0);
        assert!((x - 0.5).abs() < 1e-9 && (y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch() {
        let batch = CoordinateScaler::new(ScalerConfig::default()).scale_points(&[]);
        assert!(batch.is_empty());
        assert!(batch.restore_coordinates().is_empty());
    }
}
