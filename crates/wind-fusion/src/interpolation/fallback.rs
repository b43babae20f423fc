//! Last-resort strategies: a uniform mean field and the dummy field.

use chrono::{DateTime, Utc};
use wind_common::{circular_mean, GridSpec, WindField};

use super::{InterpolationInput, InterpolationStrategy, StrategyKind};
use crate::config::InterpolationConfig;
use crate::error::Result;

/// Uniform field from the weighted circular mean of all points.
#[derive(Debug, Clone)]
pub struct DegenerateFallback {
    confidence: f64,
}

impl DegenerateFallback {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }
}

impl InterpolationStrategy for DegenerateFallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Degenerate
    }

    fn interpolate(
        &self,
        input: &InterpolationInput<'_>,
        grid: &GridSpec,
    ) -> Result<Option<WindField>> {
        let points = &input.batch.points;
        if points.is_empty() {
            return Ok(None);
        }

        let directions: Vec<f64> = points.iter().map(|p| p.wind_direction).collect();
        let weights: Vec<f64> = points.iter().map(|p| p.weight()).collect();

        // perfectly opposed readings cancel; keep the most trusted one
        let direction = circular_mean(&directions, &weights)
            .or_else(|| {
                points
                    .iter()
                    .max_by(|a, b| a.weight().total_cmp(&b.weight()))
                    .map(|p| p.wind_direction)
            })
            .unwrap_or(0.0);

        let total_weight: f64 = weights.iter().sum();
        let speed = if total_weight > 0.0 {
            points.iter().map(|p| p.wind_speed * p.weight()).sum::<f64>() / total_weight
        } else {
            points.iter().map(|p| p.wind_speed).sum::<f64>() / points.len() as f64
        };

        Ok(Some(WindField::uniform(
            grid,
            input.target_time,
            direction,
            speed,
            self.confidence,
        )))
    }
}

/// Canonical placeholder field, flagged as dummy.
#[derive(Debug, Clone)]
pub struct DummyField {
    direction: f64,
    speed: f64,
    confidence: f64,
}

impl DummyField {
    pub fn new(config: &InterpolationConfig) -> Self {
        Self {
            direction: config.dummy_direction,
            speed: config.dummy_speed,
            confidence: config.dummy_confidence,
        }
    }

    pub fn build(&self, grid: &GridSpec, time: DateTime<Utc>) -> WindField {
        WindField::uniform(grid, time, self.direction, self.speed, self.confidence).mark_dummy()
    }
}

impl InterpolationStrategy for DummyField {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dummy
    }

    fn interpolate(
        &self,
        input: &InterpolationInput<'_>,
        grid: &GridSpec,
    ) -> Result<Option<WindField>> {
        Ok(Some(self.build(grid, input.target_time)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalerConfig;
    use crate::scaler::CoordinateScaler;
    use wind_common::{BoundingBox, WindObservation};

    fn run(strategy: &dyn InterpolationStrategy, points: &[WindObservation]) -> Option<WindField> {
        let batch = CoordinateScaler::new(ScalerConfig::default()).scale_points(points);
        let input = InterpolationInput {
            batch: &batch,
            snapshots: &[],
            target_time: Utc::now(),
            trend: None,
        };
        strategy
            .interpolate(&input, &GridSpec::square(BoundingBox::default(), 4))
            .unwrap()
    }

    #[test]
    fn test_degenerate_weighted_mean() {
        let now = Utc::now();
        let points = vec![
            WindObservation::new(now, 1.0, 1.0, 350.0, 2.0).with_confidence(1.0),
            WindObservation::new(now, 1.0, 1.0, 20.0, 6.0).with_confidence(0.5),
        ];
        let field = run(&DegenerateFallback::new(0.4), &points).unwrap();
        let (d, s, c) = field.center_values().unwrap();
        // pulled toward the heavier 350 reading, across north
        assert!(d > 350.0 || d < 5.0, "direction {d}");
        assert!((s - (2.0 + 3.0) / 1.5).abs() < 1e-9);
        assert_eq!(c, 0.4);
        assert!(!field.is_dummy);
    }

    #[test]
    fn test_degenerate_opposed_directions() {
        let now = Utc::now();
        let points = vec![
            WindObservation::new(now, 1.0, 1.0, 90.0, 3.0).with_confidence(0.9),
            WindObservation::new(now, 1.0, 1.0, 270.0, 3.0).with_confidence(0.9),
        ];
        let field = run(&DegenerateFallback::new(0.4), &points).unwrap();
        assert!(field.wind_direction.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn test_degenerate_skips_empty() {
        assert!(run(&DegenerateFallback::new(0.4), &[]).is_none());
    }

    #[test]
    fn test_dummy_values() {
        let field = run(&DummyField::new(&InterpolationConfig::default()), &[]).unwrap();
        assert!(field.is_dummy);
        assert_eq!(field.shape(), (4, 4));
        assert!(field.wind_direction.iter().all(|&d| d == 225.0));
        assert!(field.wind_speed.iter().all(|&s| s == 5.0));
        assert!(field.confidence.iter().all(|&c| c == 0.3));
    }
}
