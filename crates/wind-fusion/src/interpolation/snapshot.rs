//! Time-weighted blend of two stored fields.

use chrono::{DateTime, Utc};
use wind_common::time::minutes_between;
use wind_common::{CircularComponents, GridSpec, WindField};

use super::{
    resample_field, time_decay_confidence, InterpolationInput, InterpolationStrategy, StrategyKind,
};
use crate::config::InterpolationConfig;
use crate::error::Result;

/// Third strategy: blend the two snapshots nearest the target time.
#[derive(Debug, Clone)]
pub struct SnapshotBlend {
    config: InterpolationConfig,
}

impl SnapshotBlend {
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config }
    }
}

/// Indices of the two time-adjacent snapshots bracketing `target`, or the
/// nearest pair at either end. `snapshots` must be time ordered.
fn bracketing_pair(snapshots: &[WindField], target: DateTime<Utc>) -> (usize, usize) {
    let n = snapshots.len();
    match snapshots.iter().position(|s| s.time > target) {
        Some(0) => (0, 1),
        Some(i) => (i - 1, i),
        None => (n - 2, n - 1),
    }
}

impl InterpolationStrategy for SnapshotBlend {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SnapshotBlend
    }

    fn interpolate(
        &self,
        input: &InterpolationInput<'_>,
        grid: &GridSpec,
    ) -> Result<Option<WindField>> {
        if input.snapshots.len() < 2 {
            return Ok(None);
        }

        let (i0, i1) = bracketing_pair(input.snapshots, input.target_time);
        let early = resample_field(&input.snapshots[i0], grid);
        let late = resample_field(&input.snapshots[i1], grid);

        let span = minutes_between(early.time, late.time);
        let elapsed = minutes_between(early.time, input.target_time);
        let alpha = if span > 0.0 {
            (elapsed / span).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let dt = minutes_between(early.time, input.target_time)
            .abs()
            .min(minutes_between(late.time, input.target_time).abs());
        let decay = time_decay_confidence(
            dt,
            self.config.snapshot_confidence_floor,
            self.config.confidence_decay_minutes,
        );

        let (dir_shift, speed_shift) = match input.trend {
            Some(trend) => (
                trend.direction_rate * elapsed.max(0.0),
                trend.speed_rate * elapsed.max(0.0),
            ),
            None => (0.0, 0.0),
        };

        let n = grid.len();
        let mut direction = Vec::with_capacity(n);
        let mut speed = Vec::with_capacity(n);
        let mut confidence = Vec::with_capacity(n);
        for idx in 0..n {
            let blended = CircularComponents::from_degrees(early.wind_direction[idx])
                .lerp(CircularComponents::from_degrees(late.wind_direction[idx]), alpha);
            direction.push(blended.to_degrees() + dir_shift);
            speed.push(
                (early.wind_speed[idx] * (1.0 - alpha) + late.wind_speed[idx] * alpha + speed_shift)
                    .max(0.0),
            );
            confidence.push(
                (early.confidence[idx] * (1.0 - alpha) + late.confidence[idx] * alpha) * decay,
            );
        }

        Ok(Some(WindField::from_cells(
            grid,
            input.target_time,
            direction,
            speed,
            confidence,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalerConfig;
    use crate::scaler::CoordinateScaler;
    use crate::temporal::Trend;
    use chrono::Duration;
    use wind_common::BoundingBox;

    fn t(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn grid() -> GridSpec {
        GridSpec::square(BoundingBox::new(0.0, 0.0, 0.01, 0.01), 3)
    }

    fn run(
        snapshots: &[WindField],
        target: DateTime<Utc>,
        trend: Option<Trend>,
    ) -> Option<WindField> {
        let batch = CoordinateScaler::new(ScalerConfig::default()).scale_points(&[]);
        let input = InterpolationInput {
            batch: &batch,
            snapshots,
            target_time: target,
            trend,
        };
        SnapshotBlend::new(InterpolationConfig::default())
            .interpolate(&input, &grid())
            .unwrap()
    }

    #[test]
    fn test_needs_two_snapshots() {
        let one = vec![WindField::uniform(&grid(), t(0), 10.0, 2.0, 1.0)];
        assert!(run(&one, t(1), None).is_none());
    }

    #[test]
    fn test_midpoint_blend() {
        let snaps = vec![
            WindField::uniform(&grid(), t(0), 350.0, 2.0, 1.0),
            WindField::uniform(&grid(), t(10), 30.0, 4.0, 1.0),
        ];
        let field = run(&snaps, t(5), None).unwrap();
        let (d, s, c) = field.get(1, 1).unwrap();
        assert!((d - 10.0).abs() < 1e-6);
        assert!((s - 3.0).abs() < 1e-9);
        // five minutes from either snapshot
        assert!((c - (1.0 - 0.5 * 5.0 / 30.0)).abs() < 1e-9);
    }

    #[test]
    fn test_picks_bracketing_pair() {
        let snaps: Vec<WindField> = (0..4)
            .map(|i| WindField::uniform(&grid(), t(i * 10), 90.0, i as f64, 1.0))
            .collect();
        assert_eq!(bracketing_pair(&snaps, t(15)), (1, 2));
        assert_eq!(bracketing_pair(&snaps, t(-5)), (0, 1));
        assert_eq!(bracketing_pair(&snaps, t(45)), (2, 3));
        assert_eq!(bracketing_pair(&snaps, t(20)), (2, 3));

        let field = run(&snaps, t(15), None).unwrap();
        assert!((field.wind_speed[0] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_trend_extrapolates_past_latest() {
        let snaps = vec![
            WindField::uniform(&grid(), t(0), 100.0, 5.0, 0.8),
            WindField::uniform(&grid(), t(10), 100.0, 5.0, 0.8),
        ];
        let trend = Trend {
            direction_rate: 1.0,
            speed_rate: -0.1,
        };
        let field = run(&snaps, t(12), Some(trend)).unwrap();
        let (d, s, c) = field.center_values().unwrap();
        assert!((d - 112.0).abs() < 1e-6);
        assert!((s - 3.8).abs() < 1e-9);
        assert!(c < 0.8);

        // speed never drops below zero
        let steep = Trend {
            direction_rate: 0.0,
            speed_rate: -10.0,
        };
        let field = run(&snaps, t(20), Some(steep)).unwrap();
        assert!(field.wind_speed.iter().all(|&s| s == 0.0));
    }
}
