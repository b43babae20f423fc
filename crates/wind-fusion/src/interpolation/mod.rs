//! Spatial interpolation with an ordered fallback chain.
//!
//! ```text
//! points + snapshots
//!      │
//!      ▼
//! CoordinateScaler::scale_points
//!      │
//!      ├─► JointRegression      (Gaussian process over time/x/y)
//!      ├─► RadialBasis          (multiquadric RBF, same space)
//!      ├─► SnapshotBlend        (two time-adjacent fields + trend)
//!      ├─► DegenerateFallback   (uniform circular mean)
//!      └─► DummyField           (canonical placeholder, never fails)
//!               │
//!               ▼
//!          WindField
//! ```
//!
//! A strategy is skipped when it returns `Ok(None)` (not applicable) or an
//! error (logged at debug level); the next one is tried.

pub mod fallback;
pub mod rbf;
pub mod regression;
pub mod resample;
pub mod snapshot;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wind_common::time::minutes_between;
use wind_common::{GridSpec, WindField, WindObservation};

use crate::config::{FusionConfig, InterpolationConfig};
use crate::error::{FusionError, Result};
use crate::scaler::{CoordinateScaler, ScaledBatch};
use crate::temporal::Trend;

pub use fallback::{DegenerateFallback, DummyField};
pub use rbf::RadialBasis;
pub use regression::JointRegression;
pub use resample::{resample_field, sample_field_at};
pub use snapshot::SnapshotBlend;

/// Which strategy produced a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    JointRegression,
    RadialBasis,
    SnapshotBlend,
    Degenerate,
    Dummy,
    /// Long-horizon propagation prediction (not part of the chain)
    Propagation,
    /// Previous field reused with a rewritten timestamp
    LastKnown,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JointRegression => "joint_regression",
            Self::RadialBasis => "radial_basis",
            Self::SnapshotBlend => "snapshot_blend",
            Self::Degenerate => "degenerate",
            Self::Dummy => "dummy",
            Self::Propagation => "propagation",
            Self::LastKnown => "last_known",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a strategy may draw on.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationInput<'a> {
    /// Scaled sample points (observations or snapshot cells)
    pub batch: &'a ScaledBatch,
    /// Previous fields in time order
    pub snapshots: &'a [WindField],
    pub target_time: DateTime<Utc>,
    pub trend: Option<Trend>,
}

impl InterpolationInput<'_> {
    /// Joint `(t, x, y)` features of every sample, time in units of
    /// `time_scale_minutes` relative to the target.
    pub fn sample_features(&self, config: &InterpolationConfig) -> Vec<[f64; 3]> {
        (0..self.batch.len())
            .map(|i| {
                let (x, y) = self.batch.xy(i);
                let t = minutes_between(self.target_time, self.batch.points[i].timestamp)
                    / config.time_scale_minutes;
                [t, x, y]
            })
            .collect()
    }

    /// Joint features of every grid cell (at the target time).
    pub fn grid_features(&self, grid: &GridSpec) -> Vec<[f64; 3]> {
        (0..grid.len())
            .map(|idx| {
                let (col, row) = grid.col_row(idx);
                let (lat, lon) = grid.coord(col, row);
                let (x, y) = self.batch.bounds.to_unit(lat, lon);
                [0.0, x, y]
            })
            .collect()
    }

    /// Minutes between the target time and the closest sample.
    pub fn nearest_sample_minutes(&self) -> Option<f64> {
        self.batch
            .points
            .iter()
            .map(|p| minutes_between(p.timestamp, self.target_time).abs())
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// One step of the fallback chain.
pub trait InterpolationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Build a field on `grid`, or `Ok(None)` when not applicable.
    fn interpolate(
        &self,
        input: &InterpolationInput<'_>,
        grid: &GridSpec,
    ) -> Result<Option<WindField>>;
}

/// Result of running the chain.
#[derive(Debug, Clone)]
pub struct InterpolationOutcome {
    pub field: WindField,
    pub strategy: StrategyKind,
    /// The input points with their original coordinates restored.
    pub points: Vec<WindObservation>,
}

/// Confidence that decays linearly with time distance down to `floor`.
pub fn time_decay_confidence(minutes: f64, floor: f64, decay_minutes: f64) -> f64 {
    if minutes <= 0.0 {
        return 1.0;
    }
    (1.0 - (1.0 - floor) * minutes / decay_minutes).clamp(floor, 1.0)
}

/// Reject raw strategy output containing NaN or infinite values.
///
/// Must run before [`WindField::from_cells`], which sanitizes silently.
pub(crate) fn check_finite(what: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(FusionError::interpolation(format!(
            "non-finite {what} at cell {idx}"
        ))),
        None => Ok(()),
    }
}

/// Runs the ordered strategy chain.
pub struct Interpolator {
    scaler: CoordinateScaler,
    strategies: Vec<Box<dyn InterpolationStrategy>>,
    dummy: DummyField,
}

impl Interpolator {
    /// The standard five-stage chain.
    pub fn new(config: &FusionConfig) -> Self {
        let interp = &config.interpolation;
        let strategies: Vec<Box<dyn InterpolationStrategy>> = vec![
            Box::new(JointRegression::new(interp.clone())),
            Box::new(RadialBasis::new(interp.clone())),
            Box::new(SnapshotBlend::new(interp.clone())),
            Box::new(DegenerateFallback::new(interp.degenerate_confidence)),
            Box::new(DummyField::new(interp)),
        ];
        Self::with_strategies(config, strategies)
    }

    /// A custom chain; the dummy field still backs it.
    pub fn with_strategies(
        config: &FusionConfig,
        strategies: Vec<Box<dyn InterpolationStrategy>>,
    ) -> Self {
        Self {
            scaler: CoordinateScaler::new(config.scaler.clone()),
            strategies,
            dummy: DummyField::new(&config.interpolation),
        }
    }

    pub fn scaler(&self) -> &CoordinateScaler {
        &self.scaler
    }

    pub fn dummy(&self) -> &DummyField {
        &self.dummy
    }

    /// Interpolate `points` (plus `snapshots`) onto `grid` at `target_time`.
    pub fn interpolate(
        &self,
        points: &[WindObservation],
        snapshots: &[WindField],
        target_time: DateTime<Utc>,
        grid: &GridSpec,
        trend: Option<Trend>,
    ) -> InterpolationOutcome {
        let batch = self.scaler.scale_points(points);
        let input = InterpolationInput {
            batch: &batch,
            snapshots,
            target_time,
            trend,
        };

        let mut produced = None;
        for strategy in &self.strategies {
            match strategy.interpolate(&input, grid) {
                Ok(Some(field)) => {
                    produced = Some((field, strategy.kind()));
                    break;
                }
                Ok(None) => {
                    debug!(
                        strategy = %strategy.kind(),
                        points = batch.len(),
                        "Strategy not applicable"
                    );
                }
                Err(e) => {
                    debug!(
                        strategy = %strategy.kind(),
                        error = %e,
                        "Strategy failed, falling back"
                    );
                }
            }
        }

        let (field, strategy) = produced
            .unwrap_or_else(|| (self.dummy.build(grid, target_time), StrategyKind::Dummy));

        InterpolationOutcome {
            field,
            strategy,
            points: batch.restore_coordinates(),
        }
    }
}
