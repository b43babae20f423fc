//! Gaussian-process regression over joint `(time, x, y)` space.
//!
//! Three targets are modeled (direction sine, direction cosine, scaled speed)
//! with a shared squared-exponential kernel. The kernel matrix depends only on
//! the sample positions, so it is factorized once and each target only needs
//! its own mean and variance.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rayon::prelude::*;
use wind_common::{CircularComponents, GridSpec, WindField};

use super::{check_finite, InterpolationInput, InterpolationStrategy, StrategyKind};
use crate::config::InterpolationConfig;
use crate::error::{FusionError, Result};

const MIN_POINTS: usize = 3;
const MIN_TARGET_VARIANCE: f64 = 1e-4;
const JITTER: f64 = 1e-8;

/// Squared-exponential correlation between two feature vectors.
fn correlation(a: &[f64; 3], b: &[f64; 3], length: &[f64; 3]) -> f64 {
    let r2: f64 = (0..3)
        .map(|k| {
            let d = (a[k] - b[k]) / length[k];
            d * d
        })
        .sum();
    (-0.5 * r2).exp()
}

/// Per-target statistics for a fitted process.
#[derive(Debug, Clone)]
struct Target {
    mean: f64,
    variance: f64,
    alpha: DVector<f64>,
}

/// A factorized correlation matrix shared by several targets.
#[derive(Debug, Clone)]
pub struct SharedKernelProcess {
    features: Vec<[f64; 3]>,
    length: [f64; 3],
    chol: Cholesky<f64, Dyn>,
    targets: Vec<Target>,
}

/// Predictive mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub mean: f64,
    pub std: f64,
    /// Standard deviation far away from every sample
    pub prior_std: f64,
}

impl SharedKernelProcess {
    /// Fit one process per target column.
    pub fn fit(
        features: Vec<[f64; 3]>,
        targets: &[Vec<f64>],
        length: [f64; 3],
        noise_ratio: f64,
    ) -> Result<Self> {
        let n = features.len();
        if n == 0 {
            return Err(FusionError::insufficient(1, 0));
        }

        let nugget = noise_ratio + JITTER;
        let k = DMatrix::from_fn(n, n, |i, j| {
            let c = correlation(&features[i], &features[j], &length);
            if i == j {
                c + nugget
            } else {
                c
            }
        });
        let chol = Cholesky::new(k)
            .ok_or_else(|| FusionError::degenerate("correlation matrix is not positive definite"))?;

        let targets = targets
            .iter()
            .map(|values| {
                let mean = values.iter().sum::<f64>() / n as f64;
                let variance = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64)
                    .max(MIN_TARGET_VARIANCE);
                let centered = DVector::from_iterator(n, values.iter().map(|v| v - mean));
                let alpha = chol.solve(&centered);
                Target {
                    mean,
                    variance,
                    alpha,
                }
            })
            .collect();

        Ok(Self {
            features,
            length,
            chol,
            targets,
        })
    }

    /// Predict every target at `x`.
    pub fn predict(&self, x: &[f64; 3]) -> Vec<Prediction> {
        let n = self.features.len();
        let k_star = DVector::from_iterator(
            n,
            self.features.iter().map(|f| correlation(f, x, &self.length)),
        );
        // fraction of prior variance explained by the samples
        let explained = self
            .chol
            .l_dirty()
            .solve_lower_triangular(&k_star)
            .map(|v| v.norm_squared())
            .unwrap_or(0.0);
        let remaining = (1.0 - explained).clamp(0.0, 1.0);

        self.targets
            .iter()
            .map(|t| Prediction {
                mean: t.mean + k_star.dot(&t.alpha),
                std: (t.variance * remaining).sqrt(),
                prior_std: t.variance.sqrt(),
            })
            .collect()
    }
}

/// Primary strategy: GP regression on direction components and speed.
#[derive(Debug, Clone)]
pub struct JointRegression {
    config: InterpolationConfig,
}

impl JointRegression {
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config }
    }

    fn length_scales(&self) -> [f64; 3] {
        [
            self.config.temporal_length_scale,
            self.config.spatial_length_scale,
            self.config.spatial_length_scale,
        ]
    }

    /// Confidence from normalized predictive uncertainty.
    fn confidence(&self, sin: &Prediction, cos: &Prediction, speed: &Prediction) -> f64 {
        let dir_std = sin.std.hypot(cos.std);
        let dir_prior = sin.prior_std.hypot(cos.prior_std);
        let dir_norm = if dir_prior > 0.0 { dir_std / dir_prior } else { 1.0 };
        let speed_norm = if speed.prior_std > 0.0 {
            speed.std / speed.prior_std
        } else {
            1.0
        };
        let penalty = self.config.direction_uncertainty_weight * dir_norm.min(1.0)
            + self.config.speed_uncertainty_weight * speed_norm.min(1.0);
        (1.0 - penalty).clamp(0.0, 1.0)
    }
}

impl InterpolationStrategy for JointRegression {
    fn kind(&self) -> StrategyKind {
        StrategyKind::JointRegression
    }

    fn interpolate(
        &self,
        input: &InterpolationInput<'_>,
        grid: &GridSpec,
    ) -> Result<Option<WindField>> {
        let batch = input.batch;
        if batch.len() < MIN_POINTS {
            return Ok(None);
        }

        let features = input.sample_features(&self.config);
        let mut sins = Vec::with_capacity(batch.len());
        let mut coss = Vec::with_capacity(batch.len());
        let mut speeds = Vec::with_capacity(batch.len());
        for p in &batch.points {
            let c = CircularComponents::from_degrees(p.wind_direction);
            sins.push(c.sin);
            coss.push(c.cos);
            speeds.push(batch.bounds.speed_to_unit(p.wind_speed));
        }

        let process = SharedKernelProcess::fit(
            features,
            &[sins, coss, speeds],
            self.length_scales(),
            self.config.noise_ratio,
        )?;

        let cells: Vec<(f64, f64, f64)> = input
            .grid_features(grid)
            .par_iter()
            .map(|x| {
                let preds = process.predict(x);
                let (sin, cos, speed) = (&preds[0], &preds[1], &preds[2]);
                let direction = CircularComponents::new(sin.mean, cos.mean).to_degrees();
                let speed_mps = batch.bounds.speed_from_unit(speed.mean).max(0.0);
                (direction, speed_mps, self.confidence(sin, cos, speed))
            })
            .collect();

        let direction: Vec<f64> = cells.iter().map(|c| c.0).collect();
        let speed: Vec<f64> = cells.iter().map(|c| c.1).collect();
        let confidence: Vec<f64> = cells.iter().map(|c| c.2).collect();
        check_finite("direction", &direction)?;
        check_finite("speed", &speed)?;
        check_finite("confidence", &confidence)?;

        Ok(Some(WindField::from_cells(
            grid,
            input.target_time,
            direction,
            speed,
            confidence,
        )))
    }
}
