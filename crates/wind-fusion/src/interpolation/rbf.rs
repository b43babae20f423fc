//! Multiquadric radial-basis interpolation.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use wind_common::{CircularComponents, GridSpec, WindField};

use super::{
    check_finite, time_decay_confidence, InterpolationInput, InterpolationStrategy, StrategyKind,
};
use crate::config::InterpolationConfig;
use crate::error::{FusionError, Result};

const MIN_POINTS: usize = 3;
const MIN_EPSILON: f64 = 1e-3;

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|k| (a[k] - b[k]).powi(2)).sum::<f64>().sqrt()
}

/// Multiquadric interpolant `f(x) = mean + Σ w_i * sqrt((r_i / ε)² + 1)`.
#[derive(Debug, Clone)]
pub struct Multiquadric {
    centers: Vec<[f64; 3]>,
    epsilon: f64,
    /// `(mean, weights)` per target
    targets: Vec<(f64, DVector<f64>)>,
}

impl Multiquadric {
    fn kernel(&self, r: f64) -> f64 {
        ((r / self.epsilon).powi(2) + 1.0).sqrt()
    }

    /// Shape parameter: mean nearest-neighbor distance between centers.
    fn shape_parameter(centers: &[[f64; 3]]) -> f64 {
        let n = centers.len();
        if n < 2 {
            return 1.0;
        }
        let total: f64 = centers
            .iter()
            .enumerate()
            .map(|(i, a)| {
                centers
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, b)| distance(a, b))
                    .fold(f64::INFINITY, f64::min)
            })
            .sum();
        (total / n as f64).max(MIN_EPSILON)
    }

    /// Solve for the weights of every target with one LU factorization.
    pub fn fit(centers: Vec<[f64; 3]>, targets: &[Vec<f64>]) -> Result<Self> {
        let n = centers.len();
        if n == 0 {
            return Err(FusionError::insufficient(1, 0));
        }

        let mut model = Self {
            epsilon: Self::shape_parameter(&centers),
            centers,
            targets: Vec::with_capacity(targets.len()),
        };

        let phi = DMatrix::from_fn(n, n, |i, j| {
            model.kernel(distance(&model.centers[i], &model.centers[j]))
        });
        let lu = phi.lu();

        for values in targets {
            let mean = values.iter().sum::<f64>() / n as f64;
            let rhs = DVector::from_iterator(n, values.iter().map(|v| v - mean));
            let weights = lu
                .solve(&rhs)
                .ok_or_else(|| FusionError::degenerate("singular radial-basis system"))?;
            if weights.iter().any(|w| !w.is_finite()) {
                return Err(FusionError::degenerate("radial-basis weights are not finite"));
            }
            model.targets.push((mean, weights));
        }

        Ok(model)
    }

    /// Evaluate every target at `x`.
    pub fn evaluate(&self, x: &[f64; 3]) -> Vec<f64> {
        let phi: Vec<f64> = self.centers.iter().map(|c| self.kernel(distance(c, x))).collect();
        self.targets
            .iter()
            .map(|(mean, w)| mean + w.iter().zip(&phi).map(|(a, b)| a * b).sum::<f64>())
            .collect()
    }
}

/// Second strategy: RBF interpolation in the regression's joint space.
#[derive(Debug, Clone)]
pub struct RadialBasis {
    config: InterpolationConfig,
}

impl RadialBasis {
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config }
    }
}

impl InterpolationStrategy for RadialBasis {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RadialBasis
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

        let mut sins = Vec::with_capacity(batch.len());
        let mut coss = Vec::with_capacity(batch.len());
        let mut speeds = Vec::with_capacity(batch.len());
        for p in &batch.points {
            let c = CircularComponents::from_degrees(p.wind_direction);
            sins.push(c.sin);
            coss.push(c.cos);
            speeds.push(batch.bounds.speed_to_unit(p.wind_speed));
        }

        let model = Multiquadric::fit(input.sample_features(&self.config), &[sins, coss, speeds])?;

        let cells: Vec<(f64, f64)> = input
            .grid_features(grid)
            .par_iter()
            .map(|x| {
                let v = model.evaluate(x);
                (
                    CircularComponents::new(v[0], v[1]).to_degrees(),
                    batch.bounds.speed_from_unit(v[2]).max(0.0),
                )
            })
            .collect();

        let direction: Vec<f64> = cells.iter().map(|c| c.0).collect();
        let speed: Vec<f64> = cells.iter().map(|c| c.1).collect();
        check_finite("direction", &direction)?;
        check_finite("speed", &speed)?;

        let minutes = input.nearest_sample_minutes().unwrap_or(f64::INFINITY);
        let confidence = time_decay_confidence(
            minutes,
            self.config.rbf_confidence_floor,
            self.config.confidence_decay_minutes,
        );

        Ok(Some(WindField::from_cells(
            grid,
            input.target_time,
            direction,
            speed,
            vec![confidence; grid.len()],
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalerConfig;
    use crate::scaler::CoordinateScaler;
    use chrono::{Duration, Utc};
    use wind_common::{BoundingBox, WindObservation};

    #[test]
    fn test_multiquadric_passes_through_centers() {
        let centers = vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        let values = vec![2.0, -1.0, 0.5, 3.0];
        let model = Multiquadric::fit(centers.clone(), &[values.clone()]).unwrap();
        for (c, v) in centers.iter().zip(&values) {
            assert!((model.evaluate(c)[0] - v).abs() < 1e-8);
        }
    }

    #[test]
    fn test_duplicate_centers_are_degenerate() {
        let centers = vec![[0.0, 0.5, 0.5]; 3];
        let err = Multiquadric::fit(centers, &[vec![1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, FusionError::NumericalDegeneracy(_)));
    }

    #[test]
    fn test_confidence_decays_with_sample_age() {
        let t0 = Utc::now();
        let points: Vec<WindObservation> = (0..4)
            .map(|i| {
                WindObservation::new(
                    t0 + Duration::minutes(i),
                    10.0 + 0.003 * i as f64,
                    20.0 + 0.002 * (i % 2) as f64,
                    200.0,
                    4.0,
                )
            })
            .collect();
        let batch = CoordinateScaler::new(ScalerConfig::default()).scale_points(&points);
        let grid = GridSpec::square(BoundingBox::new(19.999, 9.999, 20.003, 10.01), 4);
        let strategy = RadialBasis::new(InterpolationConfig::default());

        let at = |target| {
            let input = InterpolationInput {
                batch: &batch,
                snapshots: &[],
                target_time: target,
                trend: None,
            };
            strategy.interpolate(&input, &grid).unwrap().unwrap()
        };

        let fresh = at(t0 + Duration::minutes(3));
        assert!((fresh.confidence[0] - 1.0).abs() < 1e-12);
        assert!(fresh.wind_direction.iter().all(|d| (d - 200.0).abs() < 1e-6));

        let stale = at(t0 + Duration::minutes(63));
        assert!((stale.confidence[0] - 0.4).abs() < 1e-12);
    }
}
