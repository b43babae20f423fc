//! Propagation model: how fast and where the wind pattern travels.
//!
//! Sensors drift with the wind, so consecutive readings of one sensor reveal
//! the velocity at which the pattern translates. Pairs are scored against an
//! expected motion (wind direction deflected by a speed-dependent offset,
//! wind speed scaled by a dynamic advection fraction β) and the consistent
//! ones dominate the estimate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wind_common::geo::{destination_point, haversine_distance_m, initial_bearing_deg};
use wind_common::time::seconds_between;
use wind_common::{circular_difference, circular_mean, normalize_degrees, WindObservation};

use crate::config::PropagationConfig;

/// Velocity of the wind pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationVector {
    /// Meters per second
    pub speed: f64,
    /// Bearing in degrees the pattern travels toward
    pub direction: f64,
    pub confidence: f64,
}

impl PropagationVector {
    /// The "no information" vector.
    pub fn unknown(confidence: f64) -> Self {
        Self {
            speed: 0.0,
            direction: 0.0,
            confidence,
        }
    }
}

/// Wind predicted at one position and time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPrediction {
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
    pub wind_direction: f64,
    pub wind_speed: f64,
    pub confidence: f64,
    /// Distance from the upstream source position to the closest sample
    pub nearest_distance_m: f64,
    pub uncertainty: f64,
}

const MAX_UNCERTAINTY: f64 = 0.9;

/// Uncertainty below this is the plain product of the growth factors.
const UNCERTAINTY_KNEE: f64 = 0.6;

/// Uncertainty after carrying a reading `distance_m` and `time_delta_s`.
///
/// `base` is the starting uncertainty in `[0, 1]`. The result lies in
/// `[0, 0.9)` and grows strictly with distance and time.
pub fn uncertainty_growth(distance_m: f64, time_delta_s: f64, base: f64) -> f64 {
    let d = distance_m.max(0.0);
    let distance_factor = if d < 10.0 {
        1.0
    } else if d <= 1000.0 {
        1.0 + d / 1000.0
    } else {
        2.0 + (d - 1000.0) / 500.0
    };

    let t = time_delta_s.max(0.0);
    let time_factor = if t < 60.0 {
        1.0
    } else if t <= 900.0 {
        1.0 + (t - 60.0) / 600.0
    } else {
        1.0 + 840.0 / 600.0 + (t - 900.0) / 300.0
    };

    let base = base.clamp(0.0, 1.0);
    let penalty = 1.0 + (1.0 - (1.0 - base).sqrt());
    let raw = base.max(0.05) * distance_factor * time_factor * penalty;

    if raw <= UNCERTAINTY_KNEE {
        return raw;
    }
    // above the knee, approach the cap without reaching it
    let headroom = MAX_UNCERTAINTY - UNCERTAINTY_KNEE;
    let excess = (raw - UNCERTAINTY_KNEE) / headroom;
    UNCERTAINTY_KNEE + headroom * excess / (1.0 + excess)
}

/// Propagation state owned by the fusion service.
#[derive(Debug, Clone)]
pub struct PropagationModel {
    config: PropagationConfig,
    vector: PropagationVector,
    last_beta: f64,
}

impl PropagationModel {
    pub fn new(config: PropagationConfig) -> Self {
        let vector = PropagationVector::unknown(config.fallback_confidence);
        let last_beta = config.base_beta;
        Self {
            config,
            vector,
            last_beta,
        }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Current propagation vector.
    pub fn vector(&self) -> PropagationVector {
        self.vector
    }

    /// β used by the most recent successful update.
    pub fn last_beta(&self) -> f64 {
        self.last_beta
    }

    /// Deflection multiplier, growing with wind speed up to the cap.
    pub fn offset_multiplier(&self, wind_speed: f64) -> f64 {
        let ratio = (wind_speed / self.config.reference_speed).clamp(0.0, 1.0);
        self.config.max_offset_multiplier * ratio
    }

    /// Advection fraction for a mean wind speed and its variance.
    pub fn dynamic_beta(&self, mean_speed: f64, speed_variance: f64) -> f64 {
        let s = mean_speed;
        let factor = if s < 2.0 {
            0.7
        } else if s < 5.0 {
            0.8
        } else if s <= 15.0 {
            0.8 + 0.4 * (s - 5.0) / 10.0
        } else if s <= 25.0 {
            1.2
        } else {
            1.3
        };

        let mut beta = self.config.base_beta * factor;
        if speed_variance < self.config.stable_variance {
            beta += self.config.stability_bonus
                * (1.0 - speed_variance / self.config.stable_variance);
        }
        beta.clamp(self.config.min_beta, self.config.max_beta)
    }

    /// β from the speeds of a set of observations.
    pub fn beta_for(&self, observations: &[WindObservation]) -> f64 {
        if observations.is_empty() {
            return self.config.base_beta;
        }
        let n = observations.len() as f64;
        let mean = observations.iter().map(|o| o.wind_speed).sum::<f64>() / n;
        let variance = observations
            .iter()
            .map(|o| (o.wind_speed - mean).powi(2))
            .sum::<f64>()
            / n;
        self.dynamic_beta(mean, variance)
    }

    /// Estimate the propagation vector from per-sensor motion.
    ///
    /// Returns the unknown vector (confidence 0.2 by default) when there are
    /// too few observations or no usable pairs.
    pub fn estimate_propagation_vector(
        &self,
        observations: &[WindObservation],
    ) -> PropagationVector {
        let fallback = PropagationVector::unknown(self.config.fallback_confidence);
        if observations.len() < self.config.min_points {
            return fallback;
        }

        let beta = self.beta_for(observations);

        // pairs never mix sensors
        let mut groups: BTreeMap<Option<&str>, Vec<&WindObservation>> = BTreeMap::new();
        for obs in observations {
            groups.entry(obs.source_id.as_deref()).or_default().push(obs);
        }

        let mut bearings = Vec::new();
        let mut speeds = Vec::new();
        let mut weights = Vec::new();

        for group in groups.values_mut() {
            group.sort_by_key(|o| o.timestamp);
            for pair in group.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let dt = seconds_between(a.timestamp, b.timestamp);
                if dt <= 0.0 {
                    continue;
                }
                let displacement =
                    haversine_distance_m(a.latitude, a.longitude, b.latitude, b.longitude);
                if displacement < self.config.min_displacement_m {
                    continue;
                }

                let actual_bearing =
                    initial_bearing_deg(a.latitude, a.longitude, b.latitude, b.longitude);
                let actual_speed = displacement / dt;

                let mean_speed = (a.wind_speed + b.wind_speed) / 2.0;
                let pair_directions = [a.wind_direction, b.wind_direction];
                let Some(mean_dir) = circular_mean(&pair_directions, &[]) else {
                    continue;
                };
                let expected_bearing = normalize_degrees(
                    mean_dir + self.config.base_offset_deg * self.offset_multiplier(mean_speed),
                );
                let expected_speed = beta * mean_speed;

                let speed_similarity = if actual_speed.max(expected_speed) > 0.0 {
                    actual_speed.min(expected_speed) / actual_speed.max(expected_speed)
                } else {
                    0.0
                };
                let deviation = circular_difference(actual_bearing, expected_bearing).abs();
                let confidence = speed_similarity * (1.0 - deviation / 180.0);

                bearings.push(actual_bearing);
                speeds.push(actual_speed);
                weights.push(confidence);
            }
        }

        if bearings.is_empty() {
            return fallback;
        }

        let total_weight: f64 = weights.iter().sum();
        let (direction, speed) = if total_weight > 0.0 {
            let direction = circular_mean(&bearings, &weights).unwrap_or(bearings[0]);
            let speed = speeds.iter().zip(&weights).map(|(s, w)| s * w).sum::<f64>() / total_weight;
            (direction, speed)
        } else {
            let direction = circular_mean(&bearings, &[]).unwrap_or(bearings[0]);
            (direction, speeds.iter().sum::<f64>() / speeds.len() as f64)
        };
        let confidence = (total_weight / weights.len() as f64).min(self.config.max_confidence);

        PropagationVector {
            speed,
            direction: normalize_degrees(direction),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Re-estimate from `observations` when enough of them are available.
    ///
    /// Returns whether the stored vector changed.
    pub fn update(&mut self, observations: &[WindObservation]) -> bool {
        if observations.len() < self.config.min_points {
            return false;
        }
        let vector = self.estimate_propagation_vector(observations);
        self.last_beta = self.beta_for(observations);
        debug!(
            speed = vector.speed,
            direction = vector.direction,
            confidence = vector.confidence,
            beta = self.last_beta,
            "Updated propagation vector"
        );
        let changed = vector != self.vector;
        self.vector = vector;
        changed
    }

    /// Predict the wind at a position and future time from past readings.
    ///
    /// Walks upstream along the propagation vector to where the wind now at
    /// `(lat, lon)` was at the newest reading, then averages the nearest
    /// readings there. Returns `None` for an empty history.
    pub fn predict_future_wind(
        &self,
        lat: f64,
        lon: f64,
        target_time: DateTime<Utc>,
        history: &[WindObservation],
    ) -> Option<PointPrediction> {
        let newest = history.iter().map(|o| o.timestamp).max()?;
        let vector = self.estimate_propagation_vector(history);
        self.predict_with_vector(lat, lon, target_time, newest, history, vector)
    }

    /// Like [`predict_future_wind`](Self::predict_future_wind) with a known
    /// vector and newest timestamp, for evaluating many cells at once.
    pub fn predict_with_vector(
        &self,
        lat: f64,
        lon: f64,
        target_time: DateTime<Utc>,
        newest: DateTime<Utc>,
        history: &[WindObservation],
        vector: PropagationVector,
    ) -> Option<PointPrediction> {
        if history.is_empty() {
            return None;
        }

        let dt = seconds_between(newest, target_time).max(0.0);
        let travel = vector.speed * dt;
        let (src_lat, src_lon) = if travel > 0.0 {
            destination_point(lat, lon, normalize_degrees(vector.direction + 180.0), travel)
        } else {
            (lat, lon)
        };

        let mut nearest: Vec<(f64, &WindObservation)> = history
            .iter()
            .map(|o| (haversine_distance_m(src_lat, src_lon, o.latitude, o.longitude), o))
            .collect();
        nearest.sort_by(|a, b| a.0.total_cmp(&b.0));
        nearest.truncate(self.config.neighbors.max(1));

        let weights: Vec<f64> = nearest.iter().map(|(d, _)| 1.0 / (d + 1.0)).collect();
        let directions: Vec<f64> = nearest.iter().map(|(_, o)| o.wind_direction).collect();
        let total: f64 = weights.iter().sum();
        let wind_direction = circular_mean(&directions, &weights).unwrap_or(directions[0]);
        let wind_speed = nearest
            .iter()
            .zip(&weights)
            .map(|((_, o), w)| o.wind_speed * w)
            .sum::<f64>()
            / total;

        let nearest_distance_m = nearest[0].0;
        let tier = if nearest_distance_m < 100.0 {
            0.8
        } else if nearest_distance_m < 500.0 {
            0.6
        } else if nearest_distance_m < 2000.0 {
            0.4
        } else {
            0.2
        };
        let uncertainty = uncertainty_growth(nearest_distance_m, dt, 1.0 - vector.confidence);

        Some(PointPrediction {
            latitude: lat,
            longitude: lon,
            time: target_time,
            wind_direction: normalize_degrees(wind_direction),
            wind_speed: wind_speed.max(0.0),
            confidence: (tier * (1.0 - uncertainty)).clamp(0.0, 1.0),
            nearest_distance_m,
            uncertainty,
        })
    }
}
