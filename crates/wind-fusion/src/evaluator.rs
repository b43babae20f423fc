//! Scoring of long-horizon predictions against later observations.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wind_common::geo::haversine_distance_m;
use wind_common::time::seconds_between;
use wind_common::{circular_difference, WindObservation};

use crate::config::FusionConfig;
use crate::propagation::{PointPrediction, PropagationVector};

/// Evaluations kept for skill metrics.
const EVALUATION_CAPACITY: usize = 500;

/// Predictions awaiting a match; the oldest registration is dropped first.
pub const PENDING_CAPACITY: usize = 500;

/// Evaluations needed before predictions are recalibrated.
pub const MIN_EVALUATIONS: usize = 5;

/// A prediction waiting for a matching observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPrediction {
    pub made_at: DateTime<Utc>,
    pub prediction: PointPrediction,
}

impl PendingPrediction {
    pub fn target_time(&self) -> DateTime<Utc> {
        self.prediction.time
    }
}

/// Outcome of one scored prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub direction_error: f64,
    pub speed_error: f64,
    pub observed_speed: f64,
    pub predicted_confidence: f64,
}

/// Aggregate skill over recent evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SkillMetrics {
    pub evaluations: usize,
    /// Mean absolute direction error in degrees
    pub mean_direction_error: f64,
    /// Mean absolute speed error in m/s
    pub mean_speed_error: f64,
    /// Combined skill in `[0, 1]`, 1 is perfect
    pub skill_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Nothing has been fused yet
    NoData,
    /// Fusing, fewer than the calibration minimum of evaluations
    Collecting,
    /// Enough evaluations to calibrate prediction confidence
    Calibrated,
}

/// Propagation section of the quality report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationSummary {
    pub speed: f64,
    pub direction: f64,
    pub confidence: f64,
    /// Most recent dynamic β
    pub wind_speed_factor: f64,
}

impl PropagationSummary {
    pub fn new(vector: PropagationVector, beta: f64) -> Self {
        Self {
            speed: vector.speed,
            direction: vector.direction,
            confidence: vector.confidence,
            wind_speed_factor: beta,
        }
    }
}

/// Snapshot of prediction quality for reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionQualityReport {
    pub status: ReportStatus,
    pub pending_predictions: usize,
    pub propagation: PropagationSummary,
    pub skill: SkillMetrics,
    pub calibration_factor: f64,
    /// Strategy that produced the current field
    pub current_strategy: Option<String>,
}

/// Keeps pending predictions and scores them as observations arrive.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pending: Vec<PendingPrediction>,
    evaluations: VecDeque<Evaluation>,
    time_tolerance_secs: f64,
    match_distance_m: f64,
    ttl: Duration,
}

impl Evaluator {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            pending: Vec::new(),
            evaluations: VecDeque::new(),
            time_tolerance_secs: config.match_time_tolerance_secs,
            match_distance_m: config.match_distance_m,
            ttl: Duration::milliseconds((config.pending_ttl_minutes * 60_000.0) as i64),
        }
    }

    pub fn register(&mut self, pending: PendingPrediction) {
        if self.pending.len() >= PENDING_CAPACITY {
            self.pending.remove(0);
        }
        self.pending.push(pending);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &[PendingPrediction] {
        &self.pending
    }

    fn matches(&self, pending: &PendingPrediction, obs: &WindObservation) -> bool {
        let p = &pending.prediction;
        seconds_between(p.time, obs.timestamp).abs() <= self.time_tolerance_secs
            && haversine_distance_m(p.latitude, p.longitude, obs.latitude, obs.longitude)
                <= self.match_distance_m
    }

    /// Score pending predictions matched by `observations` and drop them.
    ///
    /// Returns the number of predictions scored.
    pub fn score(&mut self, observations: &[WindObservation]) -> usize {
        let mut scored = 0;
        let mut remaining = Vec::with_capacity(self.pending.len());

        for pending in std::mem::take(&mut self.pending) {
            let Some(obs) = observations.iter().find(|o| self.matches(&pending, o)) else {
                remaining.push(pending);
                continue;
            };
            let p = &pending.prediction;
            let evaluation = Evaluation {
                direction_error: circular_difference(obs.wind_direction, p.wind_direction).abs(),
                speed_error: (obs.wind_speed - p.wind_speed).abs(),
                observed_speed: obs.wind_speed,
                predicted_confidence: p.confidence,
            };
            debug!(
                direction_error = evaluation.direction_error,
                speed_error = evaluation.speed_error,
                "Scored prediction"
            );
            if self.evaluations.len() == EVALUATION_CAPACITY {
                self.evaluations.pop_front();
            }
            self.evaluations.push_back(evaluation);
            scored += 1;
        }

        self.pending = remaining;
        scored
    }

    /// Drop predictions made longer than the TTL before `now`.
    pub fn collect_garbage(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        let ttl = self.ttl;
        self.pending.retain(|p| now - p.made_at <= ttl);
        before - self.pending.len()
    }

    pub fn metrics(&self) -> SkillMetrics {
        let n = self.evaluations.len();
        if n == 0 {
            return SkillMetrics::default();
        }
        let nf = n as f64;
        let mean_direction_error =
            self.evaluations.iter().map(|e| e.direction_error).sum::<f64>() / nf;
        let mean_speed_error = self.evaluations.iter().map(|e| e.speed_error).sum::<f64>() / nf;
        let mean_observed = self.evaluations.iter().map(|e| e.observed_speed).sum::<f64>() / nf;

        let direction_skill = 1.0 - (mean_direction_error / 180.0).min(1.0);
        let speed_skill = 1.0 - (mean_speed_error / mean_observed.max(1.0)).min(1.0);

        SkillMetrics {
            evaluations: n,
            mean_direction_error,
            mean_speed_error,
            skill_score: ((direction_skill + speed_skill) / 2.0).clamp(0.0, 1.0),
        }
    }

    /// Multiplier for long-horizon confidence; 1 until enough evaluations.
    pub fn calibration_factor(&self) -> f64 {
        if self.evaluations.len() < MIN_EVALUATIONS {
            return 1.0;
        }
        0.5 + 0.5 * self.metrics().skill_score
    }

    pub fn is_calibrated(&self) -> bool {
        self.evaluations.len() >= MIN_EVALUATIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-02-02T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(seconds)
    }

    fn pending(made_at: i64, target: i64, dir: f64, speed: f64) -> PendingPrediction {
        PendingPrediction {
            made_at: t(made_at),
            prediction: PointPrediction {
                latitude: 30.0,
                longitude: -90.0,
                time: t(target),
                wind_direction: dir,
                wind_speed: speed,
                confidence: 0.6,
                nearest_distance_m: 50.0,
                uncertainty: 0.1,
            },
        }
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(&FusionConfig::default())
    }

    #[test]
    fn test_match_within_tolerance() {
        let mut ev = evaluator();
        ev.register(pending(0, 600, 350.0, 4.0));
        ev.register(pending(0, 1200, 90.0, 4.0));

        // 45 s late and ~110 m away matches the first only
        let obs = WindObservation::new(t(645), 30.001, -90.0, 10.0, 5.0);
        assert_eq!(ev.score(&[obs]), 1);
        assert_eq!(ev.pending_count(), 1);

        let m = ev.metrics();
        assert_eq!(m.evaluations, 1);
        assert!((m.mean_direction_error - 20.0).abs() < 1e-9);
        assert!((m.mean_speed_error - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_when_too_far() {
        let mut ev = evaluator();
        ev.register(pending(0, 600, 0.0, 4.0));
        let late = WindObservation::new(t(700), 30.0, -90.0, 0.0, 4.0);
        let far = WindObservation::new(t(600), 30.01, -90.0, 0.0, 4.0);
        assert_eq!(ev.score(&[late, far]), 0);
        assert_eq!(ev.pending_count(), 1);
    }

    #[test]
    fn test_garbage_collection() {
        let mut ev = evaluator();
        ev.register(pending(0, 600, 0.0, 1.0));
        ev.register(pending(3600, 4200, 0.0, 1.0));
        assert_eq!(ev.collect_garbage(t(7300)), 1);
        assert_eq!(ev.pending_count(), 1);
    }

    #[test]
    fn test_pending_registry_is_bounded() {
        let mut ev = evaluator();
        for i in 0..(PENDING_CAPACITY as i64 + 20) {
            ev.register(pending(i, i + 600, 0.0, 1.0));
        }
        assert_eq!(ev.pending_count(), PENDING_CAPACITY);
        assert_eq!(ev.pending()[0].made_at, t(20));
    }

    #[test]
    fn test_calibration_after_five() {
        let mut ev = evaluator();
        assert_eq!(ev.calibration_factor(), 1.0);

        for i in 0..MIN_EVALUATIONS as i64 {
            ev.register(pending(0, i * 10, 0.0, 4.0));
            // 90 degrees off, speed exact
            let obs = WindObservation::new(t(i * 10), 30.0, -90.0, 90.0, 4.0);
            assert_eq!(ev.score(&[obs]), 1);
        }

        assert!(ev.is_calibrated());
        let skill = ev.metrics().skill_score;
        assert!((skill - 0.75).abs() < 1e-9);
        assert!((ev.calibration_factor() - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_report_serializes() {
        let report = PredictionQualityReport {
            status: ReportStatus::Collecting,
            pending_predictions: 2,
            propagation: PropagationSummary::new(PropagationVector::unknown(0.2), 0.6),
            skill: SkillMetrics::default(),
            calibration_factor: 1.0,
            current_strategy: Some("joint_regression".into()),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "collecting");
        assert_eq!(json["propagation"]["wind_speed_factor"], 0.6);
    }
}
