//! Temporal fusion: observation windowing and trend extraction.
//!
//! The trend is the median rate of change of the central grid cell across
//! consecutive stored fields. The median keeps a single badly fused field
//! from steering the extrapolation.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use wind_common::time::minutes_between;
use wind_common::{circular_difference, WindField, WindObservation};

use crate::history::FieldHistory;

/// Rates of change per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Degrees per minute, positive is clockwise
    pub direction_rate: f64,
    /// Meters per second per minute
    pub speed_rate: f64,
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Owns the field history and the observation window.
#[derive(Debug, Clone)]
pub struct TemporalFusion {
    window_minutes: f64,
    history: FieldHistory,
}

impl TemporalFusion {
    pub fn new(window_minutes: f64, history_capacity: usize) -> Self {
        Self {
            window_minutes,
            history: FieldHistory::new(history_capacity),
        }
    }

    pub fn window_minutes(&self) -> f64 {
        self.window_minutes
    }

    /// Sort by time and keep observations within the window of the newest.
    pub fn window(&self, mut observations: Vec<WindObservation>) -> Vec<WindObservation> {
        observations.sort_by_key(|o| o.timestamp);
        let Some(newest) = observations.last().map(|o| o.timestamp) else {
            return observations;
        };
        let cutoff = newest - Duration::milliseconds((self.window_minutes * 60_000.0) as i64);
        observations.retain(|o| o.timestamp >= cutoff);
        observations
    }

    pub fn push_field(&mut self, field: WindField) {
        self.history.push(field);
    }

    pub fn history(&self) -> &FieldHistory {
        &self.history
    }

    /// Time-ordered non-dummy snapshots, with `current` appended if given.
    pub fn snapshots(&self, current: Option<&WindField>) -> Vec<WindField> {
        let mut snapshots: Vec<WindField> = self
            .history
            .iter()
            .chain(current)
            .filter(|f| !f.is_dummy)
            .cloned()
            .collect();
        snapshots.sort_by_key(|f| f.time);
        snapshots
    }

    /// Median rates over consecutive non-dummy history pairs.
    pub fn trend(&self) -> Option<Trend> {
        let fields: Vec<&WindField> = self.history.iter().filter(|f| !f.is_dummy).collect();

        let mut dir_rates = Vec::new();
        let mut speed_rates = Vec::new();
        for pair in fields.windows(2) {
            let dt = minutes_between(pair[0].time, pair[1].time);
            if dt <= 0.0 {
                continue;
            }
            let (Some((d0, s0, _)), Some((d1, s1, _))) =
                (pair[0].center_values(), pair[1].center_values())
            else {
                continue;
            };
            dir_rates.push(circular_difference(d1, d0) / dt);
            speed_rates.push((s1 - s0) / dt);
        }

        Some(Trend {
            direction_rate: median(&mut dir_rates)?,
            speed_rate: median(&mut speed_rates)?,
        })
    }
}
