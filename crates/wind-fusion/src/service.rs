//! High-level wind fusion service.
//!
//! The `WindFusionService` owns every piece of session state (observation
//! buffer and log, current field, history, propagation model, pending
//! predictions) and exposes a call-and-return API that always yields a field.
//!
//! # Example
//!
//! ```rust,ignore
//! use wind_fusion::WindFusionService;
//!
//! let mut service = WindFusionService::new();
//!
//! // Fuse a batch of sensor tracks
//! let field = service.ingest(sources);
//!
//! // Ten minutes ahead on a 20x20 grid
//! let forecast = service.predict(field.time + chrono::Duration::minutes(10), 20);
//! ```

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use wind_common::time::minutes_between;
use wind_common::{GridSpec, SourceSeries, WindField, WindObservation};

use crate::config::FusionConfig;
use crate::error::{FusionError, Result};
use crate::evaluator::{
    Evaluator, PendingPrediction, PredictionQualityReport, PropagationSummary, ReportStatus,
};
use crate::ingest::{chunk_by_time, summarize_chunks, validate_sources, IngestReport};
use crate::interpolation::resample::FieldSample;
use crate::interpolation::{resample_field, sample_field_at, Interpolator, StrategyKind};
use crate::propagation::{PointPrediction, PropagationModel, PropagationVector};
use crate::temporal::TemporalFusion;

/// Fuses moving-sensor observations into wind fields and predicts ahead.
pub struct WindFusionService {
    config: FusionConfig,
    /// Observations waiting to be fused
    buffer: Vec<WindObservation>,
    /// Fused observations, newest last, feeding the propagation model
    observation_log: VecDeque<WindObservation>,
    current: Option<WindField>,
    current_strategy: Option<StrategyKind>,
    temporal: TemporalFusion,
    interpolator: Interpolator,
    propagation: PropagationModel,
    evaluator: Evaluator,
    last_ingest: IngestReport,
}

impl Default for WindFusionService {
    fn default() -> Self {
        Self::new()
    }
}

impl WindFusionService {
    /// Create a service with the default configuration.
    pub fn new() -> Self {
        Self::build(FusionConfig::default())
    }

    /// Create a service with a custom configuration.
    ///
    /// # Errors
    /// Returns `FusionError::Config` if the configuration is invalid.
    pub fn with_config(config: FusionConfig) -> Result<Self> {
        config.validate().map_err(FusionError::Config)?;
        Ok(Self::build(config))
    }

    fn build(config: FusionConfig) -> Self {
        Self {
            buffer: Vec::new(),
            observation_log: VecDeque::with_capacity(config.observation_log_capacity),
            current: None,
            current_strategy: None,
            temporal: TemporalFusion::new(
                config.observation_window_minutes,
                config.history_capacity,
            ),
            interpolator: Interpolator::new(&config),
            propagation: PropagationModel::new(config.propagation.clone()),
            evaluator: Evaluator::new(&config),
            last_ingest: IngestReport::default(),
            config,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// The most recently fused field.
    pub fn current_field(&self) -> Option<&WindField> {
        self.current.as_ref()
    }

    /// Strategy that produced the current field.
    pub fn current_strategy(&self) -> Option<StrategyKind> {
        self.current_strategy
    }

    pub fn propagation_vector(&self) -> PropagationVector {
        self.propagation.vector()
    }

    pub fn temporal(&self) -> &TemporalFusion {
        &self.temporal
    }

    /// Report of the last `ingest` call.
    pub fn last_ingest_report(&self) -> &IngestReport {
        &self.last_ingest
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn observation_log_len(&self) -> usize {
        self.observation_log.len()
    }

    pub fn pending_predictions(&self) -> &[PendingPrediction] {
        self.evaluator.pending()
    }

    /// Validate, chunk and fuse a batch of source series.
    ///
    /// Bad records and sources are skipped with a warning in the ingest
    /// report. Chunks are fused oldest first; the newest chunk's field is
    /// returned, or the best available fallback if nothing could be fused.
    pub fn ingest(&mut self, sources: Vec<SourceSeries>) -> WindField {
        let (observations, mut report) = validate_sources(&sources);
        let chunks = chunk_by_time(observations, self.config.max_points_per_fusion);
        report.chunks = summarize_chunks(&chunks);

        let mut last = None;
        let count = chunks.len();
        for (idx, chunk) in chunks.into_iter().enumerate() {
            self.add_observations(chunk);
            // the newest chunk of a split batch is always fused
            let tail = idx + 1 == count && last.is_some();
            if tail || self.buffer.len() >= self.config.min_data_points {
                last = Some(self.fuse());
            }
        }

        info!(
            sources = report.sources,
            accepted = report.accepted_records,
            rejected = report.rejected_records,
            chunks = report.chunks.len(),
            "Ingested observations"
        );
        self.last_ingest = report;

        match last {
            Some(field) => field,
            None => {
                let time = self.reference_time().unwrap_or_else(Utc::now);
                let grid = self.grid_for(&self.buffer);
                self.fallback_field(time, &grid)
            }
        }
    }

    /// Append already-validated observations to the fusion buffer.
    pub fn add_observations(&mut self, observations: impl IntoIterator<Item = WindObservation>) {
        self.buffer.extend(observations);
    }

    /// Fuse the buffered observations into a new current field.
    ///
    /// With nothing buffered the best available estimate is returned and no
    /// state changes.
    pub fn fuse(&mut self) -> WindField {
        let mut points = self.temporal.window(std::mem::take(&mut self.buffer));
        if points.len() > self.config.max_points_per_fusion {
            let excess = points.len() - self.config.max_points_per_fusion;
            debug!(dropped = excess, "Point cap reached, keeping newest");
            points.drain(..excess);
        }

        let target_time = points
            .last()
            .map(|p| p.timestamp)
            .or_else(|| self.reference_time())
            .unwrap_or_else(Utc::now);
        let grid = self.grid_for(&points);
        let snapshots = self.temporal.snapshots(self.current.as_ref());
        let trend = self.temporal.trend();

        let outcome = self
            .interpolator
            .interpolate(&points, &snapshots, target_time, &grid, trend);

        if points.is_empty() {
            if outcome.strategy == StrategyKind::Dummy {
                return self.fallback_field(target_time, &grid);
            }
            return outcome.field;
        }

        info!(
            points = points.len(),
            strategy = %outcome.strategy,
            mean_confidence = outcome.field.mean_confidence(),
            "Fused wind field"
        );

        if let Some(previous) = self.current.replace(outcome.field.clone()) {
            self.temporal.push_field(previous);
        }
        self.current_strategy = Some(outcome.strategy);

        let scored = self.evaluator.score(&outcome.points);
        for obs in outcome.points {
            if self.observation_log.len() == self.config.observation_log_capacity {
                self.observation_log.pop_front();
            }
            self.observation_log.push_back(obs);
        }

        self.propagation.update(self.observation_log.make_contiguous());
        let collected = self.evaluator.collect_garbage(target_time);
        if scored > 0 || collected > 0 {
            debug!(scored, collected, "Updated pending predictions");
        }

        outcome.field
    }

    /// Predict the field at `target_time` on a `resolution x resolution` grid.
    ///
    /// Short horizons blend stored fields; longer ones carry recent readings
    /// along the propagation vector.
    ///
    /// # Arguments
    /// * `target_time` - Time to predict for
    /// * `resolution` - Points per axis of the returned grid
    pub fn predict(&mut self, target_time: DateTime<Utc>, resolution: usize) -> WindField {
        let bbox = self
            .current
            .as_ref()
            .map(|f| f.grid_spec().bbox)
            .unwrap_or(self.config.default_bbox);
        let grid = GridSpec::square(bbox, resolution);

        let Some(reference) = self.reference_time() else {
            return self.fallback_field(target_time, &grid);
        };

        let horizon = minutes_between(reference, target_time);
        let predicted = if horizon <= self.config.short_horizon_minutes {
            self.predict_short(target_time, &grid)
        } else {
            self.predict_long(target_time, &grid)
        };

        match predicted {
            Ok(field) => field,
            Err(e) => {
                warn!(error = %e, horizon_minutes = horizon, "Prediction failed, using fallback");
                self.fallback_field(target_time, &grid)
            }
        }
    }

    fn predict_short(&self, target_time: DateTime<Utc>, grid: &GridSpec) -> Result<WindField> {
        let snapshots = self.temporal.snapshots(self.current.as_ref());
        let points = snapshot_points(&snapshots, self.config.interpolation.max_snapshot_points);
        let outcome = self.interpolator.interpolate(
            &points,
            &snapshots,
            target_time,
            grid,
            self.temporal.trend(),
        );
        if outcome.strategy == StrategyKind::Dummy {
            return Err(FusionError::insufficient(1, snapshots.len()));
        }
        debug!(strategy = %outcome.strategy, "Short-horizon prediction");
        Ok(outcome.field)
    }

    fn predict_long(&mut self, target_time: DateTime<Utc>, grid: &GridSpec) -> Result<WindField> {
        let history = self.observation_log.make_contiguous();
        let newest = history
            .iter()
            .map(|o| o.timestamp)
            .max()
            .ok_or_else(|| FusionError::insufficient(1, 0))?;

        let coarse_res = self.config.long_horizon_resolution.min(grid.width.max(grid.height));
        let coarse = grid.with_resolution(coarse_res, coarse_res);
        let vector = self.propagation.estimate_propagation_vector(history);
        let calibration = self.evaluator.calibration_factor();

        let propagation = &self.propagation;
        let history: &[WindObservation] = history;
        let predictions: Vec<PointPrediction> = (0..coarse.len())
            .into_par_iter()
            .map(|idx| {
                let (col, row) = coarse.col_row(idx);
                let (lat, lon) = coarse.coord(col, row);
                propagation.predict_with_vector(lat, lon, target_time, newest, history, vector)
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| FusionError::interpolation("propagation produced no prediction"))?
            .into_iter()
            .map(|mut p| {
                p.confidence = (p.confidence * calibration).clamp(0.0, 1.0);
                p
            })
            .collect();

        self.evaluator.collect_garbage(newest);
        let samples = self.config.pending_sample_count.min(predictions.len());
        for k in 0..samples {
            let prediction = predictions[k * predictions.len() / samples];
            self.evaluator.register(PendingPrediction {
                made_at: newest,
                prediction,
            });
        }

        let field = WindField::from_cells(
            &coarse,
            target_time,
            predictions.iter().map(|p| p.wind_direction).collect(),
            predictions.iter().map(|p| p.wind_speed).collect(),
            predictions.iter().map(|p| p.confidence).collect(),
        );
        debug!(
            cells = coarse.len(),
            pending = self.evaluator.pending_count(),
            propagation_speed = vector.speed,
            "Long-horizon prediction"
        );

        Ok(if coarse == *grid {
            field
        } else {
            resample_field(&field, grid)
        })
    }

    /// Single-point long-horizon prediction from the observation log.
    pub fn predict_at(
        &mut self,
        lat: f64,
        lon: f64,
        target_time: DateTime<Utc>,
    ) -> Option<PointPrediction> {
        let calibration = self.evaluator.calibration_factor();
        let history = self.observation_log.make_contiguous();
        let mut prediction = self
            .propagation
            .predict_future_wind(lat, lon, target_time, history)?;
        prediction.confidence = (prediction.confidence * calibration).clamp(0.0, 1.0);
        Some(prediction)
    }

    /// Wind of the current field at a position.
    pub fn wind_at(&self, lat: f64, lon: f64) -> Option<FieldSample> {
        sample_field_at(self.current.as_ref()?, lat, lon)
    }

    /// Summary of propagation state and prediction skill.
    pub fn get_prediction_quality_report(&self) -> PredictionQualityReport {
        let status = if self.current.is_none() {
            ReportStatus::NoData
        } else if self.evaluator.is_calibrated() {
            ReportStatus::Calibrated
        } else {
            ReportStatus::Collecting
        };

        PredictionQualityReport {
            status,
            pending_predictions: self.evaluator.pending_count(),
            propagation: PropagationSummary::new(
                self.propagation.vector(),
                self.propagation.last_beta(),
            ),
            skill: self.evaluator.metrics(),
            calibration_factor: self.evaluator.calibration_factor(),
            current_strategy: self.current_strategy.map(|s| s.as_str().to_string()),
        }
    }

    /// Newest data time known to the service.
    fn reference_time(&self) -> Option<DateTime<Utc>> {
        let field_time = self.current.as_ref().map(|f| f.time);
        let log_time = self.observation_log.back().map(|o| o.timestamp);
        let buffer_time = self.buffer.iter().map(|o| o.timestamp).max();
        [field_time, log_time, buffer_time].into_iter().flatten().max()
    }

    /// Grid over the padded extent of `points`, or the current/default box.
    fn grid_for(&self, points: &[WindObservation]) -> GridSpec {
        let bbox = if points.is_empty() {
            self.current
                .as_ref()
                .map(|f| f.grid_spec().bbox)
                .unwrap_or(self.config.default_bbox)
        } else {
            self.interpolator
                .scaler()
                .bounds_for(points, &self.config.default_bbox)
                .bbox
                .clamp_to_valid()
        };
        GridSpec::square(bbox, self.config.grid_resolution)
    }

    /// Last known field moved onto `grid` at `time`, else the dummy field.
    fn fallback_field(&self, time: DateTime<Utc>, grid: &GridSpec) -> WindField {
        match &self.current {
            Some(field) => {
                debug!(strategy = %StrategyKind::LastKnown, "Falling back");
                resample_field(field, grid).retimed(time)
            }
            None => {
                debug!(strategy = %StrategyKind::Dummy, "Falling back");
                self.interpolator.dummy().build(grid, time)
            }
        }
    }
}

/// Cells of stored fields as pseudo-observations, thinned to `max_points`.
fn snapshot_points(snapshots: &[WindField], max_points: usize) -> Vec<WindObservation> {
    let total: usize = snapshots.iter().map(WindField::len).sum();
    if total == 0 || max_points == 0 {
        return Vec::new();
    }
    let stride = total.div_ceil(max_points);

    snapshots
        .iter()
        .flat_map(|field| {
            (0..field.len()).map(move |idx| {
                WindObservation::new(
                    field.time,
                    field.lat_grid[idx],
                    field.lon_grid[idx],
                    field.wind_direction[idx],
                    field.wind_speed[idx],
                )
                .with_confidence(field.confidence[idx])
            })
        })
        .step_by(stride)
        .collect()
}
