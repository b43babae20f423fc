//! Wind Field Fusion
//!
//! This crate turns sparse, asynchronous wind readings from moving sensors
//! into gridded wind fields and predicts those fields ahead in time:
//!
//! - **Interpolation**: an ordered fallback chain from Gaussian-process
//!   regression down to a flagged placeholder field
//! - **Temporal fusion**: bounded field history and median trend extraction
//! - **Propagation**: pattern velocity from sensor drift, carried forward with
//!   growing uncertainty
//! - **Evaluation**: predictions are scored against later observations and
//!   used to recalibrate confidence
//!
//! # Architecture
//!
//! ```text
//! SourceSeries
//!      │
//!      ▼
//! validate_sources ──► IngestReport (warnings)
//!      │
//!      ▼
//! chunk_by_time (≤ max_points_per_fusion each, oldest first)
//!      │
//!      ▼
//! WindFusionService::fuse
//!      │
//!      ├─► TemporalFusion::window
//!      ├─► Interpolator (scaler + strategy chain) ──► WindField
//!      ├─► FieldHistory (superseded fields)
//!      ├─► PropagationModel::update (observation log)
//!      └─► Evaluator::score (pending predictions)
//! ```
//!
//! Public entry points never fail on data problems; degradation shows up as
//! lower confidence or `is_dummy` on the returned field.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod ingest;
pub mod interpolation;
pub mod propagation;
pub mod scaler;
pub mod service;
pub mod temporal;

// Re-export commonly used types at crate root
pub use config::{FusionConfig, InterpolationConfig, PropagationConfig, ScalerConfig};
pub use error::{FusionError, Result};
pub use evaluator::{Evaluator, PendingPrediction, PredictionQualityReport, SkillMetrics};
pub use history::FieldHistory;
pub use ingest::{chunk_by_time, validate_sources, IngestReport, IngestWarning};
pub use interpolation::resample::FieldSample;
pub use interpolation::{
    resample_field, InterpolationStrategy, Interpolator, InterpolationOutcome, StrategyKind,
};
pub use propagation::{uncertainty_growth, PointPrediction, PropagationModel, PropagationVector};
pub use scaler::{CoordinateScaler, ScaledBatch};
pub use service::WindFusionService;
pub use temporal::{TemporalFusion, Trend};
pub use wind_common::{GridSpec, WindField, WindObservation};
