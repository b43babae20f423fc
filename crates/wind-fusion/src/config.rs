//! Configuration for the fusion service.
//!
//! Every numeric constant of the pipeline lives here. They are calibrated
//! behavior parameters, not physical truths.

use serde::{Deserialize, Serialize};
use wind_common::BoundingBox;

use crate::error::Result;

/// Top-level configuration for [`WindFusionService`](crate::WindFusionService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Points per axis of fused fields.
    pub grid_resolution: usize,

    /// Observations older than this (relative to the newest) are dropped.
    pub observation_window_minutes: f64,

    /// Buffered points needed before ingestion triggers a fusion pass.
    pub min_data_points: usize,

    /// Ceiling on points per fusion pass; larger batches are chunked.
    pub max_points_per_fusion: usize,

    /// Number of superseded fields kept for trend extraction.
    pub history_capacity: usize,

    /// Number of fused observations kept for the propagation model.
    pub observation_log_capacity: usize,

    /// Predictions up to this horizon use the snapshot interpolator.
    pub short_horizon_minutes: f64,

    /// Points per axis of the down-sampled long-horizon grid.
    pub long_horizon_resolution: usize,

    /// Cells of each long-horizon prediction registered for evaluation.
    pub pending_sample_count: usize,

    /// Time tolerance when matching an observation to a pending prediction.
    pub match_time_tolerance_secs: f64,

    /// Distance tolerance when matching an observation to a pending prediction.
    pub match_distance_m: f64,

    /// Unmatched pending predictions are dropped after this long.
    pub pending_ttl_minutes: f64,

    /// Area used for the dummy field before any observation arrives.
    pub default_bbox: BoundingBox,

    pub scaler: ScalerConfig,
    pub interpolation: InterpolationConfig,
    pub propagation: PropagationConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 20,
            observation_window_minutes: 30.0,
            min_data_points: 3,
            max_points_per_fusion: 400,
            history_capacity: 10,
            observation_log_capacity: 5000,
            short_horizon_minutes: 5.0,
            long_horizon_resolution: 10,
            pending_sample_count: 5,
            match_time_tolerance_secs: 60.0,
            match_distance_m: 200.0,
            pending_ttl_minutes: 120.0,
            default_bbox: BoundingBox::default(),
            scaler: ScalerConfig::default(),
            interpolation: InterpolationConfig::default(),
            propagation: PropagationConfig::default(),
        }
    }
}

impl FusionConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("WIND_FUSION_GRID_RESOLUTION") {
            config.grid_resolution = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_WINDOW_MINUTES") {
            config.observation_window_minutes = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_MIN_DATA_POINTS") {
            config.min_data_points = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_MAX_POINTS_PER_FUSION") {
            config.max_points_per_fusion = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_HISTORY_CAPACITY") {
            config.history_capacity = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_SHORT_HORIZON_MINUTES") {
            config.short_horizon_minutes = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_LONG_HORIZON_RESOLUTION") {
            config.long_horizon_resolution = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_BASE_BETA") {
            config.propagation.base_beta = v;
        }
        if let Some(v) = env_parse("WIND_FUSION_JITTER_SEED") {
            config.scaler.jitter_seed = v;
        }

        config
    }

    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.grid_resolution == 0 {
            return Err("grid_resolution must be > 0".to_string());
        }
        if self.long_horizon_resolution == 0 {
            return Err("long_horizon_resolution must be > 0".to_string());
        }
        if self.observation_window_minutes <= 0.0 {
            return Err("observation_window_minutes must be > 0".to_string());
        }
        if self.min_data_points == 0 {
            return Err("min_data_points must be > 0".to_string());
        }
        if self.max_points_per_fusion < self.min_data_points {
            return Err("max_points_per_fusion must be >= min_data_points".to_string());
        }
        if self.history_capacity < 2 {
            return Err("history_capacity must be >= 2".to_string());
        }
        if self.match_distance_m <= 0.0 || self.match_time_tolerance_secs <= 0.0 {
            return Err("prediction matching tolerances must be > 0".to_string());
        }
        self.scaler.validate()?;
        self.interpolation.validate()?;
        self.propagation.validate()?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Coordinate normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    /// Minimum positional span in meters before padding kicks in.
    pub min_position_span_m: f64,
    /// Minimum speed span in m/s.
    pub min_speed_span: f64,
    /// Jitter amplitude in scaled units (the scaled range is `[0, 1]`).
    pub jitter_amplitude: f64,
    /// Seed of the jitter generator; the same input always jitters the same way.
    pub jitter_seed: u64,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            min_position_span_m: 500.0,
            min_speed_span: 1.0,
            jitter_amplitude: 1e-4,
            jitter_seed: 42,
        }
    }
}

impl ScalerConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_position_span_m <= 0.0 || self.min_speed_span <= 0.0 {
            return Err("scaler minimum spans must be > 0".to_string());
        }
        if !(0.0..0.01).contains(&self.jitter_amplitude) {
            return Err("jitter_amplitude must be in [0, 0.01)".to_string());
        }
        Ok(())
    }
}

/// Settings of the interpolation fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Minutes of time offset that map to one unit of the joint feature space.
    pub time_scale_minutes: f64,
    /// Kernel length scale along the scaled lat/lon axes.
    pub spatial_length_scale: f64,
    /// Kernel length scale along the scaled time axis.
    pub temporal_length_scale: f64,
    /// Observation noise as a fraction of the signal variance.
    pub noise_ratio: f64,
    /// Weight of direction uncertainty in regression confidence.
    pub direction_uncertainty_weight: f64,
    /// Weight of speed uncertainty in regression confidence.
    pub speed_uncertainty_weight: f64,
    /// Confidence of RBF cells far (in time) from any sample.
    pub rbf_confidence_floor: f64,
    /// Floor of the snapshot blend's time decay.
    pub snapshot_confidence_floor: f64,
    /// Minutes over which time-distance confidence decays to its floor.
    pub confidence_decay_minutes: f64,
    pub degenerate_confidence: f64,
    pub dummy_direction: f64,
    pub dummy_speed: f64,
    pub dummy_confidence: f64,
    /// Cap on grid cells drawn from history snapshots for joint regression.
    pub max_snapshot_points: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            time_scale_minutes: 30.0,
            spatial_length_scale: 0.35,
            temporal_length_scale: 1.0,
            noise_ratio: 0.05,
            direction_uncertainty_weight: 0.6,
            speed_uncertainty_weight: 0.4,
            rbf_confidence_floor: 0.4,
            snapshot_confidence_floor: 0.5,
            confidence_decay_minutes: 30.0,
            degenerate_confidence: 0.4,
            dummy_direction: 225.0,
            dummy_speed: 5.0,
            dummy_confidence: 0.3,
            max_snapshot_points: 300,
        }
    }
}

impl InterpolationConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.time_scale_minutes <= 0.0
            || self.spatial_length_scale <= 0.0
            || self.temporal_length_scale <= 0.0
        {
            return Err("interpolation scales must be > 0".to_string());
        }
        if self.noise_ratio <= 0.0 {
            return Err("noise_ratio must be > 0".to_string());
        }
        if self.confidence_decay_minutes <= 0.0 {
            return Err("confidence_decay_minutes must be > 0".to_string());
        }
        for (name, v) in [
            ("rbf_confidence_floor", self.rbf_confidence_floor),
            ("snapshot_confidence_floor", self.snapshot_confidence_floor),
            ("degenerate_confidence", self.degenerate_confidence),
            ("dummy_confidence", self.dummy_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{} must be in [0, 1]", name));
            }
        }
        Ok(())
    }
}

/// Settings of the propagation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Observations needed before a vector is estimated.
    pub min_points: usize,
    /// Base deflection between wind direction and propagation bearing.
    pub base_offset_deg: f64,
    /// Cap on the speed-dependent deflection multiplier.
    pub max_offset_multiplier: f64,
    /// Wind speed (m/s) at which the full multiplier applies.
    pub reference_speed: f64,
    /// Fraction of wind speed at which the pattern is advected.
    pub base_beta: f64,
    pub min_beta: f64,
    pub max_beta: f64,
    /// Speed variance (m²/s²) under which wind counts as stable.
    pub stable_variance: f64,
    /// Largest beta bonus for stable wind.
    pub stability_bonus: f64,
    /// Pairs closer than this are ignored.
    pub min_displacement_m: f64,
    /// Historical points used by `predict_future_wind`.
    pub neighbors: usize,
    pub max_confidence: f64,
    /// Confidence reported when no vector can be estimated.
    pub fallback_confidence: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            min_points: 5,
            base_offset_deg: 10.0,
            max_offset_multiplier: 1.5,
            reference_speed: 10.0,
            base_beta: 0.6,
            min_beta: 0.4,
            max_beta: 0.8,
            stable_variance: 1.0,
            stability_bonus: 0.05,
            min_displacement_m: 1.0,
            neighbors: 3,
            max_confidence: 0.9,
            fallback_confidence: 0.2,
        }
    }
}

impl PropagationConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_points < 2 {
            return Err("propagation min_points must be >= 2".to_string());
        }
        if self.min_beta > self.max_beta {
            return Err("min_beta must be <= max_beta".to_string());
        }
        if self.reference_speed <= 0.0 {
            return Err("reference_speed must be > 0".to_string());
        }
        if self.neighbors == 0 {
            return Err("neighbors must be > 0".to_string());
        }
        Ok(())
    }
}
