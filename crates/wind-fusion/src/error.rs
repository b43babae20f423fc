//! Error types for wind fusion.
//!
//! These errors stay inside the crate's fallback machinery: strategies return
//! them, the interpolator chain logs and skips them, and the public service
//! API turns every failure into a lower-confidence field.

use thiserror::Error;
use wind_common::ObservationError;

/// Errors that can occur while fusing or predicting.
#[derive(Error, Debug)]
pub enum FusionError {
    /// Not enough points for the requested operation.
    #[error("insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// Singular or ill-conditioned system (duplicate/collinear points).
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Interpolation produced unusable output.
    #[error("interpolation error: {0}")]
    Interpolation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Observation failed validation.
    #[error("invalid observation: {0}")]
    Observation(#[from] ObservationError),
}

impl FusionError {
    /// Create an InsufficientData error.
    pub fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Create a NumericalDegeneracy error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::NumericalDegeneracy(msg.into())
    }

    /// Create an Interpolation error.
    pub fn interpolation(msg: impl Into<String>) -> Self {
        Self::Interpolation(msg.into())
    }
}

impl From<serde_yaml::Error> for FusionError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for fusion operations.
pub type Result<T> = std::result::Result<T, FusionError>;
