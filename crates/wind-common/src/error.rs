//! Error types for observation validation.

use thiserror::Error;

/// Result type alias using ObservationError.
pub type ObservationResult<T> = Result<T, ObservationError>;

/// Errors raised while turning raw telemetry into canonical observations.
///
/// None of these abort a batch: the ingestion layer skips the offending
/// record or source and records a warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObservationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unsupported speed unit: {0}")]
    UnsupportedUnit(String),

    #[error("Value out of range for '{field}': {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Source '{0}' contains no usable records")]
    EmptySource(String),
}

impl ObservationError {
    /// Short machine-readable category, used in ingest warnings.
    pub fn kind(&self) -> &'static str {
        match self {
            ObservationError::MissingField(_) => "missing_field",
            ObservationError::InvalidTimestamp(_) => "invalid_timestamp",
            ObservationError::UnsupportedUnit(_) => "unsupported_unit",
            ObservationError::OutOfRange { .. } => "out_of_range",
            ObservationError::EmptySource(_) => "empty_source",
        }
    }

    /// Whether this error disqualifies the whole source rather than one record.
    pub fn is_source_level(&self) -> bool {
        matches!(
            self,
            ObservationError::UnsupportedUnit(_) | ObservationError::EmptySource(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ObservationError::MissingField("latitude").kind(), "missing_field");
        assert_eq!(
            ObservationError::UnsupportedUnit("furlongs".into()).kind(),
            "unsupported_unit"
        );
    }

    #[test]
    fn test_source_level_errors() {
        assert!(ObservationError::UnsupportedUnit("x".into()).is_source_level());
        assert!(ObservationError::EmptySource("boat-1".into()).is_source_level());
        assert!(!ObservationError::MissingField("timestamp").is_source_level());
        assert!(!ObservationError::InvalidTimestamp("yesterday".into()).is_source_level());
    }

    #[test]
    fn test_error_display() {
        let err = ObservationError::OutOfRange {
            field: "latitude",
            value: 123.0,
        };
        assert_eq!(err.to_string(), "Value out of range for 'latitude': 123");
    }
}
