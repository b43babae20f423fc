//! Wind observations and the raw per-source series they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::circular::normalize_degrees;
use crate::error::{ObservationError, ObservationResult};
use crate::time::parse_timestamp;
use crate::units::SpeedUnit;

/// A single canonical wind reading.
///
/// Direction is in degrees `[0, 360)`, speed in m/s and never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindObservation {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub wind_direction: f64,
    pub wind_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl WindObservation {
    /// Build an observation, normalizing direction and clamping speed.
    pub fn new(
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        wind_direction: f64,
        wind_speed: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            wind_direction: normalize_degrees(wind_direction),
            wind_speed: wind_speed.max(0.0),
            confidence: None,
            source_id: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Confidence used for weighting; readings without one count fully.
    pub fn weight(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }
}

/// Timestamp as delivered by an ingestion adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Parsed(DateTime<Utc>),
    Epoch(f64),
    Text(String),
}

impl RawTimestamp {
    pub fn resolve(&self) -> ObservationResult<DateTime<Utc>> {
        match self {
            RawTimestamp::Parsed(dt) => Ok(*dt),
            RawTimestamp::Epoch(secs) => parse_timestamp(&secs.to_string()),
            RawTimestamp::Text(s) => parse_timestamp(s),
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        RawTimestamp::Parsed(dt)
    }
}

/// One record of a source series. Every field is optional so that records
/// with missing keys survive deserialization and can be rejected
/// individually.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<f64>,
    /// Speed in the series' unit.
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl RawRecord {
    /// Validate and convert into a canonical observation.
    pub fn to_observation(
        &self,
        unit: SpeedUnit,
        source_id: &str,
    ) -> ObservationResult<WindObservation> {
        let timestamp = self
            .timestamp
            .as_ref()
            .ok_or(ObservationError::MissingField("timestamp"))?
            .resolve()?;
        let latitude = require_finite("latitude", self.latitude)?;
        let longitude = require_finite("longitude", self.longitude)?;
        let direction = require_finite("wind_direction", self.wind_direction)?;
        let speed = require_finite("wind_speed", self.wind_speed)?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ObservationError::OutOfRange {
                field: "latitude",
                value: latitude,
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ObservationError::OutOfRange {
                field: "longitude",
                value: longitude,
            });
        }

        let mut obs = WindObservation::new(
            timestamp,
            latitude,
            longitude,
            direction,
            unit.to_mps(speed),
        )
        .with_source(source_id);
        if let Some(c) = self.confidence.filter(|c| c.is_finite()) {
            obs = obs.with_confidence(c);
        }
        Ok(obs)
    }
}

fn require_finite(field: &'static str, value: Option<f64>) -> ObservationResult<f64> {
    let v = value.ok_or(ObservationError::MissingField(field))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ObservationError::OutOfRange { field, value: v })
    }
}

/// Ordered records from one sensor, as produced by an ingestion adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSeries {
    pub source_id: String,
    /// Unit label for `wind_speed`, e.g. `"knots"` or `"m/s"`.
    pub speed_unit: String,
    pub records: Vec<RawRecord>,
}

impl SourceSeries {
    pub fn new(source_id: impl Into<String>, speed_unit: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            speed_unit: speed_unit.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: RawRecord) {
        self.records.push(record);
    }

    /// Resolve the series' speed unit.
    pub fn unit(&self) -> ObservationResult<SpeedUnit> {
        SpeedUnit::parse(&self.speed_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full_record() -> RawRecord {
        RawRecord {
            timestamp: Some(RawTimestamp::Text("2024-06-01T10:00:00Z".into())),
            latitude: Some(52.1),
            longitude: Some(4.3),
            wind_direction: Some(370.0),
            wind_speed: Some(10.0),
            confidence: Some(1.7),
        }
    }

    #[test]
    fn test_record_conversion() {
        let obs = full_record().to_observation(SpeedUnit::Knots, "boat-1").unwrap();
        assert_eq!(obs.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
        assert!((obs.wind_direction - 10.0).abs() < 1e-9);
        assert!((obs.wind_speed - 5.1444).abs() < 1e-9);
        assert_eq!(obs.confidence, Some(1.0));
        assert_eq!(obs.source_id.as_deref(), Some("boat-1"));
    }

    #[test]
    fn test_missing_field() {
        let mut rec = full_record();
        rec.longitude = None;
        assert_eq!(
            rec.to_observation(SpeedUnit::MetersPerSecond, "s"),
            Err(ObservationError::MissingField("longitude"))
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut rec = full_record();
        rec.timestamp = Some(RawTimestamp::Text("not a time".into()));
        assert!(matches!(
            rec.to_observation(SpeedUnit::MetersPerSecond, "s"),
            Err(ObservationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut rec = full_record();
        rec.latitude = Some(91.0);
        assert!(matches!(
            rec.to_observation(SpeedUnit::MetersPerSecond, "s"),
            Err(ObservationError::OutOfRange { field: "latitude", .. })
        ));
    }

    #[test]
    fn test_negative_speed_is_clamped() {
        let obs = WindObservation::new(Utc::now(), 0.0, 0.0, -90.0, -3.0);
        assert_eq!(obs.wind_speed, 0.0);
        assert_eq!(obs.wind_direction, 270.0);
    }

    #[test]
    fn test_series_from_json() {
        let json = r#"{
            "source_id": "buoy-7",
            "speed_unit": "knots",
            "records": [
                {"timestamp": "2024-06-01T10:00:00Z", "latitude": 52.0, "longitude": 4.0,
                 "wind_direction": 180.0, "wind_speed": 12.0},
                {"timestamp": 1717236060, "latitude": 52.001, "longitude": 4.0,
                 "wind_direction": 185.0, "wind_speed": 11.0, "confidence": 0.8},
                {"latitude": 52.002, "longitude": 4.0}
            ]
        }"#;
        let series: SourceSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.unit().unwrap(), SpeedUnit::Knots);
        assert_eq!(series.records.len(), 3);

        let first = series.records[0].to_observation(SpeedUnit::Knots, "buoy-7").unwrap();
        let second = series.records[1].to_observation(SpeedUnit::Knots, "buoy-7").unwrap();
        assert_eq!((second.timestamp - first.timestamp).num_seconds(), 60);
        assert!(series.records[2]
            .to_observation(SpeedUnit::Knots, "buoy-7")
            .is_err());
    }
}
