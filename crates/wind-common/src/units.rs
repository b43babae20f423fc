//! Wind speed units.

use serde::{Deserialize, Serialize};

use crate::error::ObservationError;

/// Meters per second in one knot.
pub const KNOTS_TO_MPS: f64 = 0.51444;
/// Meters per second in one km/h.
pub const KMH_TO_MPS: f64 = 1.0 / 3.6;
/// Meters per second in one mile per hour.
pub const MPH_TO_MPS: f64 = 0.44704;

/// Units a source may report wind speed in. Everything is stored as m/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnit {
    #[default]
    MetersPerSecond,
    Knots,
    KilometersPerHour,
    MilesPerHour,
}

impl SpeedUnit {
    /// Parse a unit label (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, ObservationError> {
        match s.trim().to_lowercase().as_str() {
            "m/s" | "mps" | "ms" | "meters_per_second" => Ok(Self::MetersPerSecond),
            "kt" | "kts" | "knot" | "knots" => Ok(Self::Knots),
            "km/h" | "kmh" | "kph" | "kilometers_per_hour" => Ok(Self::KilometersPerHour),
            "mph" | "miles_per_hour" => Ok(Self::MilesPerHour),
            _ => Err(ObservationError::UnsupportedUnit(s.to_string())),
        }
    }

    /// Conversion factor into meters per second.
    pub fn to_mps_factor(&self) -> f64 {
        match self {
            Self::MetersPerSecond => 1.0,
            Self::Knots => KNOTS_TO_MPS,
            Self::KilometersPerHour => KMH_TO_MPS,
            Self::MilesPerHour => MPH_TO_MPS,
        }
    }

    /// Convert a speed in this unit to m/s.
    pub fn to_mps(&self, value: f64) -> f64 {
        value * self.to_mps_factor()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetersPerSecond => "m/s",
            Self::Knots => "knots",
            Self::KilometersPerHour => "km/h",
            Self::MilesPerHour => "mph",
        }
    }
}

impl std::fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(SpeedUnit::parse("knots").unwrap(), SpeedUnit::Knots);
        assert_eq!(SpeedUnit::parse("KT").unwrap(), SpeedUnit::Knots);
        assert_eq!(SpeedUnit::parse("m/s").unwrap(), SpeedUnit::MetersPerSecond);
        assert_eq!(SpeedUnit::parse(" km/h ").unwrap(), SpeedUnit::KilometersPerHour);
        assert!(matches!(
            SpeedUnit::parse("furlongs/fortnight"),
            Err(ObservationError::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn test_knots_conversion() {
        assert!((SpeedUnit::Knots.to_mps(10.0) - 5.1444).abs() < 1e-9);
        assert!((SpeedUnit::KilometersPerHour.to_mps(36.0) - 10.0).abs() < 1e-9);
    }
}
