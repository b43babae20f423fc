//! Common types and utilities shared across the wind fusion crates.

pub mod bbox;
pub mod circular;
pub mod error;
pub mod field;
pub mod geo;
pub mod grid;
pub mod observation;
pub mod time;
pub mod units;

pub use bbox::BoundingBox;
pub use circular::{circular_difference, circular_mean, normalize_degrees, CircularComponents};
pub use error::{ObservationError, ObservationResult};
pub use field::WindField;
pub use grid::GridSpec;
pub use observation::{RawRecord, SourceSeries, WindObservation};
pub use time::{minutes_between, parse_timestamp};
pub use units::SpeedUnit;
