//! Gridded wind fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::circular::normalize_degrees;
use crate::grid::GridSpec;
use crate::BoundingBox;

/// A snapshot of wind direction, speed and confidence over a regular grid.
///
/// All grids are row-major with `width * height` entries and share the
/// layout of [`GridSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindField {
    pub width: usize,
    pub height: usize,
    pub lat_grid: Vec<f64>,
    pub lon_grid: Vec<f64>,
    /// Degrees in `[0, 360)`
    pub wind_direction: Vec<f64>,
    /// Meters per second, never negative
    pub wind_speed: Vec<f64>,
    /// `[0, 1]`
    pub confidence: Vec<f64>,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub is_dummy: bool,
}

impl WindField {
    /// Build a field from per-cell values, enforcing the direction, speed and
    /// confidence invariants.
    pub fn from_cells(
        grid: &GridSpec,
        time: DateTime<Utc>,
        wind_direction: Vec<f64>,
        wind_speed: Vec<f64>,
        confidence: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(wind_direction.len(), grid.len());
        debug_assert_eq!(wind_speed.len(), grid.len());
        debug_assert_eq!(confidence.len(), grid.len());

        let (lat_grid, lon_grid) = grid.meshgrid();
        Self {
            width: grid.width,
            height: grid.height,
            lat_grid,
            lon_grid,
            wind_direction: wind_direction.into_iter().map(sanitize_direction).collect(),
            wind_speed: wind_speed.into_iter().map(sanitize_speed).collect(),
            confidence: confidence.into_iter().map(sanitize_confidence).collect(),
            time,
            is_dummy: false,
        }
    }

    /// A field with the same wind everywhere.
    pub fn uniform(
        grid: &GridSpec,
        time: DateTime<Utc>,
        direction: f64,
        speed: f64,
        confidence: f64,
    ) -> Self {
        let n = grid.len();
        Self::from_cells(
            grid,
            time,
            vec![direction; n],
            vec![speed; n],
            vec![confidence; n],
        )
    }

    pub fn mark_dummy(mut self) -> Self {
        self.is_dummy = true;
        self
    }

    /// Recover the grid specification from the coordinate grids.
    pub fn grid_spec(&self) -> GridSpec {
        let (min_lat, max_lat) = min_max(&self.lat_grid);
        let (min_lon, max_lon) = min_max(&self.lon_grid);
        GridSpec::new(
            BoundingBox::new(min_lon, min_lat, max_lon, max_lat),
            self.width,
            self.height,
        )
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values at a grid cell: `(direction, speed, confidence)`.
    pub fn get(&self, col: usize, row: usize) -> Option<(f64, f64, f64)> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row * self.width + col;
        Some((
            self.wind_direction[idx],
            self.wind_speed[idx],
            self.confidence[idx],
        ))
    }

    /// Values at the central cell, used for trend extraction.
    pub fn center_values(&self) -> Option<(f64, f64, f64)> {
        self.get(self.width / 2, self.height / 2)
    }

    pub fn mean_confidence(&self) -> f64 {
        if self.confidence.is_empty() {
            return 0.0;
        }
        self.confidence.iter().sum::<f64>() / self.confidence.len() as f64
    }

    /// Copy of this field stamped with a different time.
    pub fn retimed(&self, time: DateTime<Utc>) -> Self {
        let mut field = self.clone();
        field.time = time;
        field
    }
}

fn sanitize_direction(d: f64) -> f64 {
    if d.is_finite() {
        normalize_degrees(d)
    } else {
        0.0
    }
}

fn sanitize_speed(s: f64) -> f64 {
    if s.is_finite() {
        s.max(0.0)
    } else {
        0.0
    }
}

fn sanitize_confidence(c: f64) -> f64 {
    if c.is_finite() {
        c.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridSpec {
        GridSpec::new(BoundingBox::new(4.0, 52.0, 4.1, 52.05), 4, 3)
    }

    #[test]
    fn test_from_cells_enforces_invariants() {
        let g = grid();
        let n = g.len();
        let field = WindField::from_cells(
            &g,
            Utc::now(),
            vec![-30.0; n],
            vec![-1.0; n],
            vec![1.5; n],
        );
        assert!(field.wind_direction.iter().all(|&d| (d - 330.0).abs() < 1e-9));
        assert!(field.wind_speed.iter().all(|&s| s == 0.0));
        assert!(field.confidence.iter().all(|&c| c == 1.0));
        assert_eq!(field.shape(), (3, 4));
    }

    #[test]
    fn test_grid_spec_round_trip() {
        let g = grid();
        let field = WindField::uniform(&g, Utc::now(), 90.0, 3.0, 0.5);
        let recovered = field.grid_spec();
        assert_eq!(recovered.width, 4);
        assert_eq!(recovered.height, 3);
        assert!((recovered.bbox.min_lon - 4.0).abs() < 1e-12);
        assert!((recovered.bbox.max_lat - 52.05).abs() < 1e-12);
    }

    #[test]
    fn test_center_values() {
        let field = WindField::uniform(&grid(), Utc::now(), 45.0, 7.0, 0.9);
        assert_eq!(field.center_values(), Some((45.0, 7.0, 0.9)));
        assert!(field.get(4, 0).is_none());
    }

    #[test]
    fn test_serializes_for_collaborators() {
        let field = WindField::uniform(&grid(), Utc::now(), 45.0, 7.0, 0.9).mark_dummy();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["is_dummy"], true);
        assert_eq!(json["wind_speed"].as_array().unwrap().len(), 12);
    }
}
