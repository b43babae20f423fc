//! Regular lat/lon grid specifications.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Specification of a regular lat/lon grid covering a bounding box.
///
/// Cells are stored row-major; row 0 is the southern edge and column 0 the
/// western edge. Grid points sit on the box edges, so a `width x height`
/// grid has spacing `bbox.width() / (width - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub bbox: BoundingBox,
    /// Number of points in X (longitude) direction
    pub width: usize,
    /// Number of points in Y (latitude) direction
    pub height: usize,
}

impl GridSpec {
    /// Create a new grid specification. Dimensions are raised to at least 1.
    pub fn new(bbox: BoundingBox, width: usize, height: usize) -> Self {
        Self {
            bbox,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Square grid with `resolution` points per axis.
    pub fn square(bbox: BoundingBox, resolution: usize) -> Self {
        Self::new(bbox, resolution, resolution)
    }

    /// Longitude spacing between adjacent columns.
    pub fn dx(&self) -> f64 {
        if self.width > 1 {
            self.bbox.width() / (self.width - 1) as f64
        } else {
            0.0
        }
    }

    /// Latitude spacing between adjacent rows.
    pub fn dy(&self) -> f64 {
        if self.height > 1 {
            self.bbox.height() / (self.height - 1) as f64
        } else {
            0.0
        }
    }

    /// Coordinates `(lat, lon)` of grid point `(col, row)`.
    ///
    /// A single-point axis sits at the box center.
    pub fn coord(&self, col: usize, row: usize) -> (f64, f64) {
        let (center_lon, center_lat) = self.bbox.center();
        let lon = if self.width > 1 {
            self.bbox.min_lon + col as f64 * self.dx()
        } else {
            center_lon
        };
        let lat = if self.height > 1 {
            self.bbox.min_lat + row as f64 * self.dy()
        } else {
            center_lat
        };
        (lat, lon)
    }

    /// Fractional `(col, row)` position of a coordinate, unclamped.
    pub fn fractional_index(&self, lat: f64, lon: f64) -> (f64, f64) {
        let fx = if self.width > 1 && self.dx() > 0.0 {
            (lon - self.bbox.min_lon) / self.dx()
        } else {
            0.0
        };
        let fy = if self.height > 1 && self.dy() > 0.0 {
            (lat - self.bbox.min_lat) / self.dy()
        } else {
            0.0
        };
        (fx, fy)
    }

    /// Get the 1D array index for a 2D grid position.
    pub fn flat_index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Inverse of [`flat_index`](Self::flat_index).
    pub fn col_row(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Latitude and longitude meshgrids, row-major.
    pub fn meshgrid(&self) -> (Vec<f64>, Vec<f64>) {
        let mut lats = Vec::with_capacity(self.len());
        let mut lons = Vec::with_capacity(self.len());
        for row in 0..self.height {
            for col in 0..self.width {
                let (lat, lon) = self.coord(col, row);
                lats.push(lat);
                lons.push(lon);
            }
        }
        (lats, lons)
    }

    /// Index of the central cell.
    pub fn center_index(&self) -> usize {
        self.flat_index(self.width / 2, self.height / 2)
    }

    /// Same box, different resolution.
    pub fn with_resolution(&self, width: usize, height: usize) -> Self {
        Self::new(self.bbox, width, height)
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
