//! Geographic bounding box types and operations.

use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (mean).
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A geographic bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Smallest box containing every `(lat, lon)` position.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_positions<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = positions.into_iter();
        let (lat, lon) = iter.next()?;
        let mut bbox = Self::new(lon, lat, lon, lat);
        for (lat, lon) in iter {
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lat = bbox.max_lat.max(lat);
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.max_lon = bbox.max_lon.max(lon);
        }
        Some(bbox)
    }

    /// Get the width in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Get the height in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Get the center point of the bounding box as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Expand the bounding box by a buffer amount (in degrees).
    pub fn expand(&self, buffer: f64) -> Self {
        Self {
            min_lon: self.min_lon - buffer,
            min_lat: self.min_lat - buffer,
            max_lon: self.max_lon + buffer,
            max_lat: self.max_lat + buffer,
        }
    }

    /// Symmetrically pad each axis so it spans at least `min_span_m` meters.
    ///
    /// Longitude degrees are converted at the box's central latitude.
    pub fn pad_to_min_span(&self, min_span_m: f64) -> Self {
        let (center_lon, center_lat) = self.center();
        let min_lat_span = min_span_m / METERS_PER_DEGREE_LAT;
        let cos_lat = center_lat.to_radians().cos().abs().max(1e-6);
        let min_lon_span = min_span_m / (METERS_PER_DEGREE_LAT * cos_lat);

        let mut padded = *self;
        if self.height() < min_lat_span {
            padded.min_lat = center_lat - min_lat_span / 2.0;
            padded.max_lat = center_lat + min_lat_span / 2.0;
        }
        if self.width() < min_lon_span {
            padded.min_lon = center_lon - min_lon_span / 2.0;
            padded.max_lon = center_lon + min_lon_span / 2.0;
        }
        padded
    }

    /// Clamp this bounding box to valid geographic coordinates.
    pub fn clamp_to_valid(&self) -> Self {
        Self {
            min_lon: self.min_lon.clamp(-180.0, 180.0),
            min_lat: self.min_lat.clamp(-90.0, 90.0),
            max_lon: self.max_lon.clamp(-180.0, 180.0),
            max_lat: self.max_lat.clamp(-90.0, 90.0),
        }
    }
}

impl Default for BoundingBox {
    /// A ~4 km box used when no observation has been seen yet.
    fn default() -> Self {
        Self::new(-0.02, -0.02, 0.02, 0.02)
    }
}
