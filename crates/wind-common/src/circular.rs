//! Circular quantities.
//!
//! Directions are defined modulo 360 degrees, so they are never averaged or
//! interpolated as plain scalars. Every operation decomposes a direction into
//! its `(sin, cos)` components, works linearly on those, and reconstructs the
//! angle with `atan2`.

use serde::{Deserialize, Serialize};

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Signed smallest rotation from `from` to `to`, in `(-180, 180]` degrees.
pub fn circular_difference(to: f64, from: f64) -> f64 {
    let diff = normalize_degrees(to - from);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Weighted circular mean of directions in degrees.
///
/// `weights` may be shorter than `directions`; missing weights count as 1.
/// Returns `None` when the resultant vector vanishes (empty input, zero
/// weights, or perfectly opposed directions).
pub fn circular_mean(directions: &[f64], weights: &[f64]) -> Option<f64> {
    let mut acc = CircularComponents::zero();
    for (i, &dir) in directions.iter().enumerate() {
        let w = weights.get(i).copied().unwrap_or(1.0);
        acc = acc.add(CircularComponents::from_degrees(dir).scale(w));
    }
    acc.try_to_degrees()
}

/// A direction decomposed into unit-circle components.
///
/// The components of a sum or blend are not normalized; `to_degrees` only
/// depends on their ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularComponents {
    pub sin: f64,
    pub cos: f64,
}

impl CircularComponents {
    pub fn new(sin: f64, cos: f64) -> Self {
        Self { sin, cos }
    }

    pub fn zero() -> Self {
        Self { sin: 0.0, cos: 0.0 }
    }

    /// Decompose a direction in degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        let rad = degrees.to_radians();
        Self {
            sin: rad.sin(),
            cos: rad.cos(),
        }
    }

    /// Reconstruct the direction in `[0, 360)`. A zero vector maps to 0.
    pub fn to_degrees(&self) -> f64 {
        self.try_to_degrees().unwrap_or(0.0)
    }

    /// Reconstruct the direction, or `None` if the vector has vanished.
    pub fn try_to_degrees(&self) -> Option<f64> {
        if self.magnitude() < 1e-12 {
            return None;
        }
        Some(normalize_degrees(self.sin.atan2(self.cos).to_degrees()))
    }

    /// Length of the component vector (1 for a single direction).
    pub fn magnitude(&self) -> f64 {
        self.sin.hypot(self.cos)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            sin: self.sin * factor,
            cos: self.cos * factor,
        }
    }

    pub fn add(&self, other: Self) -> Self {
        Self {
            sin: self.sin + other.sin,
            cos: self.cos + other.cos,
        }
    }

    /// Linear blend of components, `alpha = 0` gives `self`.
    pub fn lerp(&self, other: Self, alpha: f64) -> Self {
        self.scale(1.0 - alpha).add(other.scale(alpha))
    }
}
