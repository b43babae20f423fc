//! Resampling of wind fields between grids.
//!
//! Each grid cell is split into two triangles and values are interpolated
//! linearly with barycentric weights. Directions are blended as sin/cos
//! components so that 350° and 10° average to 0°, not 180°. Target points
//! outside the source grid are filled from the nearest source cell.

use rayon::prelude::*;
use wind_common::{CircularComponents, GridSpec, WindField};

/// One interpolated sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    pub direction: f64,
    pub speed: f64,
    pub confidence: f64,
}

const HULL_EPS: f64 = 1e-9;

/// Triangle-linear interpolation of `field` at a position.
///
/// Returns `None` outside the source grid.
pub fn linear_sample(
    field: &WindField,
    grid: &GridSpec,
    lat: f64,
    lon: f64,
) -> Option<FieldSample> {
    let (fx, fy) = grid.fractional_index(lat, lon);
    let max_x = (field.width - 1) as f64;
    let max_y = (field.height - 1) as f64;
    if !fx.is_finite() || !fy.is_finite() {
        return None;
    }
    if fx < -HULL_EPS || fy < -HULL_EPS || fx > max_x + HULL_EPS || fy > max_y + HULL_EPS {
        return None;
    }
    let fx = fx.clamp(0.0, max_x);
    let fy = fy.clamp(0.0, max_y);

    let x0 = (fx.floor() as usize).min(field.width.saturating_sub(2));
    let y0 = (fy.floor() as usize).min(field.height.saturating_sub(2));
    let x1 = (x0 + 1).min(field.width - 1);
    let y1 = (y0 + 1).min(field.height - 1);
    let u = if x1 > x0 { fx - x0 as f64 } else { 0.0 };
    let v = if y1 > y0 { fy - y0 as f64 } else { 0.0 };

    // lower-left triangle (00, 10, 01) or upper-right (11, 01, 10)
    let corners = if u + v <= 1.0 {
        [((x0, y0), 1.0 - u - v), ((x1, y0), u), ((x0, y1), v)]
    } else {
        [((x1, y1), u + v - 1.0), ((x0, y1), 1.0 - u), ((x1, y0), 1.0 - v)]
    };

    let mut components = CircularComponents::zero();
    let mut speed = 0.0;
    let mut confidence = 0.0;
    for ((col, row), w) in corners {
        let (d, s, c) = field.get(col, row)?;
        components = components.add(CircularComponents::from_degrees(d).scale(w));
        speed += s * w;
        confidence += c * w;
    }

    Some(FieldSample {
        direction: components.to_degrees(),
        speed,
        confidence,
    })
}

/// Value of the source cell closest to a position.
pub fn nearest_sample(
    field: &WindField,
    grid: &GridSpec,
    lat: f64,
    lon: f64,
) -> Option<FieldSample> {
    let (fx, fy) = grid.fractional_index(lat, lon);
    if field.is_empty() || !fx.is_finite() || !fy.is_finite() {
        return None;
    }
    let col = fx.round().clamp(0.0, (field.width - 1) as f64) as usize;
    let row = fy.round().clamp(0.0, (field.height - 1) as f64) as usize;
    let (direction, speed, confidence) = field.get(col, row)?;
    Some(FieldSample {
        direction,
        speed,
        confidence,
    })
}

/// Interpolated value of `field` at a position, nearest-cell outside the grid.
pub fn sample_field_at(field: &WindField, lat: f64, lon: f64) -> Option<FieldSample> {
    let grid = field.grid_spec();
    linear_sample(field, &grid, lat, lon).or_else(|| nearest_sample(field, &grid, lat, lon))
}

/// Resample `field` onto `target`, keeping its time and dummy flag.
pub fn resample_field(field: &WindField, target: &GridSpec) -> WindField {
    let source = field.grid_spec();
    if source == *target {
        return field.clone();
    }

    let samples: Vec<FieldSample> = (0..target.len())
        .into_par_iter()
        .map(|idx| {
            let (col, row) = target.col_row(idx);
            let (lat, lon) = target.coord(col, row);
            linear_sample(field, &source, lat, lon)
                .or_else(|| nearest_sample(field, &source, lat, lon))
                .unwrap_or(FieldSample {
                    direction: 0.0,
                    speed: 0.0,
                    confidence: 0.0,
                })
        })
        .collect();

    let mut out = WindField::from_cells(
        target,
        field.time,
        samples.iter().map(|s| s.direction).collect(),
        samples.iter().map(|s| s.speed).collect(),
        samples.iter().map(|s| s.confidence).collect(),
    );
    out.is_dummy = field.is_dummy;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wind_common::BoundingBox;

    fn grid(n: usize) -> GridSpec {
        GridSpec::square(BoundingBox::new(0.0, 0.0, 1.0, 1.0), n)
    }

    fn field_2x2(dirs: [f64; 4], speeds: [f64; 4]) -> WindField {
        WindField::from_cells(&grid(2), Utc::now(), dirs.to_vec(), speeds.to_vec(), vec![1.0; 4])
    }

    #[test]
    fn test_corners_are_exact() {
        let f = field_2x2([10.0, 20.0, 30.0, 40.0], [1.0, 2.0, 3.0, 4.0]);
        let g = f.grid_spec();
        for row in 0..2 {
            for col in 0..2 {
                let (lat, lon) = g.coord(col, row);
                let s = linear_sample(&f, &g, lat, lon).unwrap();
                let (d, sp, _) = f.get(col, row).unwrap();
                assert!((s.speed - sp).abs() < 1e-9);
                assert!((s.direction - d).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_speed_is_linear_inside_triangle() {
        let f = field_2x2([0.0; 4], [0.0, 2.0, 4.0, 6.0]);
        let g = f.grid_spec();
        // center of the cell lies on the shared diagonal
        let s = linear_sample(&f, &g, 0.5, 0.5).unwrap();
        assert!((s.speed - 3.0).abs() < 1e-9);
        let s = linear_sample(&f, &g, 0.25, 0.25).unwrap();
        assert!((s.speed - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_direction_wraps_through_north() {
        let f = field_2x2([350.0, 10.0, 350.0, 10.0], [5.0; 4]);
        let g = f.grid_spec();
        let s = linear_sample(&f, &g, 0.0, 0.5).unwrap();
        assert!(s.direction < 1e-6 || s.direction > 360.0 - 1e-6);
    }

    #[test]
    fn test_outside_uses_nearest() {
        let f = field_2x2([10.0, 20.0, 30.0, 40.0], [1.0, 2.0, 3.0, 4.0]);
        let g = f.grid_spec();
        assert!(linear_sample(&f, &g, 5.0, 5.0).is_none());
        let s = sample_field_at(&f, 5.0, 5.0).unwrap();
        assert_eq!(s.speed, 4.0);
        let s = sample_field_at(&f, -3.0, -3.0).unwrap();
        assert_eq!(s.speed, 1.0);
    }

    #[test]
    fn test_resample_upsamples_and_keeps_flags() {
        let f = field_2x2([90.0; 4], [1.0, 1.0, 3.0, 3.0]).mark_dummy();
        let out = resample_field(&f, &grid(5));
        assert_eq!(out.shape(), (5, 5));
        assert!(out.is_dummy);
        assert_eq!(out.time, f.time);
        // speed grows linearly from south row to north row
        assert!((out.get(2, 2).unwrap().1 - 2.0).abs() < 1e-9);
        assert!(out.wind_direction.iter().all(|d| (d - 90.0).abs() < 1e-6));
    }

    #[test]
    fn test_resample_to_larger_extent_backfills() {
        let f = field_2x2([45.0; 4], [2.0; 4]);
        let target = GridSpec::square(BoundingBox::new(-1.0, -1.0, 2.0, 2.0), 4);
        let out = resample_field(&f, &target);
        assert!(out.wind_speed.iter().all(|s| (s - 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_single_cell_field() {
        let g = GridSpec::square(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1);
        let f = WindField::uniform(&g, Utc::now(), 270.0, 7.0, 0.5);
        let s = sample_field_at(&f, 0.3, 0.9).unwrap();
        assert_eq!(s.speed, 7.0);
    }
}
