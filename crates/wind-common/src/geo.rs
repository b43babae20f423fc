//! Great-circle helpers on a spherical Earth.

use crate::circular::normalize_degrees;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance between two lat/lon points in meters (haversine formula).
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing from point 1 to point 2 in degrees `[0, 360)`.
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let x = delta_lon.sin() * lat2_rad.cos();
    let y = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    normalize_degrees(x.atan2(y).to_degrees())
}

/// Point reached by travelling `distance_m` from `(lat, lon)` on `bearing_deg`.
///
/// Returns `(lat, lon)` with longitude wrapped into `[-180, 180)`.
pub fn destination_point(lat: f64, lon: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    let lon2_deg = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (lat2.to_degrees(), lon2_deg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_latitude() {
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_distance_m(45.0, 7.0, 45.0, 7.0), 0.0);
    }

    #[test]
    fn test_bearings() {
        assert!((initial_bearing_deg(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((initial_bearing_deg(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((initial_bearing_deg(0.0, 0.0, -1.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((initial_bearing_deg(0.0, 0.0, 0.0, -1.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_destination_round_trip() {
        let (lat, lon) = destination_point(52.0, 4.0, 63.0, 1500.0);
        let d = haversine_distance_m(52.0, 4.0, lat, lon);
        let b = initial_bearing_deg(52.0, 4.0, lat, lon);
        assert!((d - 1500.0).abs() < 1e-6 * 1500.0);
        assert!((b - 63.0).abs() < 0.01);
    }

    #[test]
    fn test_destination_wraps_longitude() {
        let (_, lon) = destination_point(0.0, 179.99, 90.0, 5000.0);
        assert!(lon < -179.0);
    }
}
