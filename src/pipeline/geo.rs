//! Spherical geometry helpers. Angles are degrees, distances kilometres.

/// Mean Earth radius in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// One nautical mile in km.
pub const KM_PER_NM: f64 = 1.852;

/// Great-circle distance between two points (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from point 1 to point 2, in [0, 360).
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();
    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Point at fraction `f` of the way along the great circle from 1 to 2.
///
/// Falls back to the start point when the two points coincide; antipodal
/// inputs have no unique path and are interpolated linearly.
pub fn intermediate_point(lat1: f64, lon1: f64, lat2: f64, lon2: f64, f: f64) -> (f64, f64) {
    let (phi1, lambda1) = (lat1.to_radians(), lon1.to_radians());
    let (phi2, lambda2) = (lat2.to_radians(), lon2.to_radians());

    let delta = haversine_km(lat1, lon1, lat2, lon2) / EARTH_RADIUS_KM;
    if delta < 1e-12 {
        return (lat1, lon1);
    }
    let sin_delta = delta.sin();
    if sin_delta.abs() < 1e-12 {
        return (lat1 + (lat2 - lat1) * f, wrap_longitude(lon1 + (lon2 - lon1) * f));
    }

    let a = ((1.0 - f) * delta).sin() / sin_delta;
    let b = (f * delta).sin() / sin_delta;

    let x = a * phi1.cos() * lambda1.cos() + b * phi2.cos() * lambda2.cos();
    let y = a * phi1.cos() * lambda1.sin() + b * phi2.cos() * lambda2.sin();
    let z = a * phi1.sin() + b * phi2.sin();

    let lat = z.atan2((x * x + y * y).sqrt()).to_degrees();
    let lon = y.atan2(x).to_degrees();
    (lat, wrap_longitude(lon))
}

/// Maps any angle into [0, 360).
pub fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// Signed shortest rotation from `from` to `to`, in (-180, 180].
pub fn angle_difference(from: f64, to: f64) -> f64 {
    let d = normalize_degrees(to - from);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Interpolates a heading along the shorter arc.
pub fn interpolate_course(from: f64, to: f64, f: f64) -> f64 {
    normalize_degrees(from + angle_difference(from, to) * f)
}

/// Maps a longitude into [-180, 180].
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_at_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.195).abs() < 0.01);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        assert_eq!(haversine_km(42.0, -71.0, 42.0, -71.0), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert!((initial_bearing(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((initial_bearing(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((initial_bearing(1.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((initial_bearing(0.0, 1.0, 0.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_intermediate_point_midpoint_on_equator() {
        let (lat, lon) = intermediate_point(0.0, 0.0, 0.0, 1.0, 0.5);
        assert!(lat.abs() < 1e-9);
        assert!((lon - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_intermediate_point_crosses_antimeridian() {
        let (lat, lon) = intermediate_point(0.0, 179.5, 0.0, -179.5, 0.5);
        assert!(lat.abs() < 1e-9);
        assert!((lon.abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_intermediate_point_distance_is_proportional() {
        let (a_lat, a_lon, b_lat, b_lon) = (10.0, 20.0, 12.0, 25.0);
        let total = haversine_km(a_lat, a_lon, b_lat, b_lon);
        let (lat, lon) = intermediate_point(a_lat, a_lon, b_lat, b_lon, 0.3);
        let d1 = haversine_km(a_lat, a_lon, lat, lon);
        let d2 = haversine_km(lat, lon, b_lat, b_lon);

        assert!((d1 - 0.3 * total).abs() < 1e-6);
        assert!((d1 + d2 - total).abs() < 1e-6);
    }

    #[test]
    fn test_interpolate_course_wraps_through_north() {
        assert!((interpolate_course(350.0, 10.0, 0.5) - 0.0).abs() < 1e-9);
        assert!((interpolate_course(10.0, 350.0, 0.25) - 5.0).abs() < 1e-9);
        assert!((interpolate_course(90.0, 180.0, 0.5) - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_difference_range() {
        assert_eq!(angle_difference(0.0, 180.0), 180.0);
        assert_eq!(angle_difference(10.0, 350.0), -20.0);
        assert_eq!(angle_difference(350.0, 10.0), 20.0);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
    }
}
