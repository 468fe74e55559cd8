//! Great-circle math on a spherical earth.
//!
//! Bearings are degrees clockwise from true north. Every inverse-trig
//! argument is clamped so floating point overshoot never turns into NaN.

use crate::models::Waypoint;
use std::f64::consts::PI;

/// Mean earth radius used by every distance in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two waypoints in meters.
pub fn distance(p1: &Waypoint, p2: &Waypoint) -> f64 {
    haversine_distance(p1.lat, p1.lon, p2.lat, p2.lon)
}

/// Initial bearing from `p1` towards `p2`, in [0, 360).
pub fn initial_bearing(p1: &Waypoint, p2: &Waypoint) -> f64 {
    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let delta_lambda = (p2.lon - p1.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_course(x.atan2(y).to_degrees())
}

/// Bearing on arrival at `p2` when travelling the great circle from `p1`.
pub fn final_bearing(p1: &Waypoint, p2: &Waypoint) -> f64 {
    normalize_course(initial_bearing(p2, p1) + 180.0)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters, negative travels the reciprocal bearing
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = wrap_longitude_rad(lon1 + y.atan2(x));

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Destination reached from `p` after `distance_m` on `bearing_deg`.
///
/// The result carries no identifier; it is a derived point.
pub fn destination(p: &Waypoint, distance_m: f64, bearing_deg: f64) -> Waypoint {
    let (lat, lon) = offset_by_bearing(p.lat, p.lon, distance_m, bearing_deg.to_radians());
    Waypoint::new(lat, lon)
}

/// Point at `fraction` (0..=1) of the great circle from `p1` to `p2`.
pub fn intermediate_point(p1: &Waypoint, p2: &Waypoint, fraction: f64) -> Waypoint {
    if fraction <= 0.0 {
        return Waypoint::new(p1.lat, p1.lon);
    }
    if fraction >= 1.0 {
        return Waypoint::new(p2.lat, p2.lon);
    }

    let delta = distance(p1, p2) / EARTH_RADIUS_M;
    if delta <= 1e-15 {
        return Waypoint::new(p1.lat, p1.lon);
    }

    let phi1 = p1.lat.to_radians();
    let lambda1 = p1.lon.to_radians();
    let phi2 = p2.lat.to_radians();
    let lambda2 = p2.lon.to_radians();

    let a = ((1.0 - fraction) * delta).sin() / delta.sin();
    let b = (fraction * delta).sin() / delta.sin();

    let x = a * phi1.cos() * lambda1.cos() + b * phi2.cos() * lambda2.cos();
    let y = a * phi1.cos() * lambda1.sin() + b * phi2.cos() * lambda2.sin();
    let z = a * phi1.sin() + b * phi2.sin();

    let phi = z.atan2((x * x + y * y).sqrt());
    let lambda = y.atan2(x);

    Waypoint::new(phi.to_degrees(), lambda.to_degrees())
}

/// Intersection of two great-circle tracks.
///
/// Track 1 leaves `p1` on `bearing1_deg`, track 2 leaves `p2` on
/// `bearing2_deg`. Returns `None` when the tracks are parallel or
/// coincident, and when the two rays diverge to opposite sides of the
/// `p1`→`p2` baseline so no unique forward intersection exists.
pub fn intersection(
    p1: &Waypoint,
    bearing1_deg: f64,
    p2: &Waypoint,
    bearing2_deg: f64,
) -> Option<Waypoint> {
    let phi1 = p1.lat.to_radians();
    let lambda1 = p1.lon.to_radians();
    let phi2 = p2.lat.to_radians();
    let lambda2 = p2.lon.to_radians();
    let theta13 = bearing1_deg.to_radians();
    let theta23 = bearing2_deg.to_radians();

    let delta_phi = phi2 - phi1;
    let delta_lambda = lambda2 - lambda1;

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let delta12 = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    if delta12.abs() < 1e-15 {
        return Some(Waypoint::new(p1.lat, p1.lon));
    }

    let cos_theta_a = (phi2.sin() - phi1.sin() * delta12.cos()) / (delta12.sin() * phi1.cos());
    let cos_theta_b = (phi1.sin() - phi2.sin() * delta12.cos()) / (delta12.sin() * phi2.cos());
    let theta_a = cos_theta_a.clamp(-1.0, 1.0).acos();
    let theta_b = cos_theta_b.clamp(-1.0, 1.0).acos();

    let (theta12, theta21) = if delta_lambda.sin() > 0.0 {
        (theta_a, 2.0 * PI - theta_b)
    } else {
        (2.0 * PI - theta_a, theta_b)
    };

    let alpha1 = theta13 - theta12;
    let alpha2 = theta21 - theta23;

    if alpha1.sin().abs() < 1e-12 && alpha2.sin().abs() < 1e-12 {
        return None;
    }
    if alpha1.sin() * alpha2.sin() < 0.0 {
        return None;
    }

    let cos_alpha3 =
        -alpha1.cos() * alpha2.cos() + alpha1.sin() * alpha2.sin() * delta12.cos();
    let delta13 = (delta12.sin() * alpha1.sin() * alpha2.sin())
        .atan2(alpha2.cos() + alpha1.cos() * cos_alpha3);

    let sin_phi3 = phi1.sin() * delta13.cos() + phi1.cos() * delta13.sin() * theta13.cos();
    let phi3 = sin_phi3.clamp(-1.0, 1.0).asin();
    let delta_lambda13 = (theta13.sin() * delta13.sin() * phi1.cos())
        .atan2(delta13.cos() - phi1.sin() * phi3.sin());
    let lambda3 = wrap_longitude_rad(lambda1 + delta_lambda13);

    Some(Waypoint::new(phi3.to_degrees(), lambda3.to_degrees()))
}

/// Signed cross-track distance of `p` from the great circle `start`→`end`.
///
/// Positive when `p` lies to the right of the direction of travel.
pub fn cross_track_distance(p: &Waypoint, start: &Waypoint, end: &Waypoint) -> f64 {
    let delta13 = distance(start, p) / EARTH_RADIUS_M;
    let theta13 = initial_bearing(start, p).to_radians();
    let theta12 = initial_bearing(start, end).to_radians();
    let x = (delta13.sin() * (theta13 - theta12).sin()).clamp(-1.0, 1.0);
    x.asin() * EARTH_RADIUS_M
}

/// Distance from `start` to the foot of the perpendicular from `p` on the
/// great circle `start`→`end`. Negative when the foot lies behind `start`.
pub fn along_track_distance(p: &Waypoint, start: &Waypoint, end: &Waypoint) -> f64 {
    let delta13 = distance(start, p) / EARTH_RADIUS_M;
    let theta13 = initial_bearing(start, p).to_radians();
    let theta12 = initial_bearing(start, end).to_radians();
    // Right spherical triangle: tan(along) = tan(delta13) cos(theta13 - theta12)
    (delta13.sin() * (theta13 - theta12).cos()).atan2(delta13.cos()) * EARTH_RADIUS_M
}

/// Signed course change from `from_deg` to `to_deg`, wrapped to (-180, 180].
///
/// Positive values are right (clockwise) turns.
pub fn course_change(from_deg: f64, to_deg: f64) -> f64 {
    let mut delta = (to_deg - from_deg).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Apply `delta_deg` to `course_deg`, wrapping into [0, 360).
pub fn new_course(course_deg: f64, delta_deg: f64) -> f64 {
    normalize_course(course_deg + delta_deg)
}

/// Wrap any course into [0, 360).
pub fn normalize_course(course_deg: f64) -> f64 {
    let course = course_deg.rem_euclid(360.0);
    if course >= 360.0 {
        0.0
    } else {
        course
    }
}

fn wrap_longitude_rad(lon: f64) -> f64 {
    (lon + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(33.6846, -117.8265, 33.6846, -117.8265);
        assert!(dist < 0.001);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Waypoint::new(0.0, 0.0);
        assert_close(initial_bearing(&origin, &Waypoint::new(1.0, 0.0)), 0.0, 1e-9);
        assert_close(initial_bearing(&origin, &Waypoint::new(0.0, 1.0)), 90.0, 1e-9);
        assert_close(initial_bearing(&origin, &Waypoint::new(-1.0, 0.0)), 180.0, 1e-9);
        assert_close(initial_bearing(&origin, &Waypoint::new(0.0, -1.0)), 270.0, 1e-9);
    }

    #[test]
    fn destination_inverts_distance_and_bearing() {
        let start = Waypoint::new(47.45, -122.31);
        let end = destination(&start, 12_345.0, 63.0);
        assert_close(distance(&start, &end), 12_345.0, 1e-6);
        assert_close(initial_bearing(&start, &end), 63.0, 1e-9);
    }

    #[test]
    fn destination_crosses_antimeridian() {
        let start = Waypoint::new(10.0, 179.999);
        let end = destination(&start, 1_000.0, 90.0);
        assert!(end.lon < -179.9, "expected wrapped longitude, got {}", end.lon);
        assert_close(distance(&start, &end), 1_000.0, 1e-6);
    }

    #[test]
    fn intermediate_point_halves_distance() {
        let a = Waypoint::new(33.0, -117.0);
        let b = Waypoint::new(33.5, -116.5);
        let mid = intermediate_point(&a, &b, 0.5);
        assert_close(distance(&a, &mid), distance(&mid, &b), 1e-6);
    }

    #[test]
    fn intersection_of_perpendicular_tracks() {
        let west = Waypoint::new(0.0, -0.01);
        let south = Waypoint::new(-0.01, 0.0);
        let x = intersection(&west, 90.0, &south, 0.0).expect("tracks cross");
        assert_close(x.lat, 0.0, 1e-9);
        assert_close(x.lon, 0.0, 1e-9);
    }

    #[test]
    fn intersection_rejects_diverging_tracks() {
        let west = Waypoint::new(0.0, -0.01);
        let south = Waypoint::new(-0.01, 0.0);
        // Track 1 heads away from the baseline side track 2 heads into.
        assert!(intersection(&west, 270.0, &south, 0.0).is_none());
    }

    #[test]
    fn intersection_rejects_coincident_tracks() {
        let a = Waypoint::new(0.0, 0.0);
        let b = Waypoint::new(0.0, 0.01);
        assert!(intersection(&a, 90.0, &b, 90.0).is_none());
    }

    #[test]
    fn course_change_takes_smaller_rotation() {
        assert_close(course_change(350.0, 10.0), 20.0, 1e-12);
        assert_close(course_change(10.0, 350.0), -20.0, 1e-12);
        assert_close(course_change(0.0, 180.0), 180.0, 1e-12);
        assert_close(course_change(180.0, 0.0), 180.0, 1e-12);
        assert_close(course_change(90.0, 90.0), 0.0, 1e-12);
    }

    #[test]
    fn new_course_wraps() {
        assert_close(new_course(350.0, 20.0), 10.0, 1e-12);
        assert_close(new_course(10.0, -20.0), 350.0, 1e-12);
        assert_close(new_course(0.0, 360.0), 0.0, 1e-12);
    }

    #[test]
    fn cross_and_along_track() {
        let start = Waypoint::new(0.0, 0.0);
        let end = Waypoint::new(0.0, 0.1);
        let north_of_track = destination(&destination(&start, 5_000.0, 90.0), 300.0, 0.0);
        assert_close(cross_track_distance(&north_of_track, &start, &end), -300.0, 0.01);
        assert_close(along_track_distance(&north_of_track, &start, &end), 5_000.0, 0.01);

        let behind = destination(&start, 200.0, 270.0);
        assert!(along_track_distance(&behind, &start, &end) < -199.0);
    }
}
