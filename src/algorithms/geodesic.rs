//! Great-circle geometry on a spherical Earth
//!
//! Distances use the haversine formula with [`EARTH_RADIUS_M`]; intermediary
//! waypoints are produced by spherical linear interpolation between the two
//! leg anchors so every point sits on the great circle joining them.
//!
//! Endpoint policy: [`interpolate`] never emits `from` or `to`. A point
//! that would land within [`ENDPOINT_EPSILON_M`] of `to` is dropped too, so
//! consecutive legs never duplicate their shared anchor.

use crate::core::{
    GeoPoint, COINCIDENT_EPSILON_M, DEFAULT_WAYPOINT_SPACING_M, EARTH_RADIUS_M, ENDPOINT_EPSILON_M,
    MAX_WAYPOINTS_PER_LEG,
};
use log::warn;

/// Below this `sin(angle)` the two points are treated as antipodal
const ANTIPODAL_SIN_EPSILON: f64 = 1e-12;

/// Central angle between two points (radians), haversine form
pub fn central_angle(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt())
}

/// Great-circle distance in meters
pub fn distance_m(from: &GeoPoint, to: &GeoPoint) -> f64 {
    EARTH_RADIUS_M * central_angle(from, to)
}

/// Initial great-circle bearing from `from` towards `to`, degrees clockwise
/// from true north in [0, 360)
pub fn initial_bearing_deg(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let d_lon = (to.longitude() - from.longitude()).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Point reached by travelling `distance_m` along the great circle that
/// leaves `from` at `bearing_deg`
pub fn destination(from: &GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let lat1 = from.latitude().to_radians();
    let lon1 = from.longitude().to_radians();
    let bearing = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let lon2 = lon1
        + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint::wrapped(lat2.to_degrees(), lon2.to_degrees())
}

/// Intermediary waypoints from `from` to `to`, `spacing_m` apart
///
/// Point `k` (starting at 1) lies `k * spacing_m` meters from `from`. Each
/// point is computed from the two anchors alone, so no rounding error
/// builds up along long legs. At most [`MAX_WAYPOINTS_PER_LEG`] points are
/// returned; the rest of an over-long leg is left empty.
pub fn interpolate(from: &GeoPoint, to: &GeoPoint, spacing_m: f64) -> Vec<GeoPoint> {
    if !spacing_m.is_finite() || spacing_m <= 0.0 {
        warn!("Ignoring interpolation request with spacing {} m", spacing_m);
        return Vec::new();
    }

    let angle = central_angle(from, to);
    let total_m = EARTH_RADIUS_M * angle;
    if total_m < COINCIDENT_EPSILON_M {
        return Vec::new();
    }

    let a = from.to_unit_vector();
    let b = to.to_unit_vector();
    let sin_angle = angle.sin();
    let antipodal = sin_angle.abs() < ANTIPODAL_SIN_EPSILON;
    let bearing = initial_bearing_deg(from, to);

    let mut points = Vec::new();
    let mut k: u64 = 1;
    loop {
        let arc_m = k as f64 * spacing_m;
        if arc_m >= total_m - ENDPOINT_EPSILON_M {
            break;
        }
        if points.len() == MAX_WAYPOINTS_PER_LEG {
            warn!(
                "Leg of {:.0} m at {} m spacing truncated to {} waypoints",
                total_m, spacing_m, MAX_WAYPOINTS_PER_LEG
            );
            break;
        }

        let point = if antipodal {
            destination(from, bearing, arc_m)
        } else {
            let fraction = arc_m / total_m;
            let wa = ((1.0 - fraction) * angle).sin() / sin_angle;
            let wb = (fraction * angle).sin() / sin_angle;
            GeoPoint::from_unit_vector(&(a * wa + b * wb))
        };
        points.push(point);
        k += 1;
    }
    points
}

/// [`interpolate`] with the default waypoint spacing
pub fn interpolate_default(from: &GeoPoint, to: &GeoPoint) -> Vec<GeoPoint> {
    interpolate(from, to, DEFAULT_WAYPOINT_SPACING_M)
}
