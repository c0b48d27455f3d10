//! Core data types for route placement

use crate::core::error::{GeoError, GeoResult};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic position in decimal degrees
///
/// Latitude is always within [-90, 90] and longitude within [-180, 180];
/// the only ways to build one validate that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawGeoPoint) -> GeoResult<Self> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Create a point, rejecting out-of-range or non-finite coordinates
    pub fn new(latitude: f64, longitude: f64) -> GeoResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude { value: latitude });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude { value: longitude });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Build from computed degrees, clamping latitude and wrapping longitude
    pub(crate) fn wrapped(latitude: f64, longitude: f64) -> Self {
        let longitude = (longitude + 180.0).rem_euclid(360.0) - 180.0;
        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude,
        }
    }

    /// Unit vector on the sphere (x towards 0°N 0°E, z towards the north pole)
    pub fn to_unit_vector(&self) -> Vector3<f64> {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
    }

    /// Inverse of [`GeoPoint::to_unit_vector`]. The vector does not need to be
    /// normalized but must not be zero.
    pub fn from_unit_vector(v: &Vector3<f64>) -> Self {
        let n = v.normalize();
        let lat = n.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = n.y.atan2(n.x).to_degrees();
        Self {
            latitude: lat.clamp(-90.0, 90.0),
            longitude: lon.clamp(-180.0, 180.0),
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A single report from the location collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPositionFix")]
pub struct PositionFix {
    /// Reported position
    pub point: GeoPoint,
    /// Horizontal accuracy radius (meters, lower is better)
    pub horizontal_accuracy_m: f64,
    /// Capture time (milliseconds since epoch)
    pub timestamp_ms: u64,
}

#[derive(Deserialize)]
struct RawPositionFix {
    point: GeoPoint,
    horizontal_accuracy_m: f64,
    timestamp_ms: u64,
}

impl TryFrom<RawPositionFix> for PositionFix {
    type Error = GeoError;

    fn try_from(raw: RawPositionFix) -> GeoResult<Self> {
        PositionFix::new(raw.point, raw.horizontal_accuracy_m, raw.timestamp_ms)
    }
}

impl PositionFix {
    pub fn new(point: GeoPoint, horizontal_accuracy_m: f64, timestamp_ms: u64) -> GeoResult<Self> {
        if !horizontal_accuracy_m.is_finite() || horizontal_accuracy_m < 0.0 {
            return Err(GeoError::InvalidAccuracy { value: horizontal_accuracy_m });
        }
        Ok(Self {
            point,
            horizontal_accuracy_m,
            timestamp_ms,
        })
    }
}

/// One instruction of a route, anchored at the point where its leg ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Human readable instruction ("Turn left onto ...")
    pub instruction: String,
    /// End point of the leg leading to this step
    pub point: GeoPoint,
    /// Position of the step within its route
    pub index: usize,
}

impl RouteStep {
    pub fn new(instruction: impl Into<String>, point: GeoPoint, index: usize) -> Self {
        Self {
            instruction: instruction.into(),
            point,
            index,
        }
    }
}

/// Intermediary waypoints between two consecutive route anchors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    /// Start anchor (observer origin or previous step)
    pub from: GeoPoint,
    /// End anchor (the step's point)
    pub to: GeoPoint,
    /// Index of the step this leg leads to
    pub step_index: usize,
    /// Waypoints strictly between `from` and `to`, ordered from `from`
    pub points: Vec<GeoPoint>,
}

impl Leg {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
