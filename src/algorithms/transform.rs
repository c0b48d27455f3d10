//! Geographic to scene-space placement transforms
//!
//! The scene frame follows the gravity-and-heading convention of AR
//! runtimes: +X points east, +Y up against gravity, -Z true north, and one
//! scene unit is one meter. A target at bearing θ (clockwise from north) and
//! distance d from the origin ends up at `(d·sin θ, 0, -d·cos θ)`.

use crate::algorithms::geodesic::{distance_m, initial_bearing_deg};
use crate::core::{GeoPoint, COINCIDENT_EPSILON_M};
use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::Serialize;

/// Homogeneous transform locating a target in the origin's scene frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacementTransform {
    /// 4x4 column-major affine matrix (rotation about +Y, then translation)
    pub matrix: Matrix4<f64>,
    /// Great-circle distance from origin to target (meters)
    pub distance_m: f64,
    /// Initial bearing from origin to target (degrees from true north)
    pub bearing_deg: f64,
}

impl PlacementTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
            distance_m: 0.0,
            bearing_deg: 0.0,
        }
    }

    /// Scene-space position (meters)
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    pub fn position(&self) -> Point3<f64> {
        Point3::from(self.translation())
    }

    /// Orientation part of the transform
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let linear: Matrix3<f64> = self.matrix.fixed_view::<3, 3>(0, 0).into_owned();
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(linear))
    }
}

/// Transform for a target `distance_m` away along `bearing_deg`
pub fn local_transform(bearing_deg: f64, distance_m: f64) -> Matrix4<f64> {
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -bearing_deg.to_radians());
    let translation = Translation3::new(0.0, 0.0, -distance_m);
    rotation.to_homogeneous() * translation.to_homogeneous()
}

/// Place `target` relative to an observer standing at `origin`
pub fn world_transform(origin: &GeoPoint, target: &GeoPoint) -> PlacementTransform {
    world_transform_with_reference(&Matrix4::identity(), origin, target)
}

/// Place `target` relative to `origin`, composed onto a reference transform
/// (identity when the scene frame is already north aligned)
pub fn world_transform_with_reference(
    reference: &Matrix4<f64>,
    origin: &GeoPoint,
    target: &GeoPoint,
) -> PlacementTransform {
    let distance = distance_m(origin, target);
    if distance < COINCIDENT_EPSILON_M {
        return PlacementTransform {
            matrix: *reference,
            distance_m: distance,
            bearing_deg: 0.0,
        };
    }

    let bearing = initial_bearing_deg(origin, target);
    PlacementTransform {
        matrix: reference * local_transform(bearing, distance),
        distance_m: distance,
        bearing_deg: bearing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesic::destination;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_same_point_is_identity() {
        let origin = pt(48.8584, 2.2945);
        let transform = world_transform(&origin, &origin);
        assert_eq!(transform.matrix, Matrix4::identity());
        assert_eq!(transform.translation().norm(), 0.0);
        assert_eq!(transform.position(), Point3::origin());
    }

    #[test]
    fn test_sub_centimeter_offset_is_identity() {
        let origin = pt(48.8584, 2.2945);
        let target = destination(&origin, 12.0, 0.001);
        let transform = world_transform(&origin, &target);
        assert_eq!(transform.translation(), Vector3::zeros());
        assert!(transform.matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_thousandth_degree_east_scenario() {
        let origin = pt(0.0, 0.0);
        let target = pt(0.0, 0.001);
        let transform = world_transform(&origin, &target);

        assert!((transform.distance_m - 111.0).abs() / 111.0 < 0.01);
        let t = transform.translation();
        assert!((t.norm() - 111.0).abs() / 111.0 < 0.01);
        assert!((t.x - transform.distance_m).abs() < 1e-6);
        assert!(t.y.abs() < 1e-12);
        assert!(t.z.abs() < 1e-6);
    }

    #[test]
    fn test_north_target_maps_to_negative_z() {
        let origin = pt(0.0, 0.0);
        let target = pt(0.001, 0.0);
        let t = world_transform(&origin, &target).translation();
        assert!(t.x.abs() < 1e-9);
        assert!((t.z + 111.19).abs() < 0.1);
    }

    #[test]
    fn test_rotation_faces_target() {
        let origin = pt(40.7128, -74.0060);
        let target = destination(&origin, 135.0, 250.0);
        let transform = world_transform(&origin, &target);

        let forward = transform.rotation().transform_vector(&-Vector3::z());
        let direction = transform.translation().normalize();
        assert!((forward - direction).norm() < 1e-9);
        assert!((transform.bearing_deg - 135.0).abs() < 1e-6);
    }

    #[test]
    fn test_translation_magnitude_over_kilometers() {
        let origin = pt(35.6762, 139.6503);
        for distance in [0.5, 10.0, 850.0, 5_000.0] {
            let target = destination(&origin, 300.0, distance);
            let transform = world_transform(&origin, &target);
            assert!((transform.translation().norm() - distance).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reference_transform_is_composed() {
        let origin = pt(0.0, 0.0);
        let target = pt(0.0, 0.001);
        let reference = Translation3::new(5.0, 1.5, 0.0).to_homogeneous();

        let plain = world_transform(&origin, &target).translation();
        let shifted = world_transform_with_reference(&reference, &origin, &target).translation();
        assert!((shifted - plain - Vector3::new(5.0, 1.5, 0.0)).norm() < 1e-9);
    }
}
