//! Geodesic, route segmentation and placement algorithms

pub mod geodesic;
pub mod legs;
pub mod transform;

pub use geodesic::{destination, distance_m, initial_bearing_deg, interpolate, interpolate_default};
pub use legs::{build_legs, build_legs_checked, flatten_waypoints, total_waypoints, LegBuildOutcome};
pub use transform::{world_transform, world_transform_with_reference, PlacementTransform};
