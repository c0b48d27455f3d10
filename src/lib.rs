//! AR Waypoint Overlay Engine
//!
//! Turns a turn-by-turn route and a stream of noisy position fixes into
//! evenly spaced waypoints and scene-space placement transforms for an
//! augmented-reality renderer.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod session;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{GeoError, GeoPoint, GeoResult, Leg, PositionFix, RouteStep, EARTH_RADIUS_M};
pub use algorithms::{build_legs, distance_m, initial_bearing_deg, interpolate, world_transform, PlacementTransform};
pub use processing::{best_estimate, BestEstimate, EstimatorParams, PositionEstimator};
pub use session::{FixOutcome, Marker, MarkerCategory, MarkerId, MarkerSet, PlacementBatch, PlacementCoordinator, PlacementState};
pub use utils::{ConfigError, ConfigResult, NavigationConfig};
pub use api::{
    LocationFeed, NavigationSession, SceneMirror, RoutePlanner, DirectionsProvider,
    NavResult, NavigationError, PlanEvent, SessionEvent, MapAnnotation, OutputFormat,
};
