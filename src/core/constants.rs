//! Physical constants and engine defaults

/// Mean Earth radius (m). Every distance, bearing and destination calculation
/// in the crate uses this single value.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Two points closer than this (m) are treated as coincident
pub const COINCIDENT_EPSILON_M: f64 = 0.01;

/// An interpolated point closer than this (m) to the leg end is dropped
pub const ENDPOINT_EPSILON_M: f64 = 0.05;

/// Default arc length between intermediary waypoints (m)
pub const DEFAULT_WAYPOINT_SPACING_M: f64 = 10.0;

/// Smallest waypoint spacing (m) a configuration may ask for
pub const MIN_WAYPOINT_SPACING_M: f64 = 0.5;

/// Upper bound on intermediary waypoints generated for a single leg
pub const MAX_WAYPOINTS_PER_LEG: usize = 100_000;

/// Fixes with a larger horizontal accuracy radius (m) are not trusted
pub const DEFAULT_MAX_FIX_ACCURACY_M: f64 = 65.0;

/// Position fix updates in `Tracking` before placements freeze
pub const DEFAULT_STABLE_AFTER_UPDATES: u32 = 6;

/// Marker scale is this value divided by the distance to the observer
pub const DEFAULT_SCALE_NUMERATOR: f64 = 100.0;

/// Distance floor (m) used for the scale cue
pub const DEFAULT_MIN_SCALE_DISTANCE_M: f64 = 1.0;
