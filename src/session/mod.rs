//! Session state: the placement coordinator and the markers it owns

pub mod coordinator;
pub mod markers;

pub use coordinator::{compute_placements, scale_for_distance, FixOutcome, PlacementCoordinator, PlacementState};
pub use markers::{Marker, MarkerCategory, MarkerId, MarkerPlacement, MarkerSet, MarkerUpdate, PlacementBatch};
