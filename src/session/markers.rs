//! Renderable markers and their placement updates

use crate::algorithms::transform::PlacementTransform;
use crate::core::{GeoPoint, Leg, RouteStep};
use log::debug;
use serde::Serialize;

/// Stable identity of a marker within one session generation, equal to
/// its position in the owning [`MarkerSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MarkerId(usize);

impl MarkerId {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// Route-instruction markers and plain path waypoints render differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerCategory {
    /// End point of a route step, labelled with its instruction
    Step,
    /// Intermediary point along a leg
    Waypoint,
}

impl MarkerCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Waypoint => "waypoint",
        }
    }

    /// Sphere radius (meters) before the distance scale is applied
    pub fn base_radius_m(self) -> f64 {
        match self {
            Self::Step => 0.3,
            Self::Waypoint => 0.25,
        }
    }
}

/// Transform and size cue for one marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerPlacement {
    pub transform: PlacementTransform,
    /// Uniform scale, inversely proportional to distance from the observer
    pub scale: f64,
}

/// A placeable entity in the AR scene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: MarkerId,
    pub title: String,
    pub location: GeoPoint,
    pub category: MarkerCategory,
    /// Latest placement, `None` until the first batch is applied
    pub placement: Option<MarkerPlacement>,
}

/// New placement for a single marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerUpdate {
    pub id: MarkerId,
    pub placement: MarkerPlacement,
}

/// Immutable result of one recomputation, handed to the presentation side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementBatch {
    /// Session generation the batch was computed for
    pub generation: u64,
    /// Observer position used as the transform origin
    pub origin: GeoPoint,
    /// True when the origin came from an untrusted fix
    pub degraded: bool,
    pub updates: Vec<MarkerUpdate>,
}

/// The marker collection of one session generation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerSet {
    generation: u64,
    markers: Vec<Marker>,
}

impl MarkerSet {
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            markers: Vec::new(),
        }
    }

    /// One marker per route step (in route order), then one per leg
    /// waypoint (in leg order)
    pub fn from_route(generation: u64, steps: &[RouteStep], legs: &[Leg]) -> Self {
        let mut markers = Vec::with_capacity(steps.len() + legs.iter().map(Leg::len).sum::<usize>());
        for step in steps {
            markers.push(Marker {
                id: MarkerId(markers.len()),
                title: step.instruction.clone(),
                location: step.point,
                category: MarkerCategory::Step,
                placement: None,
            });
        }
        for point in legs.iter().flat_map(|leg| leg.points.iter()) {
            markers.push(Marker {
                id: MarkerId(markers.len()),
                title: point.to_string(),
                location: *point,
                category: MarkerCategory::Waypoint,
                placement: None,
            });
        }
        Self { generation, markers }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0).filter(|m| m.id == id)
    }

    pub fn ids(&self) -> Vec<MarkerId> {
        self.markers.iter().map(|m| m.id).collect()
    }

    pub fn count(&self, category: MarkerCategory) -> usize {
        self.markers.iter().filter(|m| m.category == category).count()
    }

    /// Write a batch into the markers in place. Batches from another
    /// generation are stale and ignored. Returns the number of markers
    /// updated.
    pub fn apply(&mut self, batch: &PlacementBatch) -> usize {
        if batch.generation != self.generation {
            debug!(
                "Discarding placement batch for generation {} (current {})",
                batch.generation, self.generation
            );
            return 0;
        }

        let mut applied = 0;
        for update in &batch.updates {
            if let Some(marker) = self.markers.get_mut(update.id.0).filter(|m| m.id == update.id) {
                marker.placement = Some(update.placement);
                applied += 1;
            }
        }
        applied
    }

    /// Remove every marker, returning the ids whose scene anchors must be
    /// released
    pub fn clear(&mut self) -> Vec<MarkerId> {
        let released = self.ids();
        self.markers.clear();
        released
    }
}
