//! Placement state machine for one navigation session
//!
//! The coordinator owns everything a session accumulates: the route, the
//! legs derived from it, the marker set and the fix history. Fixes drive it
//! through `AwaitingOrigin -> Building -> Tracking -> Stable`; once stable,
//! placements stay frozen until `reset`.

use crate::algorithms::legs::{build_legs_checked, LegBuildOutcome};
use crate::algorithms::transform::world_transform;
use crate::core::{GeoPoint, Leg, PositionFix, RouteStep};
use crate::processing::estimator::{BestEstimate, PositionEstimator};
use crate::session::markers::{MarkerId, MarkerPlacement, MarkerSet, MarkerUpdate, PlacementBatch};
use crate::utils::config::NavigationConfig;
use log::{debug, info, warn};
use serde::Serialize;

/// Lifecycle of marker placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlacementState {
    /// No trusted fix and route combination yet
    AwaitingOrigin,
    /// Legs and markers exist, waiting for placement to start
    Building,
    /// Each fix recomputes every marker placement
    Tracking,
    /// Placements frozen
    Stable,
}

impl PlacementState {
    pub fn label(self) -> &'static str {
        match self {
            Self::AwaitingOrigin => "awaiting-origin",
            Self::Building => "building",
            Self::Tracking => "tracking",
            Self::Stable => "stable",
        }
    }
}

/// What a single fix caused
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// Recorded, nothing else happened
    Buffered,
    /// Legs and markers were built from the first usable origin
    LegsBuilt { legs: usize, markers: usize },
    /// New placements for every marker
    Placed(PlacementBatch),
    /// Placements are frozen; the fix was ignored
    Frozen,
}

/// Marker scale cue for a marker `distance_m` away
pub fn scale_for_distance(distance_m: f64, numerator: f64, min_distance_m: f64) -> f64 {
    numerator / distance_m.max(min_distance_m)
}

/// Compute a placement for every marker relative to `origin`
pub fn compute_placements(markers: &MarkerSet, origin: &BestEstimate, config: &NavigationConfig) -> PlacementBatch {
    let updates = markers
        .iter()
        .map(|marker| {
            let transform = world_transform(&origin.point, &marker.location);
            MarkerUpdate {
                id: marker.id,
                placement: MarkerPlacement {
                    scale: scale_for_distance(
                        transform.distance_m,
                        config.scale_numerator,
                        config.min_scale_distance_m,
                    ),
                    transform,
                },
            }
        })
        .collect();

    PlacementBatch {
        generation: markers.generation(),
        origin: origin.point,
        degraded: origin.degraded,
        updates,
    }
}

/// Owner of one navigation session's state
#[derive(Debug, Clone)]
pub struct PlacementCoordinator {
    config: NavigationConfig,
    state: PlacementState,
    estimator: PositionEstimator,
    steps: Vec<RouteStep>,
    legs: Vec<Leg>,
    markers: MarkerSet,
    generation: u64,
    updates: u32,
}

impl Default for PlacementCoordinator {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}

impl PlacementCoordinator {
    pub fn new(config: NavigationConfig) -> Self {
        let estimator = PositionEstimator::new(config.estimator, config.history_len);
        Self {
            config,
            state: PlacementState::AwaitingOrigin,
            estimator,
            steps: Vec::new(),
            legs: Vec::new(),
            markers: MarkerSet::empty(0),
            generation: 0,
            updates: 0,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fix updates consumed while tracking
    pub fn updates(&self) -> u32 {
        self.updates
    }

    pub fn best_estimate(&self) -> Option<BestEstimate> {
        self.estimator.estimate()
    }

    /// Trusted origin for building legs, if any
    fn reliable_origin(&self) -> Option<GeoPoint> {
        self.estimator.estimate().filter(|e| !e.degraded).map(|e| e.point)
    }

    /// Store a route. Builds legs right away when a trusted origin is known.
    /// Returns true when the coordinator entered `Building`.
    pub fn set_route(&mut self, steps: Vec<RouteStep>) -> bool {
        if self.state != PlacementState::AwaitingOrigin {
            warn!(
                "Ignoring new route while {}; reset the session first",
                self.state.label()
            );
            return false;
        }

        debug!("Route with {} steps received", steps.len());
        self.steps = steps;
        self.try_build()
    }

    /// Install legs computed elsewhere (e.g. by the route planner).
    /// Returns true when the coordinator entered `Building`.
    pub fn install_legs(&mut self, steps: Vec<RouteStep>, legs: Vec<Leg>) -> bool {
        if self.state != PlacementState::AwaitingOrigin {
            warn!("Ignoring planned legs while {}", self.state.label());
            return false;
        }
        if legs.is_empty() || legs.len() != steps.len() {
            warn!(
                "Rejecting {} legs for a route of {} steps",
                legs.len(),
                steps.len()
            );
            return false;
        }

        self.steps = steps;
        self.enter_building(legs);
        true
    }

    fn try_build(&mut self) -> bool {
        match build_legs_checked(self.reliable_origin(), &self.steps, self.config.waypoint_spacing_m) {
            LegBuildOutcome::Ready(legs) => {
                self.enter_building(legs);
                true
            }
            LegBuildOutcome::AwaitingOrigin | LegBuildOutcome::NoSteps => false,
        }
    }

    fn enter_building(&mut self, legs: Vec<Leg>) {
        self.markers = MarkerSet::from_route(self.generation, &self.steps, &legs);
        self.legs = legs;
        self.state = PlacementState::Building;
        info!(
            "Built {} legs with {} markers, state -> {}",
            self.legs.len(),
            self.markers.len(),
            self.state.label()
        );
    }

    /// Feed one position fix through the state machine
    pub fn on_fix(&mut self, fix: PositionFix) -> FixOutcome {
        match self.state {
            PlacementState::Stable => {
                debug!("Placements frozen, ignoring fix at {}", fix.timestamp_ms);
                FixOutcome::Frozen
            }
            PlacementState::AwaitingOrigin => {
                self.estimator.push(fix);
                if self.steps.is_empty() || !self.try_build() {
                    return FixOutcome::Buffered;
                }
                FixOutcome::LegsBuilt {
                    legs: self.legs.len(),
                    markers: self.markers.len(),
                }
            }
            PlacementState::Building => {
                self.estimator.push(fix);
                FixOutcome::Buffered
            }
            PlacementState::Tracking => {
                self.estimator.push(fix);
                // Only trusted fixes move markers or count toward the freeze
                if !self.config.estimator.accepts(&fix) {
                    debug!(
                        "Fix of {} m kept in history, placements unchanged",
                        fix.horizontal_accuracy_m
                    );
                    return FixOutcome::Buffered;
                }
                let Some(estimate) = self.estimator.estimate() else {
                    return FixOutcome::Buffered;
                };
                let batch = compute_placements(&self.markers, &estimate, &self.config);
                self.updates += 1;
                debug!(
                    "Placement update {}/{} from {}",
                    self.updates, self.config.stable_after_updates, estimate.point
                );
                if self.updates >= self.config.stable_after_updates {
                    self.state = PlacementState::Stable;
                    info!("Placements stable after {} updates", self.updates);
                }
                FixOutcome::Placed(batch)
            }
        }
    }

    /// Start placing markers. Only meaningful in `Building`; the initial
    /// batch does not count toward stabilisation.
    pub fn place_markers(&mut self) -> Option<PlacementBatch> {
        if self.state != PlacementState::Building {
            debug!("place_markers ignored while {}", self.state.label());
            return None;
        }
        let estimate = self.estimator.estimate()?;
        let batch = compute_placements(&self.markers, &estimate, &self.config);
        self.state = PlacementState::Tracking;
        info!("Placed {} markers, state -> {}", batch.updates.len(), self.state.label());
        Some(batch)
    }

    /// Apply a batch to the coordinator's own markers
    pub fn apply(&mut self, batch: &PlacementBatch) -> usize {
        self.markers.apply(batch)
    }

    /// `on_fix` followed by `apply` for single-threaded callers
    pub fn process_fix(&mut self, fix: PositionFix) -> FixOutcome {
        let outcome = self.on_fix(fix);
        if let FixOutcome::Placed(batch) = &outcome {
            self.markers.apply(batch);
        }
        outcome
    }

    /// Drop the route, legs, markers and fix history. Valid from any state.
    /// Returns the ids of the markers whose anchors must be released.
    pub fn reset(&mut self) -> Vec<MarkerId> {
        let released = self.markers.clear();
        self.generation += 1;
        self.markers = MarkerSet::empty(self.generation);
        self.steps.clear();
        self.legs.clear();
        self.estimator.clear();
        self.updates = 0;
        self.state = PlacementState::AwaitingOrigin;
        info!(
            "Session reset, released {} markers, generation {}",
            released.len(),
            self.generation
        );
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesic::destination;
    use crate::session::markers::MarkerCategory;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn fix(lat: f64, lon: f64, t: u64) -> PositionFix {
        PositionFix::new(pt(lat, lon), 5.0, t).unwrap()
    }

    fn route() -> Vec<RouteStep> {
        vec![
            RouteStep::new("Head east", pt(0.0, 0.0005), 0),
            RouteStep::new("Turn left", pt(0.0005, 0.0005), 1),
        ]
    }

    fn tracking_coordinator(config: NavigationConfig) -> PlacementCoordinator {
        let mut coordinator = PlacementCoordinator::new(config);
        coordinator.on_fix(fix(0.0, 0.0, 0));
        assert!(coordinator.set_route(route()));
        coordinator.place_markers().unwrap();
        coordinator
    }

    #[test]
    fn test_fix_without_route_is_buffered() {
        let mut coordinator = PlacementCoordinator::default();
        assert_eq!(coordinator.on_fix(fix(0.0, 0.0, 0)), FixOutcome::Buffered);
        assert_eq!(coordinator.state(), PlacementState::AwaitingOrigin);
        assert!(coordinator.markers().is_empty());
    }

    #[test]
    fn test_route_then_fix_builds_legs() {
        let mut coordinator = PlacementCoordinator::default();
        assert!(!coordinator.set_route(route()));
        assert_eq!(coordinator.state(), PlacementState::AwaitingOrigin);

        match coordinator.on_fix(fix(0.0, 0.0, 0)) {
            FixOutcome::LegsBuilt { legs, markers } => {
                assert_eq!(legs, 2);
                assert_eq!(markers, coordinator.markers().len());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(coordinator.state(), PlacementState::Building);
        assert_eq!(coordinator.legs()[0].from, pt(0.0, 0.0));
        assert_eq!(coordinator.legs()[1].from, pt(0.0, 0.0005));
    }

    #[test]
    fn test_markers_follow_route_order() {
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(fix(0.0, 0.0, 0));
        assert!(coordinator.set_route(route()));

        let markers: Vec<_> = coordinator.markers().iter().collect();
        assert_eq!(markers[0].title, "Head east");
        assert_eq!(markers[1].title, "Turn left");
        assert!(markers[2..].iter().all(|m| m.category == MarkerCategory::Waypoint));
        let waypoints: usize = coordinator.legs().iter().map(|l| l.len()).sum();
        assert_eq!(markers.len(), 2 + waypoints);
    }

    #[test]
    fn test_empty_route_stays_awaiting() {
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(fix(0.0, 0.0, 0));
        assert!(!coordinator.set_route(Vec::new()));
        assert_eq!(coordinator.state(), PlacementState::AwaitingOrigin);
    }

    #[test]
    fn test_untrusted_fix_does_not_anchor_route() {
        let mut coordinator = PlacementCoordinator::default();
        coordinator.set_route(route());
        let noisy = PositionFix::new(pt(0.0, 0.0), 200.0, 0).unwrap();
        assert_eq!(coordinator.on_fix(noisy), FixOutcome::Buffered);
        assert_eq!(coordinator.state(), PlacementState::AwaitingOrigin);
    }

    #[test]
    fn test_place_markers_only_from_building() {
        let mut coordinator = PlacementCoordinator::default();
        assert!(coordinator.place_markers().is_none());

        coordinator.on_fix(fix(0.0, 0.0, 0));
        coordinator.set_route(route());
        assert_eq!(coordinator.on_fix(fix(0.0, 0.0, 1_000)), FixOutcome::Buffered);

        let batch = coordinator.place_markers().unwrap();
        assert_eq!(batch.updates.len(), coordinator.markers().len());
        assert_eq!(coordinator.state(), PlacementState::Tracking);
        assert_eq!(coordinator.updates(), 0);
        assert!(coordinator.place_markers().is_none());
    }

    #[test]
    fn test_six_fixes_reach_stable_and_seventh_is_frozen() {
        let mut coordinator = tracking_coordinator(NavigationConfig::default());

        for i in 1..=6u64 {
            let outcome = coordinator.process_fix(fix(0.0, 0.00001 * i as f64, i * 1_000));
            assert!(matches!(outcome, FixOutcome::Placed(_)));
        }
        assert_eq!(coordinator.state(), PlacementState::Stable);
        assert_eq!(coordinator.updates(), 6);

        let snapshot = coordinator.markers().clone();
        assert_eq!(coordinator.process_fix(fix(0.0003, 0.0003, 7_000)), FixOutcome::Frozen);
        assert_eq!(coordinator.markers(), &snapshot);
    }

    #[test]
    fn test_untrusted_fixes_do_not_count_toward_stable() {
        let mut coordinator = tracking_coordinator(NavigationConfig::default());

        for i in 1..=6u64 {
            let noisy = PositionFix::new(pt(0.0, 0.0), 500.0, i * 1_000).unwrap();
            assert_eq!(coordinator.process_fix(noisy), FixOutcome::Buffered);
        }
        assert_eq!(coordinator.state(), PlacementState::Tracking);
        assert_eq!(coordinator.updates(), 0);

        let trusted = PositionFix::new(pt(0.0, 0.00001), 3.0, 7_000).unwrap();
        let FixOutcome::Placed(batch) = coordinator.process_fix(trusted) else {
            panic!("trusted fix should place markers");
        };
        assert!(!batch.degraded);
        assert_eq!(coordinator.updates(), 1);
    }

    #[test]
    fn test_stabilisation_threshold_is_configurable() {
        let config = NavigationConfig::default().with_stable_after_updates(2);
        let mut coordinator = tracking_coordinator(config);
        coordinator.on_fix(fix(0.0, 0.0, 1_000));
        assert_eq!(coordinator.state(), PlacementState::Tracking);
        coordinator.on_fix(fix(0.0, 0.0, 2_000));
        assert_eq!(coordinator.state(), PlacementState::Stable);
    }

    #[test]
    fn test_scale_is_inverse_to_distance() {
        assert!((scale_for_distance(50.0, 100.0, 1.0) - 2.0).abs() < 1e-12);
        assert!((scale_for_distance(0.0, 100.0, 1.0) - 100.0).abs() < 1e-12);

        let origin = pt(10.0, 10.0);
        let steps = vec![RouteStep::new("Arrive", destination(&origin, 90.0, 50.0), 0)];
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(PositionFix::new(origin, 3.0, 0).unwrap());
        coordinator.set_route(steps);
        let batch = coordinator.place_markers().unwrap();

        let step = &batch.updates[0];
        assert!((step.placement.transform.distance_m - 50.0).abs() < 1e-6);
        assert!((step.placement.scale - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_from_stable() {
        let config = NavigationConfig::default().with_stable_after_updates(1);
        let mut coordinator = tracking_coordinator(config);
        coordinator.process_fix(fix(0.0, 0.0, 1_000));
        assert_eq!(coordinator.state(), PlacementState::Stable);

        let marker_count = coordinator.markers().len();
        let released = coordinator.reset();
        assert_eq!(released.len(), marker_count);
        assert_eq!(coordinator.state(), PlacementState::AwaitingOrigin);
        assert!(coordinator.markers().is_empty());
        assert!(coordinator.legs().is_empty());
        assert!(coordinator.best_estimate().is_none());

        assert_eq!(coordinator.on_fix(fix(0.0, 0.0, 2_000)), FixOutcome::Buffered);
        assert!(coordinator.markers().is_empty());
    }

    #[test]
    fn test_reset_invalidates_pending_batches() {
        let mut coordinator = tracking_coordinator(NavigationConfig::default());
        let stale = match coordinator.on_fix(fix(0.0, 0.0, 1_000)) {
            FixOutcome::Placed(batch) => batch,
            other => panic!("unexpected outcome {:?}", other),
        };

        coordinator.reset();
        assert_eq!(coordinator.generation(), stale.generation + 1);
        coordinator.on_fix(fix(0.0, 0.0, 2_000));
        coordinator.set_route(route());
        assert_eq!(coordinator.apply(&stale), 0);
        assert!(coordinator.markers().iter().all(|m| m.placement.is_none()));
    }

    #[test]
    fn test_reset_from_awaiting_origin() {
        let mut coordinator = PlacementCoordinator::default();
        assert!(coordinator.reset().is_empty());
        assert_eq!(coordinator.state(), PlacementState::AwaitingOrigin);
    }

    #[test]
    fn test_install_planned_legs() {
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(fix(0.0, 0.0, 0));
        let legs = crate::algorithms::legs::build_legs(Some(pt(0.0, 0.0)), &route(), 10.0);

        assert!(!coordinator.install_legs(route(), legs[..1].to_vec()));
        assert!(coordinator.install_legs(route(), legs));
        assert_eq!(coordinator.state(), PlacementState::Building);
        assert!(!coordinator.set_route(route()));
    }
}
