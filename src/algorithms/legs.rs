//! Route leg construction
//!
//! Pairs the observer origin with the first route step, then every step with
//! its predecessor, and interpolates waypoints along each pair.

use crate::algorithms::geodesic::interpolate;
use crate::core::{GeoPoint, Leg, RouteStep};
use log::{debug, info};

/// Why [`build_legs_checked`] did or did not produce legs
#[derive(Debug, Clone, PartialEq)]
pub enum LegBuildOutcome {
    /// One leg per step, in step order
    Ready(Vec<Leg>),
    /// No position fix yet; building now would misplace the first leg
    AwaitingOrigin,
    /// The route has no steps
    NoSteps,
}

impl LegBuildOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, LegBuildOutcome::Ready(_))
    }

    /// Legs if ready, otherwise an empty list
    pub fn into_legs(self) -> Vec<Leg> {
        match self {
            LegBuildOutcome::Ready(legs) => legs,
            _ => Vec::new(),
        }
    }
}

/// Build legs, reporting why nothing was built
pub fn build_legs_checked(origin: Option<GeoPoint>, steps: &[RouteStep], spacing_m: f64) -> LegBuildOutcome {
    let origin = match origin {
        Some(origin) => origin,
        None => {
            debug!("Deferring leg construction until an origin fix is available");
            return LegBuildOutcome::AwaitingOrigin;
        }
    };
    if steps.is_empty() {
        return LegBuildOutcome::NoSteps;
    }

    let mut legs = Vec::with_capacity(steps.len());
    let mut from = origin;
    for step in steps {
        legs.push(Leg {
            from,
            to: step.point,
            step_index: step.index,
            points: interpolate(&from, &step.point, spacing_m),
        });
        from = step.point;
    }

    info!(
        "Built {} legs with {} waypoints from origin {}",
        legs.len(),
        total_waypoints(&legs),
        origin
    );
    LegBuildOutcome::Ready(legs)
}

/// Build one leg per step; empty when the origin or the steps are missing
pub fn build_legs(origin: Option<GeoPoint>, steps: &[RouteStep], spacing_m: f64) -> Vec<Leg> {
    build_legs_checked(origin, steps, spacing_m).into_legs()
}

/// Number of intermediary waypoints across all legs
pub fn total_waypoints(legs: &[Leg]) -> usize {
    legs.iter().map(Leg::len).sum()
}

/// All waypoints in leg order
pub fn flatten_waypoints(legs: &[Leg]) -> Vec<GeoPoint> {
    legs.iter().flat_map(|leg| leg.points.iter().copied()).collect()
}
