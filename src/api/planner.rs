//! Background route planning
//!
//! A planning request fetches directions and then builds legs, strictly in
//! that order, on a worker thread. Completion is signalled with a single
//! [`PlanEvent`] on a channel.

use crate::algorithms::legs::{build_legs_checked, LegBuildOutcome};
use crate::api::types::{NavResult, NavigationError, PlanEvent};
use crate::core::{GeoPoint, RouteStep};
use crate::utils::config::NavigationConfig;
use log::{info, warn};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Source of turn-by-turn directions
pub trait DirectionsProvider: Send + 'static {
    /// Ordered route steps from `origin` (if known) to `destination`
    fn directions(&self, origin: Option<GeoPoint>, destination: GeoPoint) -> NavResult<Vec<RouteStep>>;
}

/// Provider that always answers with a fixed route
#[derive(Debug, Clone, Default)]
pub struct StaticDirections {
    steps: Vec<RouteStep>,
}

impl StaticDirections {
    pub fn new(steps: Vec<RouteStep>) -> Self {
        Self { steps }
    }
}

impl DirectionsProvider for StaticDirections {
    fn directions(&self, _origin: Option<GeoPoint>, _destination: GeoPoint) -> NavResult<Vec<RouteStep>> {
        Ok(self.steps.clone())
    }
}

/// Runs directions lookups followed by leg construction
#[derive(Debug, Clone, Copy)]
pub struct RoutePlanner {
    spacing_m: f64,
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::from_config(&NavigationConfig::default())
    }
}

impl RoutePlanner {
    pub fn new(spacing_m: f64) -> Self {
        Self { spacing_m }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(config.waypoint_spacing_m)
    }

    pub fn spacing_m(&self) -> f64 {
        self.spacing_m
    }

    /// Fetch then build on the calling thread
    pub fn plan_blocking<P: DirectionsProvider>(
        &self,
        provider: &P,
        origin: Option<GeoPoint>,
        destination: GeoPoint,
    ) -> PlanEvent {
        let steps = match provider.directions(origin, destination) {
            Ok(steps) if steps.is_empty() => return PlanEvent::Failed(NavigationError::NoRoute),
            Ok(steps) => steps,
            Err(e) => {
                warn!("Directions to {} failed: {}", destination, e);
                return PlanEvent::Failed(e);
            }
        };

        match build_legs_checked(origin, &steps, self.spacing_m) {
            LegBuildOutcome::Ready(legs) => {
                info!("Route to {} ready: {} steps", destination, steps.len());
                PlanEvent::LegsReady { steps, legs }
            }
            LegBuildOutcome::AwaitingOrigin => PlanEvent::NotReady { steps },
            LegBuildOutcome::NoSteps => PlanEvent::Failed(NavigationError::NoRoute),
        }
    }

    /// Plan on a worker thread, sending the completion event to `events`
    pub fn plan_into<P: DirectionsProvider>(
        &self,
        provider: P,
        origin: Option<GeoPoint>,
        destination: GeoPoint,
        events: Sender<PlanEvent>,
    ) -> JoinHandle<()> {
        let planner = *self;
        thread::spawn(move || {
            let event = planner.plan_blocking(&provider, origin, destination);
            // Receiver gone means nobody is waiting for this route anymore
            let _ = events.send(event);
        })
    }

    /// Plan on a worker thread
    pub fn plan<P: DirectionsProvider>(&self, provider: P, origin: Option<GeoPoint>, destination: GeoPoint) -> PlanHandle {
        let (sender, receiver) = channel();
        let worker = self.plan_into(provider, origin, destination, sender);
        PlanHandle {
            receiver,
            worker: Some(worker),
        }
    }
}

/// Pending planning request
#[derive(Debug)]
pub struct PlanHandle {
    receiver: Receiver<PlanEvent>,
    worker: Option<JoinHandle<()>>,
}

impl PlanHandle {
    /// Non-blocking poll for the completion event
    pub fn poll(&mut self) -> NavResult<Option<PlanEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => {
                self.join_worker();
                Ok(Some(event))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(NavigationError::WorkerDisconnected),
        }
    }

    /// Block until the planner signals completion
    pub fn wait(mut self) -> NavResult<PlanEvent> {
        let event = self.receiver.recv().map_err(|_| NavigationError::WorkerDisconnected)?;
        self.join_worker();
        Ok(event)
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Route planner worker panicked");
            }
        }
    }
}
