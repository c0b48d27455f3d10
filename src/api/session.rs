//! Threaded navigation session
//!
//! A worker thread owns the [`PlacementCoordinator`] and processes
//! [`SessionCommand`]s one at a time. Every result travels to the
//! presentation thread as an immutable [`SessionEvent`], where a
//! [`SceneMirror`] folds them into the renderable marker set.

use crate::api::types::{NavResult, NavigationError, PlanEvent, SessionCommand, SessionEvent};
use crate::core::{Leg, PositionFix, RouteStep};
use crate::session::{FixOutcome, MarkerId, MarkerSet, PlacementCoordinator, PlacementState};
use crate::utils::config::NavigationConfig;
use log::{debug, info, warn};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Handle to the session worker
#[derive(Debug)]
pub struct NavigationSession {
    commands: Sender<SessionCommand>,
    worker: Option<JoinHandle<PlacementCoordinator>>,
}

impl NavigationSession {
    /// Start the worker. The returned receiver is the only consumer of
    /// session events.
    pub fn spawn(config: NavigationConfig) -> (Self, Receiver<SessionEvent>) {
        let (commands, command_rx) = channel();
        let (event_tx, events) = channel();
        let coordinator = PlacementCoordinator::new(config);
        let worker = thread::spawn(move || run_worker(coordinator, command_rx, event_tx));
        info!("Navigation session started");
        (
            Self {
                commands,
                worker: Some(worker),
            },
            events,
        )
    }

    fn send(&self, command: SessionCommand) -> NavResult<()> {
        self.commands.send(command).map_err(|_| NavigationError::WorkerDisconnected)
    }

    /// Sender for feeding commands from other threads
    pub fn commands(&self) -> Sender<SessionCommand> {
        self.commands.clone()
    }

    pub fn send_fix(&self, fix: PositionFix) -> NavResult<()> {
        self.send(SessionCommand::Fix(fix))
    }

    pub fn set_route(&self, steps: Vec<RouteStep>) -> NavResult<()> {
        self.send(SessionCommand::Route(steps))
    }

    pub fn install_legs(&self, steps: Vec<RouteStep>, legs: Vec<Leg>) -> NavResult<()> {
        self.send(SessionCommand::Legs { steps, legs })
    }

    /// Hand a route planner result to the session. A failed plan is
    /// returned as the error for the caller to present.
    pub fn submit_plan(&self, event: PlanEvent) -> NavResult<()> {
        match event {
            PlanEvent::LegsReady { steps, legs } => self.install_legs(steps, legs),
            PlanEvent::NotReady { steps } => self.set_route(steps),
            PlanEvent::Failed(e) => Err(e),
        }
    }

    pub fn place_markers(&self) -> NavResult<()> {
        self.send(SessionCommand::Place)
    }

    pub fn reset(&self) -> NavResult<()> {
        self.send(SessionCommand::Reset)
    }

    /// Forward every fix from a feed subscription until either side hangs up
    pub fn forward_fixes(&self, fixes: Receiver<PositionFix>) -> JoinHandle<()> {
        let commands = self.commands.clone();
        thread::spawn(move || {
            for fix in fixes {
                if commands.send(SessionCommand::Fix(fix)).is_err() {
                    break;
                }
            }
        })
    }

    /// Stop the worker and take back the coordinator
    pub fn shutdown(mut self) -> NavResult<PlacementCoordinator> {
        // A worker that already exited has dropped its receiver
        let _ = self.commands.send(SessionCommand::Shutdown);
        let worker = self.worker.take().ok_or(NavigationError::WorkerDisconnected)?;
        worker.join().map_err(|_| NavigationError::WorkerDisconnected)
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(SessionCommand::Shutdown);
            if worker.join().is_err() {
                warn!("Navigation session worker panicked");
            }
        }
    }
}

fn run_worker(
    mut coordinator: PlacementCoordinator,
    commands: Receiver<SessionCommand>,
    events: Sender<SessionEvent>,
) -> PlacementCoordinator {
    while let Ok(command) = commands.recv() {
        if matches!(command, SessionCommand::Shutdown) {
            break;
        }
        let before = coordinator.state();
        let mut outgoing = execute(&mut coordinator, command);
        let after = coordinator.state();
        if before != after {
            outgoing.push(SessionEvent::StateChanged { from: before, to: after });
        }

        for event in outgoing {
            if events.send(event).is_err() {
                debug!("Presentation side hung up, stopping session worker");
                return coordinator;
            }
        }
    }
    info!("Navigation session stopped");
    coordinator
}

fn markers_built(coordinator: &PlacementCoordinator) -> Vec<SessionEvent> {
    vec![SessionEvent::MarkersBuilt(coordinator.markers().clone())]
}

fn execute(coordinator: &mut PlacementCoordinator, command: SessionCommand) -> Vec<SessionEvent> {
    let state = coordinator.state();

    match command {
        SessionCommand::Fix(fix) => match coordinator.on_fix(fix) {
            FixOutcome::LegsBuilt { .. } => markers_built(coordinator),
            FixOutcome::Placed(batch) => vec![SessionEvent::Placed(batch)],
            FixOutcome::Buffered | FixOutcome::Frozen => Vec::new(),
        },
        SessionCommand::Route(_) | SessionCommand::Legs { .. } if state != PlacementState::AwaitingOrigin => {
            vec![SessionEvent::Error(NavigationError::SessionBusy { state })]
        }
        SessionCommand::Route(steps) => {
            if coordinator.set_route(steps) {
                markers_built(coordinator)
            } else {
                Vec::new()
            }
        }
        SessionCommand::Legs { steps, legs } => {
            let (leg_count, step_count) = (legs.len(), steps.len());
            if coordinator.install_legs(steps, legs) {
                markers_built(coordinator)
            } else {
                vec![SessionEvent::Error(NavigationError::LegsRejected {
                    legs: leg_count,
                    steps: step_count,
                })]
            }
        }
        SessionCommand::Place => coordinator.place_markers().map(SessionEvent::Placed).into_iter().collect(),
        SessionCommand::Reset => {
            let released = coordinator.reset();
            vec![SessionEvent::Reset {
                generation: coordinator.generation(),
                released,
            }]
        }
        SessionCommand::Shutdown => Vec::new(),
    }
}

/// Presentation-side copy of the session's markers
#[derive(Debug)]
pub struct SceneMirror {
    events: Receiver<SessionEvent>,
    markers: MarkerSet,
    state: PlacementState,
    released: Vec<MarkerId>,
    errors: Vec<NavigationError>,
    connected: bool,
}

impl SceneMirror {
    pub fn new(events: Receiver<SessionEvent>) -> Self {
        Self {
            events,
            markers: MarkerSet::default(),
            state: PlacementState::AwaitingOrigin,
            released: Vec::new(),
            errors: Vec::new(),
            connected: true,
        }
    }

    /// Apply every pending event without blocking. Returns the number of
    /// events processed.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.apply_event(event);
                    processed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        processed
    }

    /// Block for the next event and apply it. Returns false once the
    /// session is gone.
    pub fn wait_next(&mut self) -> bool {
        match self.events.recv() {
            Ok(event) => {
                self.apply_event(event);
                true
            }
            Err(_) => {
                self.connected = false;
                false
            }
        }
    }

    fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::MarkersBuilt(markers) => {
                if markers.generation() >= self.markers.generation() {
                    self.markers = markers;
                } else {
                    debug!("Dropping markers from stale generation {}", markers.generation());
                }
            }
            SessionEvent::Placed(batch) => {
                self.markers.apply(&batch);
            }
            SessionEvent::Reset { generation, released } => {
                self.released.extend(released);
                self.markers = MarkerSet::empty(generation);
            }
            SessionEvent::StateChanged { to, .. } => self.state = to,
            SessionEvent::Error(e) => {
                warn!("Navigation session error: {}", e);
                self.errors.push(e);
            }
        }
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Marker ids whose anchors should be removed from the scene
    pub fn take_released(&mut self) -> Vec<MarkerId> {
        std::mem::take(&mut self.released)
    }

    pub fn take_errors(&mut self) -> Vec<NavigationError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::feed::LocationFeed;
    use crate::core::GeoPoint;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn fix(t: u64) -> PositionFix {
        PositionFix::new(pt(0.0, 0.0), 5.0, t).unwrap()
    }

    fn route() -> Vec<RouteStep> {
        vec![RouteStep::new("Arrive", pt(0.0, 0.0004), 0)]
    }

    /// Apply events until the mirror reaches `state`
    fn wait_for_state(mirror: &mut SceneMirror, state: PlacementState) {
        while mirror.state() != state {
            assert!(mirror.wait_next(), "session ended before reaching {:?}", state);
        }
    }

    #[test]
    fn test_session_reaches_stable() {
        let (session, events) = NavigationSession::spawn(NavigationConfig::default().with_stable_after_updates(3));
        let mut mirror = SceneMirror::new(events);

        session.send_fix(fix(0)).unwrap();
        session.set_route(route()).unwrap();
        wait_for_state(&mut mirror, PlacementState::Building);
        assert_eq!(mirror.markers().len(), 5);

        session.place_markers().unwrap();
        for t in 1..=4 {
            session.send_fix(fix(t * 1_000)).unwrap();
        }
        wait_for_state(&mut mirror, PlacementState::Stable);
        assert!(mirror.markers().iter().all(|m| m.placement.is_some()));

        let coordinator = session.shutdown().unwrap();
        assert_eq!(coordinator.updates(), 3);
    }

    #[test]
    fn test_reset_releases_mirror_markers() {
        let (session, events) = NavigationSession::spawn(NavigationConfig::default());
        let mut mirror = SceneMirror::new(events);

        session.send_fix(fix(0)).unwrap();
        session.set_route(route()).unwrap();
        wait_for_state(&mut mirror, PlacementState::Building);
        let built = mirror.markers().len();

        session.reset().unwrap();
        wait_for_state(&mut mirror, PlacementState::AwaitingOrigin);
        assert!(mirror.markers().is_empty());
        assert_eq!(mirror.take_released().len(), built);
        assert_eq!(mirror.markers().generation(), 1);
    }

    #[test]
    fn test_route_while_tracking_reports_error() {
        let (session, events) = NavigationSession::spawn(NavigationConfig::default());
        let mut mirror = SceneMirror::new(events);

        session.send_fix(fix(0)).unwrap();
        session.set_route(route()).unwrap();
        session.place_markers().unwrap();
        wait_for_state(&mut mirror, PlacementState::Tracking);

        session.set_route(route()).unwrap();
        while mirror.take_errors().is_empty() {
            assert!(mirror.wait_next());
        }
        drop(session);
        mirror.drain();
        assert!(!mirror.is_connected());
    }

    #[test]
    fn test_mismatched_legs_report_error() {
        let (session, events) = NavigationSession::spawn(NavigationConfig::default());
        let mut mirror = SceneMirror::new(events);

        session.install_legs(route(), Vec::new()).unwrap();
        let errors = loop {
            let errors = mirror.take_errors();
            if !errors.is_empty() {
                break errors;
            }
            assert!(mirror.wait_next(), "session ended without reporting an error");
        };
        assert_eq!(errors, vec![NavigationError::LegsRejected { legs: 0, steps: 1 }]);
        assert_eq!(mirror.state(), PlacementState::AwaitingOrigin);
        assert!(mirror.markers().is_empty());
    }

    #[test]
    fn test_stale_batch_after_reset_is_discarded() {
        let (tx, rx) = channel();
        let mut mirror = SceneMirror::new(rx);
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(fix(0));
        coordinator.set_route(route());
        tx.send(SessionEvent::MarkersBuilt(coordinator.markers().clone())).unwrap();
        let stale = coordinator.place_markers().unwrap();

        let released = coordinator.reset();
        tx.send(SessionEvent::Reset {
            generation: coordinator.generation(),
            released,
        })
        .unwrap();
        tx.send(SessionEvent::Placed(stale)).unwrap();

        assert_eq!(mirror.drain(), 3);
        assert!(mirror.markers().is_empty());
        assert_eq!(mirror.markers().generation(), 1);
    }

    #[test]
    fn test_feed_forwarding_and_plan_submission() {
        let (session, events) = NavigationSession::spawn(NavigationConfig::default());
        let mut mirror = SceneMirror::new(events);
        let mut feed = LocationFeed::new();
        let (handle, fixes) = feed.subscribe();
        let forwarder = session.forward_fixes(fixes);

        feed.publish(fix(0));
        session.submit_plan(PlanEvent::NotReady { steps: route() }).unwrap();
        wait_for_state(&mut mirror, PlacementState::Building);

        let failed = session.submit_plan(PlanEvent::Failed(NavigationError::NoRoute));
        assert_eq!(failed, Err(NavigationError::NoRoute));

        feed.unsubscribe(handle);
        forwarder.join().unwrap();
    }
}
