//! Common API types: errors, planner events and session messages

use crate::core::{GeoError, Leg, PositionFix, RouteStep};
use crate::session::{MarkerId, MarkerSet, PlacementBatch, PlacementState};
use crate::utils::config::ConfigError;

/// Result type for session and planner operations
pub type NavResult<T> = Result<T, NavigationError>;

/// Errors reported to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    /// The directions provider could not produce a route
    DirectionsFailed { reason: String },
    /// The directions provider returned no steps
    NoRoute,
    /// A command arrived in a state that cannot accept it
    SessionBusy { state: PlacementState },
    /// Planned legs do not match the route (one non-empty leg list per step)
    LegsRejected { legs: usize, steps: usize },
    /// A background worker is gone
    WorkerDisconnected,
    /// Invalid geographic input
    Geo(GeoError),
    /// Invalid configuration
    Config(ConfigError),
}

impl From<GeoError> for NavigationError {
    fn from(error: GeoError) -> Self {
        NavigationError::Geo(error)
    }
}

impl From<ConfigError> for NavigationError {
    fn from(error: ConfigError) -> Self {
        NavigationError::Config(error)
    }
}

impl std::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationError::DirectionsFailed { reason } => write!(f, "Directions lookup failed: {}", reason),
            NavigationError::NoRoute => write!(f, "No route to the selected destination"),
            NavigationError::SessionBusy { state } => {
                write!(f, "Session cannot accept a route while {}", state.label())
            }
            NavigationError::LegsRejected { legs, steps } => {
                write!(f, "Cannot install {} legs for a route of {} steps", legs, steps)
            }
            NavigationError::WorkerDisconnected => write!(f, "Background worker disconnected"),
            NavigationError::Geo(e) => write!(f, "Geographic input error: {}", e),
            NavigationError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for NavigationError {}

/// Completion signal of a route planning request
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    /// Directions fetched and legs built
    LegsReady { steps: Vec<RouteStep>, legs: Vec<Leg> },
    /// Directions fetched but no origin was known to build legs from
    NotReady { steps: Vec<RouteStep> },
    /// Directions lookup failed
    Failed(NavigationError),
}

/// Work items for the session worker, processed in arrival order
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Fix(PositionFix),
    Route(Vec<RouteStep>),
    Legs { steps: Vec<RouteStep>, legs: Vec<Leg> },
    Place,
    Reset,
    Shutdown,
}

/// Results handed from the session worker to the presentation thread
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Markers were created for a freshly built route
    MarkersBuilt(MarkerSet),
    /// New placements for the current markers
    Placed(PlacementBatch),
    /// Session cleared; the listed anchors must be released
    Reset { generation: u64, released: Vec<MarkerId> },
    StateChanged { from: PlacementState, to: PlacementState },
    Error(NavigationError),
}
