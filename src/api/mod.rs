//! Integration surface for the presentation layer
//!
//! Location subscription, background route planning, the threaded session
//! worker with its presentation-side mirror, and map and text output.

pub mod feed;
pub mod formatting;
pub mod overlay;
pub mod planner;
pub mod session;
pub mod types;

pub use feed::{LocationFeed, SubscriptionHandle};
pub use formatting::{format_batch, CsvFormatter, FormattedBatch, JsonFormatter, OutputFormat, PlacementRow, TextFormatter};
pub use overlay::{marker_annotations, region_for, route_annotations, AnnotationColor, MapAnnotation, OverlayRegion};
pub use planner::{DirectionsProvider, PlanHandle, RoutePlanner, StaticDirections};
pub use session::{NavigationSession, SceneMirror};
pub use types::{NavResult, NavigationError, PlanEvent, SessionCommand, SessionEvent};
