//! Map overlay data for the 2D route preview

use crate::core::{GeoPoint, Leg, RouteStep};
use crate::session::{MarkerCategory, MarkerSet};
use serde::Serialize;

/// Radius of the highlight circle drawn under each annotation (meters)
pub const HIGHLIGHT_RADIUS_M: f64 = 0.2;

/// Margin added around the annotation bounds when fitting the map
const REGION_PADDING: f64 = 1.2;

/// Smallest span used for the map region (degrees)
const MIN_REGION_SPAN_DEG: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationColor {
    Green,
    Blue,
}

impl From<MarkerCategory> for AnnotationColor {
    fn from(category: MarkerCategory) -> Self {
        match category {
            MarkerCategory::Step => AnnotationColor::Green,
            MarkerCategory::Waypoint => AnnotationColor::Blue,
        }
    }
}

/// A titled map pin with its highlight circle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapAnnotation {
    pub title: String,
    pub coordinate: GeoPoint,
    pub category: MarkerCategory,
    pub color: AnnotationColor,
    pub highlight_radius_m: f64,
}

impl MapAnnotation {
    pub fn new(title: impl Into<String>, coordinate: GeoPoint, category: MarkerCategory) -> Self {
        Self {
            title: title.into(),
            coordinate,
            category,
            color: category.into(),
            highlight_radius_m: HIGHLIGHT_RADIUS_M,
        }
    }
}

/// Map region to show: center plus latitude/longitude spans
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayRegion {
    pub center: GeoPoint,
    pub latitude_span_deg: f64,
    pub longitude_span_deg: f64,
}

/// Annotations for a route: steps first, then every leg waypoint
pub fn route_annotations(steps: &[RouteStep], legs: &[Leg]) -> Vec<MapAnnotation> {
    let step_pins = steps
        .iter()
        .map(|step| MapAnnotation::new(step.instruction.clone(), step.point, MarkerCategory::Step));
    let waypoint_pins = legs
        .iter()
        .flat_map(|leg| leg.points.iter())
        .map(|point| MapAnnotation::new(point.to_string(), *point, MarkerCategory::Waypoint));
    step_pins.chain(waypoint_pins).collect()
}

/// Annotations mirroring an existing marker set
pub fn marker_annotations(markers: &MarkerSet) -> Vec<MapAnnotation> {
    markers
        .iter()
        .map(|marker| MapAnnotation::new(marker.title.clone(), marker.location, marker.category))
        .collect()
}

/// Region covering every annotation and the optional observer position
pub fn region_for(annotations: &[MapAnnotation], observer: Option<GeoPoint>) -> Option<OverlayRegion> {
    let mut points = annotations.iter().map(|a| a.coordinate).chain(observer);
    let first = points.next()?;

    let (mut min_lat, mut max_lat) = (first.latitude(), first.latitude());
    let (mut min_lon, mut max_lon) = (first.longitude(), first.longitude());
    for point in points {
        min_lat = min_lat.min(point.latitude());
        max_lat = max_lat.max(point.latitude());
        min_lon = min_lon.min(point.longitude());
        max_lon = max_lon.max(point.longitude());
    }

    Some(OverlayRegion {
        center: GeoPoint::wrapped((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0),
        latitude_span_deg: ((max_lat - min_lat) * REGION_PADDING).clamp(MIN_REGION_SPAN_DEG, 180.0),
        longitude_span_deg: ((max_lon - min_lon) * REGION_PADDING).clamp(MIN_REGION_SPAN_DEG, 360.0),
    })
}
