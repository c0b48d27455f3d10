//! Placement output formatting
//!
//! Flattens a [`PlacementBatch`] into one row per marker and renders the
//! rows as human-readable text, JSON or CSV.

use crate::core::GeoPoint;
use crate::session::{MarkerCategory, MarkerSet, PlacementBatch};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Output format for placement reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}' (expected text, json or csv)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

/// One marker's placement, flattened for output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementRow {
    pub marker_id: usize,
    pub category: MarkerCategory,
    pub title: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub distance_m: f64,
    pub bearing_deg: f64,
    /// Scene position, meters east
    pub x_m: f64,
    /// Scene position, meters up
    pub y_m: f64,
    /// Scene position, meters south
    pub z_m: f64,
    pub scale: f64,
}

/// A batch ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedBatch {
    pub sequence: u32,
    pub generation: u64,
    pub origin: GeoPoint,
    pub degraded: bool,
    pub rows: Vec<PlacementRow>,
}

/// Join a batch with the marker metadata it refers to. Updates for markers
/// not in `markers` are skipped.
pub fn format_batch(sequence: u32, markers: &MarkerSet, batch: &PlacementBatch) -> FormattedBatch {
    let rows = batch
        .updates
        .iter()
        .filter_map(|update| {
            let marker = markers.get(update.id)?;
            let transform = &update.placement.transform;
            let t = transform.translation();
            Some(PlacementRow {
                marker_id: update.id.id(),
                category: marker.category,
                title: marker.title.clone(),
                latitude_deg: marker.location.latitude(),
                longitude_deg: marker.location.longitude(),
                distance_m: transform.distance_m,
                bearing_deg: transform.bearing_deg,
                x_m: t.x,
                y_m: t.y,
                z_m: t.z,
                scale: update.placement.scale,
            })
        })
        .collect();

    FormattedBatch {
        sequence,
        generation: batch.generation,
        origin: batch.origin,
        degraded: batch.degraded,
        rows,
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// One line per batch instead of one per marker
    pub compact: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_text(&self, batch: &FormattedBatch) -> String {
        let flag = if batch.degraded { " (degraded)" } else { "" };
        if self.compact {
            let nearest = batch
                .rows
                .iter()
                .map(|r| r.distance_m)
                .fold(f64::INFINITY, f64::min);
            return format!(
                "#{} gen {} from {}{}: {} markers, nearest {:.1} m",
                batch.sequence,
                batch.generation,
                batch.origin,
                flag,
                batch.rows.len(),
                nearest
            );
        }

        let mut output = format!(
            "Update #{} (generation {}) from {}{}\n",
            batch.sequence, batch.generation, batch.origin, flag
        );
        for row in &batch.rows {
            output.push_str(&format!(
                "  [{:>3}] {:<8} {:>8.1} m @ {:>5.1}°  xyz=({:.1}, {:.1}, {:.1})  scale {:.3}  {}\n",
                row.marker_id,
                row.category.label(),
                row.distance_m,
                row.bearing_deg,
                row.x_m,
                row.y_m,
                row.z_m,
                row.scale,
                row.title
            ));
        }
        output
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json(&self, batch: &FormattedBatch) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(batch)
        } else {
            serde_json::to_string(batch)
        }
    }
}

/// CSV formatter, one row per marker placement
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self { include_header: true }
    }
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> String {
        "sequence,generation,marker_id,category,latitude,longitude,distance_m,bearing_deg,x,y,z,scale,degraded".to_string()
    }

    pub fn format_csv(&self, batch: &FormattedBatch) -> String {
        batch
            .rows
            .iter()
            .map(|row| {
                format!(
                    "{},{},{},{},{:.7},{:.7},{:.3},{:.2},{:.3},{:.3},{:.3},{:.4},{}",
                    batch.sequence,
                    batch.generation,
                    row.marker_id,
                    row.category.label(),
                    row.latitude_deg,
                    row.longitude_deg,
                    row.distance_m,
                    row.bearing_deg,
                    row.x_m,
                    row.y_m,
                    row.z_m,
                    row.scale,
                    batch.degraded
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Leg, PositionFix, RouteStep};
    use crate::session::PlacementCoordinator;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn sample() -> FormattedBatch {
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(PositionFix::new(pt(0.0, 0.0), 4.0, 0).unwrap());
        coordinator.set_route(vec![RouteStep::new("Arrive", pt(0.0, 0.0002), 0)]);
        let batch = coordinator.place_markers().unwrap();
        format_batch(1, coordinator.markers(), &batch)
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "text");
    }

    #[test]
    fn test_rows_follow_marker_order() {
        let batch = sample();
        // 22.2 m leg: waypoints at 10 m and 20 m
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[0].title, "Arrive");
        assert_eq!(batch.rows[0].category, MarkerCategory::Step);
        assert!((batch.rows[0].x_m - batch.rows[0].distance_m).abs() < 1e-6);
        assert!((batch.rows[1].distance_m - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_markers_are_skipped() {
        let mut coordinator = PlacementCoordinator::default();
        coordinator.on_fix(PositionFix::new(pt(0.0, 0.0), 4.0, 0).unwrap());
        coordinator.set_route(vec![RouteStep::new("Arrive", pt(0.0, 0.0002), 0)]);
        let batch = coordinator.place_markers().unwrap();

        let other = MarkerSet::from_route(
            0,
            &[RouteStep::new("Only", pt(1.0, 1.0), 0)],
            &Vec::<Leg>::new(),
        );
        assert_eq!(format_batch(1, &other, &batch).rows.len(), 1);
    }

    #[test]
    fn test_text_and_csv_output() {
        let batch = sample();
        let text = TextFormatter::new().format_text(&batch);
        assert!(text.starts_with("Update #1 (generation 0)"));
        assert!(text.contains("Arrive"));
        assert_eq!(text.lines().count(), 4);

        let compact = TextFormatter { compact: true }.format_text(&batch);
        assert!(compact.contains("3 markers, nearest 10.0 m"));

        let csv = CsvFormatter::new();
        assert_eq!(csv.header().split(',').count(), 13);
        let rows = csv.format_csv(&batch);
        assert_eq!(rows.lines().count(), 3);
        assert!(rows.lines().all(|l| l.split(',').count() == 13));
    }

    #[test]
    fn test_json_output() {
        let json = JsonFormatter::new().format_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"][0]["category"], "Step");
        assert_eq!(value["degraded"], false);
    }
}
