//! Metric declarations for tile fetching and region assembly.
//!
//! Re-exports the `metrics` crate and declares every metric the workspace
//! emits as a [`Metric`] constant, so names are never spelled twice:
//!
//! ```rust
//! use tilesurf_metrics::{metric_defs, metrics};
//!
//! metrics::counter!(metric_defs::TILE_FALLBACKS.name, "reason" => "not_found").increment(1);
//! ```
//!
//! Without an installed recorder the macros are no-ops.

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "tilesurf.tile.fetched").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description)
            }
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Tiles fetched and decoded successfully.
    pub const TILE_FETCHED: Metric = Metric::counter("tilesurf.tile.fetched")
        .with_description("Tiles fetched and decoded successfully")
        .with_unit(Unit::Count)
        .with_labels(&["format"]);

    /// Tiles replaced by a zero-filled cell.
    ///
    /// Labels: format, reason (http, status, not_found, decode, parse, shape, cancelled)
    pub const TILE_FALLBACKS: Metric = Metric::counter("tilesurf.tile.fallbacks")
        .with_description("Tiles replaced by a zero-filled cell after a fetch failure")
        .with_unit(Unit::Count)
        .with_labels(&["format", "reason"]);

    /// Raw tile bytes received from a source.
    pub const TILE_BYTES: Metric = Metric::counter("tilesurf.tile.bytes")
        .with_description("Raw tile bytes received")
        .with_unit(Unit::Bytes);

    /// Number of tiles per assembled region.
    pub const REGION_TILES: Metric = Metric::histogram("tilesurf.region.tiles")
        .with_description("Number of tiles in each assembled region")
        .with_unit(Unit::Count);

    /// Wall time spent assembling a region.
    pub const REGION_ASSEMBLY_TIME: Metric = Metric::histogram("tilesurf.region.assembly_ms")
        .with_description("Wall time to fetch and stack one region")
        .with_unit(Unit::Milliseconds);

    /// Every metric, for bulk description.
    pub const ALL: &[Metric] = &[
        TILE_FETCHED,
        TILE_FALLBACKS,
        TILE_BYTES,
        REGION_TILES,
        REGION_ASSEMBLY_TIME,
    ];
}

/// Describes all metrics with the installed recorder.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::TILE_FALLBACKS.name, "tilesurf.tile.fallbacks");
        assert_eq!(metric_defs::TILE_FALLBACKS.kind, MetricKind::Counter);
        assert_eq!(metric_defs::TILE_FALLBACKS.labels, &["format", "reason"]);
        assert_eq!(metric_defs::TILE_BYTES.unit, Some(Unit::Bytes));
        assert_eq!(metric_defs::REGION_TILES.kind, MetricKind::Histogram);
    }

    #[test]
    fn test_metric_names_unique() {
        let names: HashSet<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(metric_defs::ALL.iter().all(|m| m.name.starts_with("tilesurf.")));
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::gauge("minimal");

        assert_eq!(MINIMAL.kind, MetricKind::Gauge);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
        assert_eq!(MINIMAL.kind.to_string(), "gauge");
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing is a no-op
        describe_metrics();
    }
}
