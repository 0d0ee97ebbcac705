//! Aggregation engine over the detection log
//!
//! Read operations are side-effect-free queries that may run concurrently;
//! deletions are single statements or a single transaction followed by
//! best-effort artifact cleanup.

pub mod charts;
pub mod deletion;
pub mod detections;
pub mod ebird;
pub mod species;

pub use charts::{chart_data, species_chart_series, ChartData, SpeciesChartSeries};
pub use deletion::{delete_detection, delete_species, DetectionDeletion, SpeciesDeletion};
pub use detections::{
    detection_by_file, detection_dates, detection_stats, latest_detection, list_detections,
    todays_detections, DetectionFilter, DetectionPage, DetectionSummary, TodaysDetections,
};
pub use ebird::{export_ebird, EbirdExport, DEFAULT_MIN_CONFIDENCE};
pub use species::{
    species_detections, species_rollup, species_stats, SpeciesDetections, SpeciesRollup,
    SpeciesSort, SpeciesStats, SpeciesSummary,
};

/// Round to a fixed number of decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
