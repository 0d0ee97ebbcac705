//! HTTP API handlers for bnp-api

pub mod detections;
pub mod ebird;
pub mod health;
pub mod images;
pub mod labels;
pub mod media;
pub mod settings;
pub mod species;
pub mod species_lists;

pub use detections::detection_routes;
pub use ebird::ebird_routes;
pub use health::health_routes;
pub use images::image_routes;
pub use labels::label_routes;
pub use media::media_routes;
pub use settings::settings_routes;
pub use species::species_routes;
pub use species_lists::species_list_routes;

use bnp_common::{time, Error};
use chrono::NaiveDate;

use crate::error::ApiError;

/// Parse a `YYYY-MM-DD` path or query value
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    time::parse_date(value).ok_or_else(|| {
        Error::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", value)).into()
    })
}

/// Treat absent and blank query values alike
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
