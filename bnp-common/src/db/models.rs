//! Database models

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Column list matching `Detection`'s `FromRow` mapping
pub const DETECTION_COLUMNS: &str =
    "Date, Time, Sci_Name, Com_Name, Confidence, Lat, Lon, Cutoff, Week, Sens, Overlap, File_Name";

/// One classified acoustic event, as written by the classifier
///
/// Serialized with the store's column names so existing clients keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Detection {
    #[serde(rename = "Date")]
    #[sqlx(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Time")]
    #[sqlx(rename = "Time")]
    pub time: NaiveTime,

    #[serde(rename = "Sci_Name")]
    #[sqlx(rename = "Sci_Name")]
    pub sci_name: String,

    #[serde(rename = "Com_Name")]
    #[sqlx(rename = "Com_Name")]
    pub com_name: String,

    #[serde(rename = "Confidence")]
    #[sqlx(rename = "Confidence")]
    pub confidence: f64,

    #[serde(rename = "Lat")]
    #[sqlx(rename = "Lat")]
    pub lat: Option<f64>,

    #[serde(rename = "Lon")]
    #[sqlx(rename = "Lon")]
    pub lon: Option<f64>,

    #[serde(rename = "Cutoff")]
    #[sqlx(rename = "Cutoff")]
    pub cutoff: Option<f64>,

    #[serde(rename = "Week")]
    #[sqlx(rename = "Week")]
    pub week: Option<i64>,

    #[serde(rename = "Sens")]
    #[sqlx(rename = "Sens")]
    pub sensitivity: Option<f64>,

    #[serde(rename = "Overlap")]
    #[sqlx(rename = "Overlap")]
    pub overlap: Option<f64>,

    #[serde(rename = "File_Name")]
    #[sqlx(rename = "File_Name")]
    pub file_name: String,
}
