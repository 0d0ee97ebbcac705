//! Per-species rollups and detail views

use bnp_common::db::{Detection, DETECTION_COLUMNS};
use bnp_common::time::format_date;
use bnp_common::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::SqlitePool;
use std::str::FromStr;

use super::round_to;
use crate::pagination::Page;

/// Ordering for the species rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeciesSort {
    /// Most detections first
    #[default]
    Count,
    /// Highest max confidence first
    Confidence,
    /// Most recent earliest-detection first
    Date,
    /// Common name A-Z
    Name,
}

impl SpeciesSort {
    fn order_by(self) -> &'static str {
        match self {
            SpeciesSort::Count => "Count DESC, Sci_Name ASC",
            SpeciesSort::Confidence => "MaxConfidence DESC, Sci_Name ASC",
            SpeciesSort::Date => "Date DESC, Time DESC, Sci_Name ASC",
            SpeciesSort::Name => "Com_Name ASC, Sci_Name ASC",
        }
    }
}

impl FromStr for SpeciesSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "count" => Ok(SpeciesSort::Count),
            "confidence" => Ok(SpeciesSort::Confidence),
            "date" => Ok(SpeciesSort::Date),
            "name" => Ok(SpeciesSort::Name),
            other => Err(Error::InvalidInput(format!(
                "Unknown sort '{}', expected one of: count, confidence, date, name",
                other
            ))),
        }
    }
}

/// One species with its earliest detection in scope
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SpeciesSummary {
    #[serde(rename = "Date")]
    #[sqlx(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Time")]
    #[sqlx(rename = "Time")]
    pub time: NaiveTime,

    #[serde(rename = "File_Name")]
    #[sqlx(rename = "File_Name")]
    pub file_name: String,

    #[serde(rename = "Com_Name")]
    #[sqlx(rename = "Com_Name")]
    pub com_name: String,

    #[serde(rename = "Sci_Name")]
    #[sqlx(rename = "Sci_Name")]
    pub sci_name: String,

    #[serde(rename = "Count")]
    #[sqlx(rename = "Count")]
    pub count: i64,

    #[serde(rename = "MaxConfidence")]
    #[sqlx(rename = "MaxConfidence")]
    pub max_confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct SpeciesRollup {
    pub species: Vec<SpeciesSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SpeciesDetections {
    pub species: String,
    pub detections: Vec<Detection>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesStats {
    pub sci_name: String,
    pub com_name: String,
    pub total_detections: i64,
    pub days_detected: i64,
    pub first_detection: NaiveDate,
    pub last_detection: NaiveDate,
    pub avg_confidence: f64,
    pub max_confidence: f64,
}

/// One row per species, optionally limited to a single date
///
/// Each row carries the group's earliest (Date, Time, File_Name) detection.
pub async fn species_rollup(
    pool: &SqlitePool,
    sort: SpeciesSort,
    date: Option<NaiveDate>,
) -> Result<SpeciesRollup> {
    let sql = format!(
        r#"
        WITH scoped AS (
            SELECT * FROM detections WHERE (?1 IS NULL OR Date = ?1)
        ),
        ranked AS (
            SELECT
                Date, Time, File_Name, Com_Name, Sci_Name,
                ROW_NUMBER() OVER (PARTITION BY Sci_Name ORDER BY Date, Time, File_Name) AS rn,
                COUNT(*) OVER (PARTITION BY Sci_Name) AS Count,
                MAX(Confidence) OVER (PARTITION BY Sci_Name) AS MaxConfidence
            FROM scoped
        )
        SELECT Date, Time, File_Name, Com_Name, Sci_Name, Count, MaxConfidence
        FROM ranked
        WHERE rn = 1
        ORDER BY {}
        "#,
        sort.order_by()
    );

    let species: Vec<SpeciesSummary> = sqlx::query_as(&sql)
        .bind(date.map(format_date))
        .fetch_all(pool)
        .await?;

    Ok(SpeciesRollup {
        total: species.len(),
        species,
    })
}

/// Paginated detections of one species, newest first
pub async fn species_detections(
    pool: &SqlitePool,
    sci_name: &str,
    page: Page,
) -> Result<SpeciesDetections> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM detections WHERE Sci_Name = ?")
        .bind(sci_name)
        .fetch_one(pool)
        .await?;

    if total == 0 {
        return Err(Error::NotFound(format!("No detections for species: {}", sci_name)));
    }

    let detections: Vec<Detection> = sqlx::query_as(&format!(
        "SELECT {} FROM detections WHERE Sci_Name = ? ORDER BY Date DESC, Time DESC LIMIT ? OFFSET ?",
        DETECTION_COLUMNS
    ))
    .bind(sci_name)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(SpeciesDetections {
        species: sci_name.to_string(),
        detections,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Lifetime statistics for one species
pub async fn species_stats(pool: &SqlitePool, sci_name: &str) -> Result<SpeciesStats> {
    let row: (
        i64,
        i64,
        Option<NaiveDate>,
        Option<NaiveDate>,
        Option<f64>,
        Option<f64>,
        Option<String>,
    ) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(DISTINCT Date),
            MIN(Date),
            MAX(Date),
            AVG(Confidence),
            MAX(Confidence),
            MIN(Com_Name)
        FROM detections
        WHERE Sci_Name = ?
        "#,
    )
    .bind(sci_name)
    .fetch_one(pool)
    .await?;

    let (total, days, first, last, avg, max, com_name) = row;
    let (Some(first_detection), Some(last_detection)) = (first, last) else {
        return Err(Error::NotFound(format!("No detections for species: {}", sci_name)));
    };

    Ok(SpeciesStats {
        sci_name: sci_name.to_string(),
        com_name: com_name.unwrap_or_else(|| sci_name.to_string()),
        total_detections: total,
        days_detected: days,
        first_detection,
        last_detection,
        avg_confidence: round_to(avg.unwrap_or(0.0), 4),
        max_confidence: max.unwrap_or(0.0),
    })
}
