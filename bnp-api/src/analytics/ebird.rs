//! eBird checklist export
//!
//! A day's detections are reduced to at most one row per species per hour
//! and rendered in eBird's record format.

use bnp_common::time::format_date;
use bnp_common::{Error, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.75;

const CSV_HEADER: [&str; 7] = [
    "Common Name",
    "Scientific Name",
    "Count",
    "Location",
    "Date",
    "Time",
    "Notes",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EbirdExport {
    pub date: NaiveDate,
    /// Species-hour rows in the CSV (a species seen in three hours counts three times)
    pub species_count: usize,
    pub csv: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct Candidate {
    #[sqlx(rename = "Sci_Name")]
    sci_name: String,
    #[sqlx(rename = "Com_Name")]
    com_name: String,
    #[sqlx(rename = "Time")]
    time: NaiveTime,
    #[sqlx(rename = "Confidence")]
    confidence: f64,
}

/// Export `date` as an eBird CSV
///
/// Only detections with `Confidence >= min_confidence` are considered; the
/// first one (by time) of each species within each hour is kept.
pub async fn export_ebird(
    pool: &SqlitePool,
    date: NaiveDate,
    min_confidence: f64,
    location: &str,
) -> Result<EbirdExport> {
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(Error::InvalidInput(format!(
            "min_confidence must be between 0 and 1, got {}",
            min_confidence
        )));
    }

    let candidates: Vec<Candidate> = sqlx::query_as(
        r#"
        SELECT Sci_Name, Com_Name, Time, Confidence
        FROM detections
        WHERE Date = ? AND Confidence >= ?
        ORDER BY Sci_Name, Time
        "#,
    )
    .bind(format_date(date))
    .bind(min_confidence)
    .fetch_all(pool)
    .await?;

    let kept = first_per_hour(candidates);
    let csv = render_csv(&kept, date, location)?;

    Ok(EbirdExport {
        date,
        species_count: kept.len(),
        csv,
    })
}

/// Keep the first candidate per (species, hour), preserving input order
fn first_per_hour(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<(String, u32)> = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert((c.sci_name.clone(), c.time.hour())))
        .collect()
}

fn render_csv(rows: &[Candidate], date: NaiveDate, location: &str) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let date = format_date(date);
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for row in rows {
        let time = row.time.format("%H:%M").to_string();
        let notes = format!("BirdNET detection (confidence: {:.2})", row.confidence);
        writer
            .write_record([
                row.com_name.as_str(),
                row.sci_name.as_str(),
                "1",
                location,
                date.as_str(),
                time.as_str(),
                notes.as_str(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::Internal(format!("CSV is not UTF-8: {}", e)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Internal(format!("CSV write failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{insert, store};

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn test_export_dedupes_species_per_hour() {
        let pool = store().await;
        insert(&pool, "2024-05-01", "06:05:00", "Turdus migratorius", "American Robin", 0.91).await;
        insert(&pool, "2024-05-01", "06:45:00", "Turdus migratorius", "American Robin", 0.99).await;
        insert(&pool, "2024-05-01", "07:10:00", "Turdus migratorius", "American Robin", 0.85).await;
        insert(&pool, "2024-05-01", "06:20:00", "Cardinalis cardinalis", "Northern Cardinal", 0.80).await;

        let export = export_ebird(&pool, may_first(), 0.75, "Backyard").await.unwrap();

        assert_eq!(export.species_count, 3);

        let lines: Vec<&str> = export.csv.lines().collect();
        assert_eq!(lines[0], "Common Name,Scientific Name,Count,Location,Date,Time,Notes");
        assert_eq!(
            lines[1],
            "Northern Cardinal,Cardinalis cardinalis,1,Backyard,2024-05-01,06:20,BirdNET detection (confidence: 0.80)"
        );
        assert_eq!(
            lines[2],
            "American Robin,Turdus migratorius,1,Backyard,2024-05-01,06:05,BirdNET detection (confidence: 0.91)"
        );
        assert!(lines[3].contains(",07:10,"));
        assert_eq!(lines.len(), 4);
    }

    #[tokio::test]
    async fn test_export_threshold_excludes_lower_confidence() {
        let pool = store().await;
        insert(&pool, "2024-05-01", "06:05:00", "Turdus migratorius", "American Robin", 0.8).await;

        let export = export_ebird(&pool, may_first(), 0.9, "Backyard").await.unwrap();
        assert_eq!(export.species_count, 0);
        assert_eq!(export.csv.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_export_quotes_location() {
        let pool = store().await;
        insert(&pool, "2024-05-01", "06:05:00", "Turdus migratorius", "American Robin", 0.8).await;

        let export = export_ebird(&pool, may_first(), 0.75, "Home, \"North\" field")
            .await
            .unwrap();
        assert!(export.csv.contains("\"Home, \"\"North\"\" field\""));
    }

    #[tokio::test]
    async fn test_export_rejects_out_of_range_threshold() {
        let pool = store().await;
        for bad in [-0.1, 1.5] {
            assert!(matches!(
                export_ebird(&pool, may_first(), bad, "Backyard").await,
                Err(Error::InvalidInput(_))
            ));
        }
    }
}
