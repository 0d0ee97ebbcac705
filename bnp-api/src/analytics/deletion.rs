//! Detection and species deletion with artifact cleanup
//!
//! Rows are removed first; artifact removal afterwards is best effort and
//! reported, never fatal.

use bnp_common::time::format_date;
use bnp_common::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::artifacts;

#[derive(Debug, Serialize)]
pub struct DetectionDeletion {
    pub file_name: String,
    pub deleted_files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SpeciesDeletion {
    pub sci_name: String,
    pub deleted_rows: u64,
    pub deleted_directories: Vec<PathBuf>,
}

/// Delete the detection owning `file_name` and its audio/spectrogram files
pub async fn delete_detection(
    pool: &SqlitePool,
    by_date: &Path,
    file_name: &str,
) -> Result<DetectionDeletion> {
    let date: Option<NaiveDate> =
        sqlx::query_scalar("DELETE FROM detections WHERE File_Name = ? RETURNING Date")
            .bind(file_name)
            .fetch_optional(pool)
            .await?;

    let date = date.ok_or_else(|| Error::NotFound(format!("Detection not found: {}", file_name)))?;
    info!(file_name = %file_name, date = %date, "Deleted detection");

    let deleted_files = match artifacts::detection_artifacts(by_date, date, file_name) {
        Some(paths) => artifacts::remove_files(&paths).await,
        None => {
            warn!(file_name = %file_name, "Skipping artifact cleanup for unsafe file name");
            Vec::new()
        }
    };

    Ok(DetectionDeletion {
        file_name: file_name.to_string(),
        deleted_files,
    })
}

/// Delete every detection of `sci_name` and the per-date species folders
pub async fn delete_species(
    pool: &SqlitePool,
    by_date: &Path,
    sci_name: &str,
) -> Result<SpeciesDeletion> {
    let mut tx = pool.begin().await?;

    let rows: Vec<(NaiveDate, String)> =
        sqlx::query_as("SELECT DISTINCT Date, File_Name FROM detections WHERE Sci_Name = ?")
            .bind(sci_name)
            .fetch_all(&mut *tx)
            .await?;

    let deleted_rows = sqlx::query("DELETE FROM detections WHERE Sci_Name = ?")
        .bind(sci_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted_rows == 0 {
        return Err(Error::NotFound(format!("No detections for species: {}", sci_name)));
    }
    tx.commit().await?;

    info!(sci_name = %sci_name, rows = deleted_rows, "Deleted species");

    let mut folders: BTreeSet<(NaiveDate, String)> = BTreeSet::new();
    for (date, file_name) in rows {
        match artifacts::species_folder(&file_name) {
            Some(folder) => {
                folders.insert((date, folder));
            }
            None => warn!(file_name = %file_name, "Skipping artifact cleanup for unsafe file name"),
        }
    }

    let dirs: Vec<PathBuf> = folders
        .into_iter()
        .map(|(date, folder)| by_date.join(format_date(date)).join(folder))
        .collect();
    let deleted_directories = artifacts::remove_dirs(&dirs).await;

    Ok(SpeciesDeletion {
        sci_name: sci_name.to_string(),
        deleted_rows,
        deleted_directories,
    })
}
