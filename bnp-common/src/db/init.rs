//! Detection store connection and schema
//!
//! The classifier owns the `detections` table; this service normally opens an
//! existing database. Schema creation exists for first-run development and tests.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How long a statement waits on a locked database before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open an existing detection database for reads and deletions
pub async fn connect_detection_store(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::Unavailable(format!(
            "Detection database not found: {}",
            db_path.display()
        )));
    }

    let pool = open_database(db_path, false).await?;
    info!("Opened detection database: {}", db_path.display());
    Ok(pool)
}

/// Open (creating if needed) a detection database and ensure its schema
pub async fn init_detection_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = open_database(db_path, true).await?;
    create_detections_table(&pool).await?;

    if newly_created {
        info!("Initialized new detection database: {}", db_path.display());
    } else {
        info!("Opened existing detection database: {}", db_path.display());
    }

    Ok(pool)
}

/// Single-connection in-memory detection store with schema applied
///
/// A single connection keeps every query on the same in-memory database.
pub async fn in_memory_detection_store() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_detections_table(&pool).await?;
    Ok(pool)
}

/// Open a SQLite database file with the service's standard options
pub async fn open_database(db_path: &Path, create: bool) -> Result<SqlitePool> {
    let mode = if create { "rwc" } else { "rw" };
    let db_url = format!("sqlite://{}?mode={}", db_path.display(), mode);

    let options = SqliteConnectOptions::from_str(&db_url)?.busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the `detections` table as laid out by BirdNET-Pi
pub async fn create_detections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS detections (
            Date DATE,
            Time TIME,
            Sci_Name VARCHAR(100) NOT NULL,
            Com_Name VARCHAR(100) NOT NULL,
            Confidence FLOAT,
            Lat FLOAT,
            Lon FLOAT,
            Cutoff FLOAT,
            Week INT,
            Sens FLOAT,
            Overlap FLOAT,
            File_Name VARCHAR(100) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS detections_Com_Name ON detections (Com_Name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS detections_Sci_Name ON detections (Sci_Name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS detections_Date_Time ON detections (Date DESC, Time DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS detections_File_Name ON detections (File_Name)")
        .execute(pool)
        .await?;

    Ok(())
}
