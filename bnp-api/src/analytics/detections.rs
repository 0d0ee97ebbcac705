//! Detection listings and summary statistics

use bnp_common::db::{Detection, DETECTION_COLUMNS};
use bnp_common::time::{format_date, format_timestamp, Clock};
use bnp_common::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::pagination::Page;

/// Optional exact-match filters for `list_detections`
#[derive(Debug, Clone, Default)]
pub struct DetectionFilter {
    pub date: Option<NaiveDate>,
    pub species: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DetectionPage {
    pub detections: Vec<Detection>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct TodaysDetections {
    pub detections: Vec<Detection>,
    pub date: NaiveDate,
}

/// Whole-log counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionSummary {
    pub total_count: i64,
    pub todays_count: i64,
    pub hour_count: i64,
    pub todays_species_tally: i64,
    pub species_tally: i64,
}

/// Paginated detections, newest first
///
/// `total` counts the whole filtered set, not just the returned page.
pub async fn list_detections(
    pool: &SqlitePool,
    filter: &DetectionFilter,
    page: Page,
) -> Result<DetectionPage> {
    let date = filter.date.map(format_date);
    let species = filter.species.as_deref();

    let where_clause = "WHERE (?1 IS NULL OR Date = ?1) AND (?2 IS NULL OR Sci_Name = ?2)";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM detections {}",
        where_clause
    ))
    .bind(&date)
    .bind(species)
    .fetch_one(pool)
    .await?;

    let detections: Vec<Detection> = sqlx::query_as(&format!(
        "SELECT {} FROM detections {} ORDER BY Date DESC, Time DESC LIMIT ?3 OFFSET ?4",
        DETECTION_COLUMNS, where_clause
    ))
    .bind(&date)
    .bind(species)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(DetectionPage {
        detections,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Look up the detection that owns an artifact file
pub async fn detection_by_file(pool: &SqlitePool, file_name: &str) -> Result<Detection> {
    sqlx::query_as(&format!(
        "SELECT {} FROM detections WHERE File_Name = ?",
        DETECTION_COLUMNS
    ))
    .bind(file_name)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Detection not found: {}", file_name)))
}

/// Detections recorded on the clock's current date, newest first
///
/// `search` matches a case-insensitive substring of either name; wildcard
/// characters in it are matched literally.
pub async fn todays_detections(
    pool: &SqlitePool,
    clock: &dyn Clock,
    search: Option<&str>,
    limit: i64,
) -> Result<TodaysDetections> {
    let today = clock.today();
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let detections: Vec<Detection> = sqlx::query_as(&format!(
        "SELECT {} FROM detections \
         WHERE Date = ?1 \
           AND (?2 IS NULL OR Com_Name LIKE ?2 ESCAPE '\\' OR Sci_Name LIKE ?2 ESCAPE '\\') \
         ORDER BY Time DESC LIMIT ?3",
        DETECTION_COLUMNS
    ))
    .bind(format_date(today))
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(TodaysDetections {
        detections,
        date: today,
    })
}

/// Most recent detection, or `None` on an empty log
pub async fn latest_detection(pool: &SqlitePool) -> Result<Option<Detection>> {
    let detection = sqlx::query_as(&format!(
        "SELECT {} FROM detections ORDER BY Date DESC, Time DESC LIMIT 1",
        DETECTION_COLUMNS
    ))
    .fetch_optional(pool)
    .await?;
    Ok(detection)
}

/// Totals for the whole log, today, and the trailing hour
pub async fn detection_stats(pool: &SqlitePool, clock: &dyn Clock) -> Result<DetectionSummary> {
    let now = clock.now();
    let today = format_date(now.date());
    let hour_ago = format_timestamp(now - Duration::hours(1));
    let now = format_timestamp(now);

    let (total_count, todays_count, hour_count, todays_species_tally, species_tally): (
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN Date = ?1 THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN (Date || ' ' || Time) BETWEEN ?2 AND ?3 THEN 1 ELSE 0 END), 0),
            COUNT(DISTINCT CASE WHEN Date = ?1 THEN Sci_Name END),
            COUNT(DISTINCT Sci_Name)
        FROM detections
        "#,
    )
    .bind(&today)
    .bind(&hour_ago)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    Ok(DetectionSummary {
        total_count,
        todays_count,
        hour_count,
        todays_species_tally,
        species_tally,
    })
}

/// Dates with at least one detection, newest first
pub async fn detection_dates(pool: &SqlitePool) -> Result<Vec<NaiveDate>> {
    let dates = sqlx::query_scalar("SELECT DISTINCT Date FROM detections ORDER BY Date DESC")
        .fetch_all(pool)
        .await?;
    Ok(dates)
}

/// Escape `LIKE` wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
