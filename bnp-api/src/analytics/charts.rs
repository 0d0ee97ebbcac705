//! Hourly and daily histograms

use bnp_common::time::{format_date, Clock};
use bnp_common::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::warn;

use super::round_to;

pub const HOURS_PER_DAY: usize = 24;

/// Number of species reported in `ChartData::top_species`
pub const TOP_SPECIES_LIMIT: usize = 10;

/// Largest accepted window for a species chart series
pub const MAX_SERIES_DAYS: i64 = 365;

pub const DEFAULT_SERIES_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopSpecies {
    pub sci_name: String,
    pub com_name: String,
    pub count: i64,
    pub max_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesHourly {
    pub com_name: String,
    pub hourly: [i64; HOURS_PER_DAY],
}

/// Hourly view of a single day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub date: NaiveDate,
    pub hourly: [i64; HOURS_PER_DAY],
    pub top_species: Vec<TopSpecies>,
    pub species_hourly: BTreeMap<String, SpeciesHourly>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Daily counts for one species
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesChartSeries {
    pub species: String,
    pub com_name: String,
    pub days: i64,
    pub data: Vec<DailyCount>,
}

/// One (species, hour) cell as grouped by the store
#[derive(Debug, Clone, sqlx::FromRow)]
struct HourBucket {
    sci_name: String,
    com_name: String,
    hour: Option<i64>,
    count: i64,
    max_confidence: Option<f64>,
}

/// Hourly totals, top species and per-species hourly matrix for `date`
pub async fn chart_data(pool: &SqlitePool, date: NaiveDate) -> Result<ChartData> {
    let buckets: Vec<HourBucket> = sqlx::query_as(
        r#"
        SELECT
            Sci_Name AS sci_name,
            MIN(Com_Name) AS com_name,
            CAST(substr(Time, 1, 2) AS INTEGER) AS hour,
            COUNT(*) AS count,
            MAX(Confidence) AS max_confidence
        FROM detections
        WHERE Date = ?
        GROUP BY Sci_Name, hour
        ORDER BY Sci_Name, hour
        "#,
    )
    .bind(format_date(date))
    .fetch_all(pool)
    .await?;

    Ok(build_chart(date, buckets))
}

fn build_chart(date: NaiveDate, buckets: Vec<HourBucket>) -> ChartData {
    let mut hourly = [0i64; HOURS_PER_DAY];
    let mut species_hourly: BTreeMap<String, SpeciesHourly> = BTreeMap::new();
    let mut totals: BTreeMap<String, TopSpecies> = BTreeMap::new();

    for bucket in buckets {
        let hour = match bucket.hour {
            Some(h) if (0..HOURS_PER_DAY as i64).contains(&h) => h as usize,
            other => {
                warn!(sci_name = %bucket.sci_name, hour = ?other, "Skipping detections with unparseable time");
                continue;
            }
        };

        hourly[hour] += bucket.count;

        species_hourly
            .entry(bucket.sci_name.clone())
            .or_insert_with(|| SpeciesHourly {
                com_name: bucket.com_name.clone(),
                hourly: [0; HOURS_PER_DAY],
            })
            .hourly[hour] += bucket.count;

        let confidence = bucket.max_confidence.unwrap_or(0.0);
        let entry = totals
            .entry(bucket.sci_name.clone())
            .or_insert_with(|| TopSpecies {
                sci_name: bucket.sci_name,
                com_name: bucket.com_name,
                count: 0,
                max_confidence: confidence,
            });
        entry.count += bucket.count;
        entry.max_confidence = entry.max_confidence.max(confidence);
    }

    // BTreeMap iteration is already sci_name ascending, so a stable sort on
    // count keeps that as the tie-break.
    let mut top_species: Vec<TopSpecies> = totals.into_values().collect();
    top_species.sort_by(|a, b| b.count.cmp(&a.count));
    top_species.truncate(TOP_SPECIES_LIMIT);
    for species in &mut top_species {
        species.max_confidence = round_to(species.max_confidence, 2);
    }

    ChartData {
        date,
        hourly,
        top_species,
        species_hourly,
    }
}

/// Daily detection counts for `sci_name` from `today - days` onward, ascending
pub async fn species_chart_series(
    pool: &SqlitePool,
    clock: &dyn Clock,
    sci_name: &str,
    days: i64,
) -> Result<SpeciesChartSeries> {
    if !(1..=MAX_SERIES_DAYS).contains(&days) {
        return Err(Error::InvalidInput(format!(
            "days must be between 1 and {}, got {}",
            MAX_SERIES_DAYS, days
        )));
    }

    let since = clock.today() - Duration::days(days);

    let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT Date, COUNT(*)
        FROM detections
        WHERE Sci_Name = ? AND Date >= ?
        GROUP BY Date
        ORDER BY Date ASC
        "#,
    )
    .bind(sci_name)
    .bind(format_date(since))
    .fetch_all(pool)
    .await?;

    let com_name: Option<String> = sqlx::query_scalar(
        "SELECT Com_Name FROM detections WHERE Sci_Name = ? ORDER BY Date, Time LIMIT 1",
    )
    .bind(sci_name)
    .fetch_optional(pool)
    .await?;

    Ok(SpeciesChartSeries {
        species: sci_name.to_string(),
        com_name: com_name.unwrap_or_else(|| sci_name.to_string()),
        days,
        data: rows
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{insert, store};
    use bnp_common::time::FixedClock;

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn test_chart_hourly_scenario() {
        let pool = store().await;
        for time in ["06:00:00", "06:30:00", "14:00:00"] {
            insert(&pool, "2024-05-01", time, "Turdus migratorius", "American Robin", 0.876).await;
        }

        let chart = chart_data(&pool, may_first()).await.unwrap();

        assert_eq!(chart.hourly.len(), 24);
        assert_eq!(chart.hourly[6], 2);
        assert_eq!(chart.hourly[14], 1);
        assert_eq!(chart.hourly.iter().sum::<i64>(), 3);
        assert_eq!(chart.top_species.len(), 1);
        assert_eq!(chart.top_species[0].count, 3);
        assert_eq!(chart.top_species[0].max_confidence, 0.88);

        let robin = &chart.species_hourly["Turdus migratorius"];
        assert_eq!(robin.com_name, "American Robin");
        assert_eq!(robin.hourly[6], 2);
    }

    #[tokio::test]
    async fn test_chart_empty_day_is_zero_filled() {
        let pool = store().await;
        let chart = chart_data(&pool, may_first()).await.unwrap();
        assert_eq!(chart.hourly, [0; 24]);
        assert!(chart.top_species.is_empty());
        assert!(chart.species_hourly.is_empty());
    }

    #[tokio::test]
    async fn test_top_species_ties_break_on_scientific_name() {
        let pool = store().await;
        insert(&pool, "2024-05-01", "06:00:00", "Zenaida macroura", "Mourning Dove", 0.8).await;
        insert(&pool, "2024-05-01", "06:00:00", "Anas platyrhynchos", "Mallard", 0.8).await;
        insert(&pool, "2024-05-01", "07:00:00", "Poecile atricapillus", "Black-capped Chickadee", 0.8).await;
        insert(&pool, "2024-05-01", "08:00:00", "Poecile atricapillus", "Black-capped Chickadee", 0.8).await;

        let chart = chart_data(&pool, may_first()).await.unwrap();
        let order: Vec<&str> = chart.top_species.iter().map(|s| s.sci_name.as_str()).collect();
        assert_eq!(
            order,
            vec!["Poecile atricapillus", "Anas platyrhynchos", "Zenaida macroura"]
        );
    }

    #[tokio::test]
    async fn test_top_species_capped_at_ten() {
        let pool = store().await;
        for i in 0..12 {
            let sci = format!("Species number{:02}", i);
            insert(&pool, "2024-05-01", "09:00:00", &sci, &format!("Bird {}", i), 0.7).await;
        }
        let chart = chart_data(&pool, may_first()).await.unwrap();
        assert_eq!(chart.top_species.len(), TOP_SPECIES_LIMIT);
        assert_eq!(chart.species_hourly.len(), 12);
        assert_eq!(chart.hourly[9], 12);
    }

    #[tokio::test]
    async fn test_species_chart_series_window() {
        let pool = store().await;
        insert(&pool, "2024-04-20", "06:00:00", "Turdus migratorius", "American Robin", 0.9).await;
        insert(&pool, "2024-04-28", "06:00:00", "Turdus migratorius", "American Robin", 0.9).await;
        insert(&pool, "2024-04-28", "07:00:00", "Turdus migratorius", "American Robin", 0.9).await;
        insert(&pool, "2024-05-01", "06:00:00", "Turdus migratorius", "American Robin", 0.9).await;

        let clock = FixedClock(may_first().and_hms_opt(12, 0, 0).unwrap());
        let series = species_chart_series(&pool, &clock, "Turdus migratorius", 7)
            .await
            .unwrap();

        assert_eq!(series.com_name, "American Robin");
        assert_eq!(
            series.data,
            vec![
                DailyCount { date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(), count: 2 },
                DailyCount { date: may_first(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_species_chart_series_validates_days() {
        let pool = store().await;
        let clock = FixedClock(may_first().and_hms_opt(12, 0, 0).unwrap());
        for days in [0, 366] {
            assert!(matches!(
                species_chart_series(&pool, &clock, "Turdus migratorius", days).await,
                Err(Error::InvalidInput(_))
            ));
        }

        let unknown = species_chart_series(&pool, &clock, "Nonexistens", 7).await.unwrap();
        assert_eq!(unknown.com_name, "Nonexistens");
        assert!(unknown.data.is_empty());
    }
}
