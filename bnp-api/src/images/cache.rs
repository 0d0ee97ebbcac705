//! SQLite cache of resolved species images
//!
//! One row per `(provider, sci_name)`; writes are `INSERT OR REPLACE`.

use bnp_common::db::open_database;
use bnp_common::{Error, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use super::{BirdImage, ProviderKind};

#[derive(Debug, Clone)]
pub struct ImageCache {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct CachedRow {
    provider: String,
    image_url: String,
    title: Option<String>,
    external_id: Option<String>,
    author: Option<String>,
    author_url: Option<String>,
    license: Option<String>,
    license_url: Option<String>,
}

impl ImageCache {
    /// Open (creating if needed) the cache database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = open_database(path, true).await?;
        let cache = Self { pool };
        cache.create_schema().await?;
        info!("Opened image cache: {}", path.display());
        Ok(cache)
    }

    /// Cache backed by a single in-memory connection
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let cache = Self { pool };
        cache.create_schema().await?;
        Ok(cache)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                provider TEXT NOT NULL,
                sci_name TEXT NOT NULL,
                image_url TEXT NOT NULL,
                title TEXT,
                external_id TEXT,
                author TEXT,
                author_url TEXT,
                license TEXT,
                license_url TEXT,
                cached_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (provider, sci_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, provider: ProviderKind, sci_name: &str) -> Result<Option<BirdImage>> {
        let row: Option<CachedRow> = sqlx::query_as(
            r#"
            SELECT provider, image_url, title, external_id, author, author_url, license, license_url
            FROM images
            WHERE provider = ? AND sci_name = ?
            "#,
        )
        .bind(provider.as_str())
        .bind(sci_name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let source: ProviderKind = row.provider.parse().map_err(|_| {
            Error::Internal(format!("Unknown provider in image cache: {}", row.provider))
        })?;
        Ok(Some(BirdImage {
            url: row.image_url,
            title: row.title,
            author: row.author,
            author_url: row.author_url,
            license: row.license,
            license_url: row.license_url,
            external_id: row.external_id,
            source,
        }))
    }

    pub async fn upsert(&self, provider: ProviderKind, sci_name: &str, image: &BirdImage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO images
                (provider, sci_name, image_url, title, external_id, author, author_url,
                 license, license_url, cached_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(provider.as_str())
        .bind(sci_name)
        .bind(&image.url)
        .bind(&image.title)
        .bind(&image.external_id)
        .bind(&image.author)
        .bind(&image.author_url)
        .bind(&image.license)
        .bind(&image.license_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a cached row; true when one existed
    pub async fn remove(&self, provider: ProviderKind, sci_name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE provider = ? AND sci_name = ?")
            .bind(provider.as_str())
            .bind(sci_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
