//! Scraped Entry - one stored page per normalized URL
//!
//! Rows are written once by a scrape job and never updated. The `url` column
//! carries a UNIQUE constraint, so a concurrent insert of the same page loses
//! quietly instead of creating a second row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::scraping::extractor::ExtractedPage;
use crate::domains::scraping::normalize::normalize_url;
use crate::kernel::BaseScrapedEntryStore;

// Column widths from the migration
const NAME_MAX_CHARS: usize = 255;
const META_TITLE_MAX_CHARS: usize = 255;
const META_KEYWORDS_MAX_CHARS: usize = 500;
/// Longest storable URL, after normalization. Longer URLs are refused, never cut.
pub const URL_MAX_CHARS: usize = 2000;
pub const OWNER_ID_MAX_CHARS: usize = 50;

/// How a page was reached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeMode {
    Single,
    Sitemap,
}

impl ScrapeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeMode::Single => "single",
            ScrapeMode::Sitemap => "sitemap",
        }
    }
}

impl std::fmt::Display for ScrapeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScrapeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(ScrapeMode::Single),
            "sitemap" => Ok(ScrapeMode::Sitemap),
            _ => Err(anyhow::anyhow!(
                "Invalid scrape mode. Please choose 'single' or 'sitemap'."
            )),
        }
    }
}

/// Stored page
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScrapedEntry {
    pub id: Uuid,
    pub url: String,
    pub name: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub scraped_by_user_id: String,
    pub scrape_mode: String,
    pub scraped_at: DateTime<Utc>,
    pub content_summary: Option<String>,
}

/// Insert payload. Construct through [`NewScrapedEntry::from_page`] so the URL
/// is normalized and fields fit their columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScrapedEntry {
    pub url: String,
    pub name: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub scraped_by_user_id: String,
    pub scrape_mode: ScrapeMode,
    pub content_summary: Option<String>,
}

impl NewScrapedEntry {
    pub fn from_page(page: &ExtractedPage, owner_id: &str, mode: ScrapeMode) -> Self {
        Self {
            url: normalize_url(&page.url),
            name: page.name.as_deref().map(|v| truncate_chars(v, NAME_MAX_CHARS)),
            meta_title: page
                .meta_title
                .as_deref()
                .map(|v| truncate_chars(v, META_TITLE_MAX_CHARS)),
            meta_description: page.meta_description.clone(),
            meta_keywords: page
                .meta_keywords
                .as_deref()
                .map(|v| truncate_chars(v, META_KEYWORDS_MAX_CHARS)),
            scraped_by_user_id: owner_id.to_string(),
            scrape_mode: mode,
            content_summary: Some(page.content.clone()),
        }
    }
}

/// Whether `url` can be stored and looked up under its normalized form
pub fn fits_url_column(url: &str) -> bool {
    normalize_url(url).chars().count() <= URL_MAX_CHARS
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

impl ScrapedEntry {
    /// Check whether a row exists for an already-normalized URL
    pub async fn exists_by_url(url: &str, pool: &PgPool) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM scraped_data_entries WHERE url = $1)",
        )
        .bind(url)
        .fetch_one(pool)
        .await
        .context("Failed to check scraped entry existence")
    }

    /// Insert a new row. Returns `None` when the URL is already stored.
    pub async fn insert(entry: &NewScrapedEntry, pool: &PgPool) -> Result<Option<Self>> {
        let inserted = sqlx::query_as::<_, Self>(
            "INSERT INTO scraped_data_entries (
                id, url, name, meta_title, meta_description, meta_keywords,
                scraped_by_user_id, scrape_mode, content_summary, scraped_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
             ON CONFLICT (url) DO NOTHING
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&entry.url)
        .bind(&entry.name)
        .bind(&entry.meta_title)
        .bind(&entry.meta_description)
        .bind(&entry.meta_keywords)
        .bind(&entry.scraped_by_user_id)
        .bind(entry.scrape_mode.as_str())
        .bind(&entry.content_summary)
        .fetch_optional(pool)
        .await
        .context("Failed to insert scraped entry")?;

        Ok(inserted)
    }

    /// Distinct, non-empty content summaries (the search corpus)
    pub async fn distinct_content_summaries(pool: &PgPool) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT content_summary
             FROM scraped_data_entries
             WHERE content_summary IS NOT NULL AND content_summary <> ''",
        )
        .fetch_all(pool)
        .await
        .context("Failed to load content summaries")
    }

    /// Most recently scraped entries first
    pub async fn list_recent(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM scraped_data_entries
             ORDER BY scraped_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list scraped entries")
    }
}

/// Postgres implementation of the scraped entry store
#[derive(Clone)]
pub struct PostgresScrapedEntryStore {
    pool: PgPool,
}

impl PostgresScrapedEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseScrapedEntryStore for PostgresScrapedEntryStore {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        ScrapedEntry::exists_by_url(url, &self.pool).await
    }

    async fn insert(&self, entry: &NewScrapedEntry) -> Result<bool> {
        Ok(ScrapedEntry::insert(entry, &self.pool).await?.is_some())
    }

    async fn content_summaries(&self) -> Result<Vec<String>> {
        ScrapedEntry::distinct_content_summaries(&self.pool).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ScrapedEntry>> {
        ScrapedEntry::list_recent(limit, &self.pool).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
