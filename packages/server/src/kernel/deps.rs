//! Server dependencies for actions (using traits for testability)
//!
//! This module provides the central dependency container shared by HTTP handlers
//! and background scrape jobs. All external services use trait abstractions to
//! enable testing.

use std::sync::Arc;

use anyhow::Result;
use inference_client::InferenceClient;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::{Config, ScrapeSettings};
use crate::domains::scraping::dedup::DedupGateway;
use crate::domains::scraping::models::PostgresScrapedEntryStore;
use crate::domains::scraping::registry::JobStatusRegistry;
use crate::kernel::{
    ai::{CompletionClient, EmbeddingClient},
    page_fetcher::HttpPageFetcher,
    BaseAI, BaseEmbeddingService, BasePageFetcher, BaseScrapedEntryStore,
};

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub entries: Arc<dyn BaseScrapedEntryStore>,
    pub fetcher: Arc<dyn BasePageFetcher>,
    /// Completion provider. `None` when no key is configured; search then
    /// answers with a diagnostic string.
    pub ai: Option<Arc<dyn BaseAI>>,
    /// Embedding provider. `None` when no key is configured; search then
    /// fails with a configuration error.
    pub embeddings: Option<Arc<dyn BaseEmbeddingService>>,
    /// Live status of every owner's scrape job
    pub scrape_jobs: JobStatusRegistry,
    pub scrape_settings: ScrapeSettings,
}

impl ServerDeps {
    pub fn new(
        entries: Arc<dyn BaseScrapedEntryStore>,
        fetcher: Arc<dyn BasePageFetcher>,
        ai: Option<Arc<dyn BaseAI>>,
        embeddings: Option<Arc<dyn BaseEmbeddingService>>,
        scrape_settings: ScrapeSettings,
    ) -> Self {
        Self {
            entries,
            fetcher,
            ai,
            embeddings,
            scrape_jobs: JobStatusRegistry::new(),
            scrape_settings,
        }
    }

    /// Wire production implementations from configuration
    pub fn from_config(config: &Config, pool: PgPool) -> Result<Self> {
        let fetcher = HttpPageFetcher::new(config.scrape.fetch_timeout)?;

        let ai: Option<Arc<dyn BaseAI>> = match &config.groq_api_key {
            Some(key) => {
                info!(model = %config.completion_model, "Completion provider configured");
                let client = InferenceClient::new(key.clone(), config.groq_base_url.clone());
                Some(Arc::new(CompletionClient::new(
                    client,
                    config.completion_model.clone(),
                )))
            }
            None => {
                warn!("GROQ_API_KEY not set, search answers will be diagnostics only");
                None
            }
        };

        let embeddings: Option<Arc<dyn BaseEmbeddingService>> = match &config.embedding_api_key
        {
            Some(key) => {
                info!(model = %config.embedding_model, "Embedding provider configured");
                let client =
                    InferenceClient::new(key.clone(), config.embedding_base_url.clone());
                Some(Arc::new(EmbeddingClient::new(
                    client,
                    config.embedding_model.clone(),
                )))
            }
            None => {
                warn!("No embedding API key set, search is unavailable");
                None
            }
        };

        Ok(Self::new(
            Arc::new(PostgresScrapedEntryStore::new(pool)),
            Arc::new(fetcher),
            ai,
            embeddings,
            config.scrape.clone(),
        ))
    }

    /// Dedup gateway over the entry store
    pub fn dedup(&self) -> DedupGateway {
        DedupGateway::new(self.entries.clone())
    }
}
