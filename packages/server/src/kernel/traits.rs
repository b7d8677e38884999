// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (matching, scrape orchestration) lives in domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseEmbeddingService)

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::scraping::models::{NewScrapedEntry, ScrapedEntry};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

/// Sampling knobs for a single completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 100,
        }
    }
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a user prompt under a system instruction (returns raw text response)
    async fn complete_with_system(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String>;

    /// Complete a prompt with no system instruction
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.complete_with_system("", prompt, CompletionOptions::default())
            .await
    }
}

// =============================================================================
// Embedding Service Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseEmbeddingService: Send + Sync {
    /// Generate embedding for text
    async fn generate(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for many texts, in input order
    async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.generate(text).await?);
        }
        Ok(embeddings)
    }
}

// =============================================================================
// Page Fetcher Trait (Infrastructure - raw HTTP GET)
// =============================================================================

/// Body of a successful GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait BasePageFetcher: Send + Sync {
    /// GET a URL. Non-2xx responses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

// =============================================================================
// Scraped Entry Store Trait (Infrastructure - persistence)
// =============================================================================

#[async_trait]
pub trait BaseScrapedEntryStore: Send + Sync {
    /// Whether a row exists for an already-normalized URL
    async fn exists_by_url(&self, url: &str) -> Result<bool>;

    /// Insert a row. `Ok(false)` when the URL was already stored.
    async fn insert(&self, entry: &NewScrapedEntry) -> Result<bool>;

    /// Distinct non-empty content summaries
    async fn content_summaries(&self) -> Result<Vec<String>>;

    /// Newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<ScrapedEntry>>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<()>;
}
