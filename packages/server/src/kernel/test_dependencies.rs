// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::{
    BaseAI, BaseEmbeddingService, BasePageFetcher, BaseScrapedEntryStore, CompletionOptions,
    FetchedPage, ServerDeps,
};
use crate::config::ScrapeSettings;
use crate::domains::scraping::models::{NewScrapedEntry, ScrapedEntry};

// =============================================================================
// Mock Page Fetcher
// =============================================================================

#[derive(Debug, Clone)]
enum MockPage {
    Body(String),
    Failure(String),
}

pub struct MockPageFetcher {
    pages: Arc<Mutex<HashMap<String, MockPage>>>,
    calls: Arc<Mutex<Vec<String>>>,
    // Fetches wait for a permit when gated
    gate: Option<Arc<Semaphore>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Serve `body` for `url`
    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), MockPage::Body(body.to_string()));
        self
    }

    /// Serve a minimal HTML page whose body is `text`
    pub fn with_html(self, url: &str, title: &str, text: &str) -> Self {
        let html = format!(
            "<html><head><title>{title}</title></head><body><h1>{title}</h1><p>{text}</p></body></html>"
        );
        self.with_page(url, &html)
    }

    /// Serve a sitemap listing `urls`
    pub fn with_sitemap(self, url: &str, urls: &[&str]) -> Self {
        let locs: String = urls
            .iter()
            .map(|u| format!("<url><loc>{u}</loc></url>"))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{locs}</urlset>"#
        );
        self.with_page(url, &xml)
    }

    /// Fail every fetch of `url`
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), MockPage::Failure(message.to_string()));
        self
    }

    /// Block every fetch until [`MockPageFetcher::release`] hands out permits
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` blocked fetches through
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Get all URLs that were fetched
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Check if a URL was fetched
    pub fn was_fetched(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|u| u == url)
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        // Record the call
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }

        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(MockPage::Body(body)) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body,
            }),
            Some(MockPage::Failure(message)) => Err(anyhow::anyhow!("{}", message)),
            None => anyhow::bail!("HTTP 404 Not Found for {}", url),
        }
    }
}

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

/// Arguments captured from a completion call
#[derive(Debug, Clone)]
pub struct CompletionCallArgs {
    pub system_prompt: String,
    pub user_prompt: String,
    pub options: CompletionOptions,
}

pub struct MockAI {
    responses: Arc<Mutex<Vec<String>>>,
    error: Option<String>,
    calls: Arc<Mutex<Vec<CompletionCallArgs>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a text response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(response.into());
        self
    }

    /// Fail every call with `message`
    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Get all calls made to the AI
    pub fn calls(&self) -> Vec<CompletionCallArgs> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the last user prompt sent to the AI
    pub fn last_prompt(&self) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|c| c.user_prompt.clone())
    }

    /// Check if a user prompt containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.user_prompt.contains(text))
    }

    /// Get the number of times the AI was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete_with_system(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        // Record the call
        self.calls.lock().unwrap().push(CompletionCallArgs {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            options,
        });

        if let Some(message) = &self.error {
            anyhow::bail!("{}", message);
        }

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            // Return default mock response
            Ok("Mock AI response".to_string())
        }
    }
}

// =============================================================================
// Mock Embedding Service
// =============================================================================

pub struct MockEmbeddingService {
    // Returns a fixed embedding vector for all inputs by default
    fixed_embedding: Vec<f32>,
    // First matching pattern (case-insensitive substring) wins
    pattern_embeddings: Arc<Mutex<Vec<(String, Vec<f32>)>>>,
    error: Option<String>,
    // Track all texts that embeddings were generated for
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockEmbeddingService {
    pub fn new() -> Self {
        Self {
            fixed_embedding: vec![0.1; 8],
            pattern_embeddings: Arc::new(Mutex::new(Vec::new())),
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.fixed_embedding = embedding;
        self
    }

    /// Add a pattern-based embedding: when text contains the pattern, return this embedding
    pub fn with_pattern_embedding(self, pattern: &str, embedding: Vec<f32>) -> Self {
        self.pattern_embeddings
            .lock()
            .unwrap()
            .push((pattern.to_string(), embedding));
        self
    }

    /// Fail every call with `message`
    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    /// Get all texts that embeddings were generated for
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockEmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEmbeddingService for MockEmbeddingService {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        // Record the call
        self.calls.lock().unwrap().push(text.to_string());

        if let Some(message) = &self.error {
            anyhow::bail!("{}", message);
        }

        // Check for pattern match first
        let lowered = text.to_lowercase();
        let patterns = self.pattern_embeddings.lock().unwrap();
        for (pattern, embedding) in patterns.iter() {
            if lowered.contains(&pattern.to_lowercase()) {
                return Ok(embedding.clone());
            }
        }
        drop(patterns);

        // Fall back to fixed embedding
        Ok(self.fixed_embedding.clone())
    }
}

// =============================================================================
// In-memory Scraped Entry Store
// =============================================================================

/// Store with the same uniqueness rule as the Postgres table
pub struct InMemoryScrapedEntryStore {
    rows: Arc<Mutex<Vec<ScrapedEntry>>>,
    // URLs that exist but are invisible to `exists_by_url` (a concurrent writer's row)
    hidden: Arc<Mutex<HashSet<String>>>,
    failing: bool,
    insert_calls: Arc<Mutex<Vec<String>>>,
}

impl InMemoryScrapedEntryStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            hidden: Arc::new(Mutex::new(HashSet::new())),
            failing: false,
            insert_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-populate a row
    pub fn with_entry(self, url: &str, content_summary: &str) -> Self {
        self.rows.lock().unwrap().push(ScrapedEntry {
            id: Uuid::now_v7(),
            url: url.to_string(),
            name: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            scraped_by_user_id: "seed".to_string(),
            scrape_mode: "single".to_string(),
            scraped_at: Utc::now(),
            content_summary: Some(content_summary.to_string()),
        });
        self
    }

    /// Simulate a row written by a concurrent job after our existence checks
    pub fn with_hidden_existing(self, url: &str) -> Self {
        self.hidden.lock().unwrap().insert(url.to_string());
        self
    }

    /// Every operation errors, as if the database were down
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for_url(&self, url: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub fn urls(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    /// URLs passed to `insert`, including rejected ones
    pub fn insert_calls(&self) -> Vec<String> {
        self.insert_calls.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing {
            anyhow::bail!("database unavailable");
        }
        Ok(())
    }
}

impl Default for InMemoryScrapedEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseScrapedEntryStore for InMemoryScrapedEntryStore {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.rows.lock().unwrap().iter().any(|r| r.url == url))
    }

    async fn insert(&self, entry: &NewScrapedEntry) -> Result<bool> {
        self.insert_calls.lock().unwrap().push(entry.url.clone());
        self.check_available()?;

        if self.hidden.lock().unwrap().contains(&entry.url) {
            return Ok(false);
        }

        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.url == entry.url) {
            return Ok(false);
        }

        rows.push(ScrapedEntry {
            id: Uuid::now_v7(),
            url: entry.url.clone(),
            name: entry.name.clone(),
            meta_title: entry.meta_title.clone(),
            meta_description: entry.meta_description.clone(),
            meta_keywords: entry.meta_keywords.clone(),
            scraped_by_user_id: entry.scraped_by_user_id.clone(),
            scrape_mode: entry.scrape_mode.as_str().to_string(),
            scraped_at: Utc::now(),
            content_summary: entry.content_summary.clone(),
        });
        Ok(true)
    }

    async fn content_summaries(&self) -> Result<Vec<String>> {
        self.check_available()?;
        let mut seen = HashSet::new();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.content_summary.clone())
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ScrapedEntry>> {
        self.check_available()?;
        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<InMemoryScrapedEntryStore>,
    pub fetcher: Arc<MockPageFetcher>,
    pub ai: Option<Arc<MockAI>>,
    pub embeddings: Option<Arc<MockEmbeddingService>>,
    pub scrape_settings: ScrapeSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryScrapedEntryStore::new()),
            fetcher: Arc::new(MockPageFetcher::new()),
            ai: Some(Arc::new(MockAI::new())),
            embeddings: Some(Arc::new(MockEmbeddingService::new())),
            scrape_settings: ScrapeSettings {
                page_delay: Duration::ZERO,
                fetch_timeout: Duration::from_secs(5),
            },
        }
    }

    /// Set a mock entry store
    pub fn mock_store(mut self, store: InMemoryScrapedEntryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Set a mock page fetcher
    pub fn mock_fetcher(mut self, fetcher: MockPageFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Set a mock AI
    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Some(Arc::new(ai));
        self
    }

    /// Set a mock embedding service
    pub fn mock_embeddings(mut self, service: MockEmbeddingService) -> Self {
        self.embeddings = Some(Arc::new(service));
        self
    }

    /// Run as if no completion key were configured
    pub fn without_ai(mut self) -> Self {
        self.ai = None;
        self
    }

    /// Run as if no embedding key were configured
    pub fn without_embeddings(mut self) -> Self {
        self.embeddings = None;
        self
    }

    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.scrape_settings.page_delay = delay;
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_server_deps(self) -> ServerDeps {
        ServerDeps::new(
            self.store,
            self.fetcher,
            self.ai.map(|ai| ai as Arc<dyn BaseAI>),
            self.embeddings
                .map(|e| e as Arc<dyn BaseEmbeddingService>),
            self.scrape_settings,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
