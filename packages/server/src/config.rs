use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Completion provider key. Search still answers without it, with a diagnostic reply.
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub completion_model: String,
    /// Embedding provider key. Without it search reports a configuration error.
    pub embedding_api_key: Option<String>,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub scrape: ScrapeSettings,
}

/// Knobs for the scrape orchestrator
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Pause between consecutive page fetches of a sitemap job
    pub page_delay: Duration,
    /// Per-request timeout for page and sitemap fetches
    pub fetch_timeout: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            groq_api_key: non_empty_var("GROQ_API_KEY"),
            groq_base_url: env::var("GROQ_BASE_URL")
                .unwrap_or_else(|_| inference_client::GROQ_BASE_URL.to_string()),
            completion_model: env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            embedding_api_key: non_empty_var("EMBEDDING_API_KEY")
                .or_else(|| non_empty_var("OPENAI_API_KEY")),
            embedding_base_url: env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| inference_client::OPENAI_BASE_URL.to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            scrape: ScrapeSettings {
                page_delay: Duration::from_millis(
                    env::var("SCRAPE_PAGE_DELAY_MS")
                        .unwrap_or_else(|_| "1000".to_string())
                        .parse()
                        .context("SCRAPE_PAGE_DELAY_MS must be a number of milliseconds")?,
                ),
                fetch_timeout: Duration::from_secs(
                    env::var("FETCH_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "30".to_string())
                        .parse()
                        .context("FETCH_TIMEOUT_SECS must be a number of seconds")?,
                ),
            },
        })
    }
}

/// Treat blank values the same as unset ones
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
