//! Scraping domain actions
//!
//! `start_scrape` is the entry point used by the HTTP layer; it spawns
//! `run_scrape_job` on its own task.

pub mod scrape_job;
pub mod start_scrape;

pub use scrape_job::{run_scrape_job, ScrapeJob, EMPTY_SITEMAP_MESSAGE, PLAN_LIMIT_MESSAGE};
pub use start_scrape::{start_scrape, validate_request, StartScrapeError, StartScrapeRequest, StartedScrape};
