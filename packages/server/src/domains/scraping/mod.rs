//! Scraping domain - fetch pages, extract them and store one record per URL.

pub mod actions;
pub mod dedup;
pub mod extractor;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod sitemap;

pub use dedup::{DedupGateway, SaveOutcome};
pub use extractor::{extract_page, ExtractedPage};
pub use models::*;
pub use normalize::normalize_url;
pub use registry::{JobAlreadyRunning, JobStatusRegistry, StatusHandle};
pub use sitemap::parse_sitemap_locations;
