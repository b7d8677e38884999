// Ragbot - scraping pipeline + retrieval-augmented chat backend
//
// Scrape jobs run in the background and write deduplicated pages to Postgres;
// the search endpoint embeds stored pages, picks the nearest one to a question
// and asks a completion model for a short answer.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
