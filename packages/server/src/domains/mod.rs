// Business domains
pub mod scraping;
pub mod search;
