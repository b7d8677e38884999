// HTTP routes
pub mod entries;
pub mod health;
pub mod scrape;
pub mod search;

pub use entries::*;
pub use health::*;
pub use scrape::*;
pub use search::*;
