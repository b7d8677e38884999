pub mod job_status;
pub mod scraped_entry;

pub use job_status::*;
pub use scraped_entry::*;
