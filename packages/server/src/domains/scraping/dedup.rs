//! Existence checks and writes keyed on the normalized URL.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use super::models::NewScrapedEntry;
use super::normalize::normalize_url;
use crate::kernel::BaseScrapedEntryStore;

/// Result of a save attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another write got there first; not an error
    Duplicate,
}

/// Guards the store so at most one record exists per normalized URL.
///
/// `exists` is the cheap pre-fetch check. `save` rechecks right before the
/// write, and the store's UNIQUE constraint catches whatever slips past both.
#[derive(Clone)]
pub struct DedupGateway {
    store: Arc<dyn BaseScrapedEntryStore>,
}

impl DedupGateway {
    pub fn new(store: Arc<dyn BaseScrapedEntryStore>) -> Self {
        Self { store }
    }

    pub async fn exists(&self, url: &str) -> Result<bool> {
        self.store.exists_by_url(&normalize_url(url)).await
    }

    pub async fn save(&self, entry: &NewScrapedEntry) -> Result<SaveOutcome> {
        let url = normalize_url(&entry.url);

        if self.store.exists_by_url(&url).await? {
            debug!(url = %url, "Entry already stored, skipping write");
            return Ok(SaveOutcome::Duplicate);
        }

        let inserted = if url == entry.url {
            self.store.insert(entry).await?
        } else {
            let mut normalized = entry.clone();
            normalized.url = url.clone();
            self.store.insert(&normalized).await?
        };

        if inserted {
            info!(url = %url, "Scraped entry saved");
            Ok(SaveOutcome::Saved)
        } else {
            debug!(url = %url, "Lost insert race, entry already stored");
            Ok(SaveOutcome::Duplicate)
        }
    }
}
