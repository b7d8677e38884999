use axum::extract::{Extension, Query};
use axum::Json;
use serde::Deserialize;

use crate::domains::scraping::models::ScrapedEntry;
use crate::server::app::AppState;
use crate::server::error::ApiError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct EntriesQuery {
    pub limit: Option<i64>,
}

impl EntriesQuery {
    fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// GET /api/entries - stored pages, newest first
pub async fn list_entries_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<Vec<ScrapedEntry>>, ApiError> {
    let entries = state
        .deps
        .entries
        .list_recent(query.effective_limit())
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(entries))
}
