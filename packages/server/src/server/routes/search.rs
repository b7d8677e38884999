use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::Deserialize;

use crate::domains::search::{search, SearchAnswer};
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub question: String,
}

/// POST /api/search
pub async fn search_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchAnswer>, ApiError> {
    let Json(request) =
        payload.map_err(|_| ApiError::BadRequest("Invalid JSON format".to_string()))?;

    let answer = search(&request.question, &state.deps).await?;
    Ok(Json(answer))
}
