//! HTTP error type. Every failure leaves the server as `{ "error": msg }`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domains::scraping::actions::StartScrapeError;
use crate::domains::search::{MatchError, SearchError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::Internal(msg) = &self {
            error!(error = %msg, "Request failed");
        }

        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

impl From<StartScrapeError> for ApiError {
    fn from(err: StartScrapeError) -> Self {
        match err {
            StartScrapeError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            StartScrapeError::MissingParameters
            | StartScrapeError::InvalidQuota
            | StartScrapeError::InvalidMode
            | StartScrapeError::InvalidUrl
            | StartScrapeError::UrlTooLong
            | StartScrapeError::OwnerIdTooLong => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuestion => ApiError::BadRequest(err.to_string()),
            SearchError::NoDocuments => ApiError::ServiceUnavailable(err.to_string()),
            SearchError::Match(MatchError::EmbeddingUnavailable) => {
                ApiError::Internal(err.to_string())
            }
            SearchError::Match(e) => {
                ApiError::Internal(format!("An internal server error occurred: {}", e))
            }
            SearchError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}
