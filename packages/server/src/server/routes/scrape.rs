use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domains::scraping::actions::{start_scrape, StartScrapeRequest};
use crate::domains::scraping::models::{JobState, ScrapeJobStatus, ScrapeMode};
use crate::server::app::AppState;
use crate::server::error::ApiError;

const NO_TASK_MESSAGE: &str = "No scraping task found for this user_id.";

#[derive(Debug, Serialize)]
pub struct ScrapeStartedResponse {
    pub status: String,
    pub job_id: Uuid,
    pub scrape_url: String,
    pub scrape_mode: ScrapeMode,
}

/// Polling view of a job. Field names are what the dashboard reads.
#[derive(Debug, Serialize)]
pub struct ScrapeStatusResponse {
    pub user_id: String,
    pub job_id: Option<Uuid>,
    pub url: Option<String>,
    pub mode: Option<ScrapeMode>,
    pub state: JobState,
    pub is_scraping: bool,
    pub scraped_pages: u32,
    pub remaining_pages: u32,
    pub current_url: Option<String>,
    pub all_urls: Vec<String>,
    pub total_characters_scraped: u64,
    pub fetch_quota_remaining: u32,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScrapeStatusResponse {
    fn from_status(user_id: String, status: ScrapeJobStatus) -> Self {
        let current_url = status.current_url.clone().or_else(|| status.target_url.clone());
        Self {
            user_id,
            job_id: status.job_id,
            url: status.target_url,
            mode: status.mode,
            state: status.state,
            is_scraping: status.state == JobState::Running,
            scraped_pages: status.pages_done,
            remaining_pages: status.pages_remaining,
            all_urls: current_url.iter().cloned().collect(),
            current_url,
            total_characters_scraped: status.total_characters,
            fetch_quota_remaining: status.fetch_quota_remaining,
            error: status.last_error,
            started_at: status.started_at,
            finished_at: status.finished_at,
        }
    }

    fn unknown(user_id: String) -> Self {
        let mut response = Self::from_status(user_id.clone(), ScrapeJobStatus::unknown(&user_id));
        response.error = Some(NO_TASK_MESSAGE.to_string());
        response
    }
}

/// POST /api/scrape
pub async fn start_scrape_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<StartScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeStartedResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected scrape request body");
        ApiError::BadRequest("Invalid JSON format in the request body.".to_string())
    })?;

    let started = start_scrape(&request, &state.deps)?;

    Ok(Json(ScrapeStartedResponse {
        status: "Scrape started".to_string(),
        job_id: started.job_id,
        scrape_url: started.job.target_url,
        scrape_mode: started.job.mode,
    }))
}

/// GET /api/scrape/status/{user_id}
///
/// Always 200; unknown owners get a zeroed record.
pub async fn scrape_status_handler(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
) -> Json<ScrapeStatusResponse> {
    let response = match state.deps.scrape_jobs.get(&user_id) {
        Some(status) => ScrapeStatusResponse::from_status(user_id, status),
        None => ScrapeStatusResponse::unknown(user_id),
    };
    Json(response)
}
