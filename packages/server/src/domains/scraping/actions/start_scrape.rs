//! Start scrape action
//!
//! Validates a scrape request, claims the owner's status slot and spawns the
//! job. Returns as soon as the job is running in the background.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};
use url::Url;
use uuid::Uuid;

use super::scrape_job::{run_scrape_job, ScrapeJob};
use crate::domains::scraping::models::{
    fits_url_column, ScrapeJobStatus, ScrapeMode, OWNER_ID_MAX_CHARS, URL_MAX_CHARS,
};
use crate::domains::scraping::registry::JobAlreadyRunning;
use crate::kernel::ServerDeps;

/// Raw scrape request body.
///
/// Fields stay loose so each problem maps to its own validation message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartScrapeRequest {
    #[serde(default)]
    pub scrape_url: Option<String>,
    #[serde(default)]
    pub scrape_mode: Option<String>,
    /// String or number
    #[serde(default)]
    pub user_id: Option<Value>,
    /// Remaining page fetches on the caller's plan
    #[serde(default)]
    pub rem_link: Option<Value>,
}

#[derive(Debug, Error)]
pub enum StartScrapeError {
    #[error("Missing required parameters: 'scrape_url', 'scrape_mode', or 'user_id'.")]
    MissingParameters,

    #[error("Invalid or missing 'rem_link' parameter.")]
    InvalidQuota,

    #[error("Invalid scrape mode. Please choose 'single' or 'sitemap'.")]
    InvalidMode,

    #[error("Invalid 'scrape_url': expected an absolute http(s) URL.")]
    InvalidUrl,

    #[error("Invalid 'scrape_url': must be at most {} characters.", URL_MAX_CHARS)]
    UrlTooLong,

    #[error("Invalid 'user_id': must be at most {} characters.", OWNER_ID_MAX_CHARS)]
    OwnerIdTooLong,

    #[error(transparent)]
    AlreadyRunning(#[from] JobAlreadyRunning),
}

/// A job that has been accepted and spawned
pub struct StartedScrape {
    pub job_id: Uuid,
    pub job: ScrapeJob,
    /// Resolves to the terminal status
    pub task: JoinHandle<ScrapeJobStatus>,
}

/// Turn a raw request into a job, or say what is wrong with it
pub fn validate_request(request: &StartScrapeRequest) -> Result<ScrapeJob, StartScrapeError> {
    let scrape_url = request
        .scrape_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let scrape_mode = request
        .scrape_mode
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    let owner_id = request.user_id.as_ref().and_then(owner_id_from_value);

    let (Some(scrape_url), Some(scrape_mode), Some(owner_id)) = (scrape_url, scrape_mode, owner_id)
    else {
        return Err(StartScrapeError::MissingParameters);
    };

    if owner_id.chars().count() > OWNER_ID_MAX_CHARS {
        return Err(StartScrapeError::OwnerIdTooLong);
    }

    // JSON integers only; 5.0 and "5" are rejected
    let fetch_quota = request
        .rem_link
        .as_ref()
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .ok_or(StartScrapeError::InvalidQuota)?;

    let mode: ScrapeMode = scrape_mode
        .parse()
        .map_err(|_| StartScrapeError::InvalidMode)?;

    match Url::parse(scrape_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => return Err(StartScrapeError::InvalidUrl),
    }
    if !fits_url_column(scrape_url) {
        return Err(StartScrapeError::UrlTooLong);
    }

    Ok(ScrapeJob {
        owner_id,
        target_url: scrape_url.to_string(),
        mode,
        fetch_quota: u32::try_from(fetch_quota).unwrap_or(u32::MAX),
    })
}

fn owner_id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validate, register and spawn a scrape job.
///
/// Registration is atomic per owner: while a job is running every further
/// start for that owner fails with [`StartScrapeError::AlreadyRunning`] and
/// the running job's status is left alone.
pub fn start_scrape(
    request: &StartScrapeRequest,
    deps: &ServerDeps,
) -> Result<StartedScrape, StartScrapeError> {
    let job = validate_request(request)?;

    let handle = deps.scrape_jobs.try_register(job.initial_status())?;
    let job_id = handle.job_id();

    info!(
        job_id = %job_id,
        owner_id = %job.owner_id,
        url = %job.target_url,
        mode = %job.mode,
        "Scrape job accepted"
    );

    let span = info_span!(
        "scrape_job",
        job_id = %job_id,
        owner_id = %job.owner_id,
        mode = %job.mode
    );
    let task = tokio::spawn(run_scrape_job(job.clone(), handle, deps.clone()).instrument(span));

    Ok(StartedScrape { job_id, job, task })
}
