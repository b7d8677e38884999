use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ScrapeMode;

/// Lifecycle of a scrape job
///
/// `Idle -> Running -> {Completed, Failed, QuotaExhausted}`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    QuotaExhausted,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::QuotaExhausted
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::QuotaExhausted => "quota_exhausted",
        };
        f.write_str(s)
    }
}

/// Live progress of one owner's scrape job.
///
/// `Default` is the "nothing has run" record handed to pollers for unknown owners.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeJobStatus {
    pub job_id: Option<Uuid>,
    pub owner_id: String,
    pub target_url: Option<String>,
    pub mode: Option<ScrapeMode>,
    pub state: JobState,
    pub pages_done: u32,
    pub pages_remaining: u32,
    pub current_url: Option<String>,
    pub total_characters: u64,
    /// Page fetches this job may still issue
    pub fetch_quota_remaining: u32,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScrapeJobStatus {
    /// Fresh status for a job that is about to run
    pub fn starting(owner_id: &str, target_url: &str, mode: ScrapeMode, fetch_quota: u32) -> Self {
        Self {
            job_id: Some(Uuid::new_v4()),
            owner_id: owner_id.to_string(),
            target_url: Some(target_url.to_string()),
            mode: Some(mode),
            state: JobState::Running,
            fetch_quota_remaining: fetch_quota,
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Placeholder for an owner with no known job
    pub fn unknown(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    /// Move to a terminal state
    pub fn finish(&mut self, state: JobState) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.finished_at = Some(Utc::now());
        if state == JobState::Completed {
            self.pages_remaining = 0;
        }
    }

    /// Terminal failure with a message
    pub fn fail(&mut self, state: JobState, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.finish(state);
    }
}
