//! In-process registry of scrape job status, keyed by owner id.
//!
//! The registry is owned by `ServerDeps` and lives as long as the process;
//! nothing is persisted across restarts. Each running job holds the only
//! [`StatusHandle`] for its owner, so there is exactly one writer per record
//! while pollers read cloned snapshots.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::models::{JobState, ScrapeJobStatus};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("A scraping task is already running for this user.")]
pub struct JobAlreadyRunning;

type StatusMap = HashMap<String, ScrapeJobStatus>;

/// Owner id -> latest job status.
#[derive(Clone, Default)]
pub struct JobStatusRegistry {
    jobs: Arc<RwLock<StatusMap>>,
}

impl JobStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic, but a poisoned lock must not take the poller down
    fn read(&self) -> RwLockReadGuard<'_, StatusMap> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StatusMap> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Install `status` for its owner and hand back the write handle.
    ///
    /// Check and insert happen under one write lock, so two racing starts for the
    /// same owner cannot both succeed. A finished job's record is overwritten.
    pub fn try_register(&self, status: ScrapeJobStatus) -> Result<StatusHandle, JobAlreadyRunning> {
        let mut jobs = self.write();

        if jobs
            .get(&status.owner_id)
            .is_some_and(ScrapeJobStatus::is_running)
        {
            return Err(JobAlreadyRunning);
        }

        let handle = StatusHandle {
            owner_id: status.owner_id.clone(),
            job_id: status.job_id.unwrap_or_else(Uuid::new_v4),
            jobs: self.jobs.clone(),
        };

        let mut status = status;
        status.job_id = Some(handle.job_id);
        jobs.insert(status.owner_id.clone(), status);

        Ok(handle)
    }

    /// Snapshot of the owner's latest job, if any
    pub fn get(&self, owner_id: &str) -> Option<ScrapeJobStatus> {
        self.read().get(owner_id).cloned()
    }

    pub fn is_running(&self, owner_id: &str) -> bool {
        self.read()
            .get(owner_id)
            .is_some_and(ScrapeJobStatus::is_running)
    }

    /// Number of owners with a running job
    pub fn running_count(&self) -> usize {
        self.read().values().filter(|s| s.is_running()).count()
    }
}

/// Exclusive write access to one job's status record.
///
/// Not `Clone`: the job task that owns it is the only writer. Writes are
/// ignored once a newer job has replaced the record.
pub struct StatusHandle {
    owner_id: String,
    job_id: Uuid,
    jobs: Arc<RwLock<StatusMap>>,
}

impl StatusHandle {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Apply `f` to the record and return the updated snapshot
    pub fn update<F>(&self, f: F) -> ScrapeJobStatus
    where
        F: FnOnce(&mut ScrapeJobStatus),
    {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        match jobs.get_mut(&self.owner_id) {
            Some(status) if status.job_id == Some(self.job_id) => {
                f(status);
                status.clone()
            }
            _ => {
                warn!(
                    owner_id = %self.owner_id,
                    job_id = %self.job_id,
                    "Status record replaced, dropping update"
                );
                ScrapeJobStatus::unknown(&self.owner_id)
            }
        }
    }

    pub fn snapshot(&self) -> ScrapeJobStatus {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.get(&self.owner_id)
            .filter(|s| s.job_id == Some(self.job_id))
            .cloned()
            .unwrap_or_else(|| ScrapeJobStatus::unknown(&self.owner_id))
    }
}

impl Drop for StatusHandle {
    /// A job that exits without reaching a terminal state (panic, aborted task)
    /// must not leave its owner locked out.
    fn drop(&mut self) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = jobs.get_mut(&self.owner_id) {
            if status.job_id == Some(self.job_id) && status.is_running() {
                warn!(
                    owner_id = %self.owner_id,
                    job_id = %self.job_id,
                    "Scrape job ended without a terminal state"
                );
                status.fail(JobState::Failed, "Scrape job ended unexpectedly.");
            }
        }
    }
}
