//! In-memory registry of training jobs.
//!
//! The lock is held only for the map operation itself, never across file
//! or process I/O, so a slow watcher cannot stall unrelated jobs.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::job::{TrainingJob, TrainingStatus};

struct JobEntry {
    job: TrainingJob,
    /// Fires to ask the job's watcher to kill the child.
    cancel: CancellationToken,
}

/// Job id to job mapping shared by launchers, watchers, and readers.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: TrainingJob, cancel: CancellationToken) {
        self.jobs
            .lock()
            .await
            .insert(job.id.clone(), JobEntry { job, cancel });
    }

    /// Snapshot of one job.
    pub async fn get(&self, id: &str) -> Option<TrainingJob> {
        self.jobs.lock().await.get(id).map(|e| e.job.clone())
    }

    /// Snapshots of every job, oldest first.
    pub async fn list(&self) -> Vec<TrainingJob> {
        let mut jobs: Vec<TrainingJob> = self
            .jobs
            .lock()
            .await
            .values()
            .map(|e| e.job.clone())
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Signal the job's watcher to stop the child.
    ///
    /// Returns the current snapshot, or `None` for an unknown id. Terminal
    /// jobs are left untouched.
    pub async fn request_cancel(&self, id: &str) -> Option<TrainingJob> {
        let jobs = self.jobs.lock().await;
        let entry = jobs.get(id)?;
        if !entry.job.status.is_terminal() {
            entry.cancel.cancel();
        }
        Some(entry.job.clone())
    }

    /// Record the terminal status for a running job.
    ///
    /// Status, exit code, and finish time are written together. A job that
    /// is already terminal is not changed and `false` is returned.
    pub async fn finish(&self, id: &str, status: TrainingStatus, exit_code: Option<i32>) -> bool {
        debug_assert!(status.is_terminal());
        let mut jobs = self.jobs.lock().await;
        match jobs.get_mut(id) {
            Some(entry) if !entry.job.status.is_terminal() => {
                entry.job.status = status;
                entry.job.exit_code = exit_code;
                entry.job.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }
}
