// crates/jobs/src/state.rs
//! State of one running sweep job.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use guild_sweep_core::{JobId, JobOutcome};

use crate::progress::ProgressState;
use crate::types::JobStatus;

/// Status, timing and counters for a single job.
///
/// Status is an atomic so `stop` and status queries never wait on the
/// progress lock.
pub struct JobState {
    id: JobId,
    status: AtomicU8,
    started_at: DateTime<Utc>,
    started: Instant,
    progress: Arc<ProgressState>,
}

impl JobState {
    /// Create a Running job with the pipeline's categories registered at zero.
    pub fn new<I, S>(id: JobId, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            id,
            status: AtomicU8::new(JobStatus::Running as u8),
            started_at: Utc::now(),
            started: Instant::now(),
            progress: Arc::new(ProgressState::with_categories(categories)),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn progress(&self) -> &Arc<ProgressState> {
        &self.progress
    }

    /// Running → Stopping. Returns false if the job was not Running.
    pub fn mark_stopping(&self) -> bool {
        self.status
            .compare_exchange(
                JobStatus::Running as u8,
                JobStatus::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Move to the terminal status for `outcome`.
    pub fn finish(&self, outcome: JobOutcome) {
        let status = match outcome {
            JobOutcome::Completed => JobStatus::Completed,
            JobOutcome::Cancelled => JobStatus::Cancelled,
        };
        self.status.store(status as u8, Ordering::Relaxed);
    }
}
