// crates/jobs/src/types.rs
//! Types for the sweep job system.

use guild_sweep_core::{CategoryCount, JobId, ProgressSnapshot};
use serde::Serialize;

/// Lifecycle of a sweep job for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobStatus {
    Idle = 0,
    Running = 1,
    /// Stop requested; workers are draining.
    Stopping = 2,
    Completed = 3,
    Cancelled = 4,
}

impl JobStatus {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Stopping,
            3 => Self::Completed,
            4 => Self::Cancelled,
            _ => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a job in this status blocks a new `start` for the same target.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }
}

/// Progress update sent to broadcast subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: JobId,
    pub status: String,
    pub total: u64,
    pub counts: Vec<CategoryCount>,
    pub timestamp: String,
}

impl JobProgress {
    pub fn new(job_id: JobId, snapshot: &ProgressSnapshot, status: &str) -> Self {
        Self {
            job_id,
            status: status.to_string(),
            total: snapshot.total(),
            counts: snapshot.counts.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn count(&self, category: &str) -> u64 {
        self.counts
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}
