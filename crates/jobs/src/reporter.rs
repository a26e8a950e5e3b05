// crates/jobs/src/reporter.rs
//! Throttled progress emission.

use std::sync::Arc;

use guild_sweep_core::{JobId, ProgressSnapshot};

use crate::sink::ProgressSink;

/// Decides when a progress update goes out and delivers it to the sink.
///
/// Non-forced updates are emitted only when the running total is a
/// multiple of `update_interval`; forced updates (start, end, cancel)
/// always go out.
pub struct Reporter {
    job_id: JobId,
    update_interval: u64,
    sink: Arc<dyn ProgressSink>,
}

impl Reporter {
    pub fn new(job_id: JobId, update_interval: u64, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            job_id,
            update_interval: update_interval.max(1),
            sink,
        }
    }

    pub fn update_interval(&self) -> u64 {
        self.update_interval
    }

    pub fn should_emit(&self, total: u64, force: bool) -> bool {
        force || total % self.update_interval == 0
    }

    /// Emit if the policy allows. Returns whether an emission was attempted.
    pub async fn report(&self, snapshot: &ProgressSnapshot, status: &str, force: bool) -> bool {
        if !self.should_emit(snapshot.total(), force) {
            return false;
        }
        self.emit(snapshot, status).await;
        true
    }

    /// Deliver unconditionally. Delivery failures are logged and dropped.
    pub async fn emit(&self, snapshot: &ProgressSnapshot, status: &str) {
        if let Err(e) = self.sink.emit(self.job_id, snapshot, status).await {
            tracing::warn!(job_id = self.job_id, status, error = %e, "Progress update not delivered");
        }
    }
}
