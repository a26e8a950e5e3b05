// crates/jobs/src/sink.rs
//! Destinations for progress updates.

use async_trait::async_trait;
use guild_sweep_core::{JobId, ProgressSnapshot, SinkError};
use tokio::sync::broadcast;

use crate::types::JobProgress;

/// Where the reporter delivers progress.
///
/// Delivery is best-effort: an `Err` is logged by the reporter and the job
/// carries on.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(
        &self,
        job_id: JobId,
        snapshot: &ProgressSnapshot,
        status: &str,
    ) -> Result<(), SinkError>;
}

/// Fans progress out to any number of subscribers.
pub struct BroadcastSink {
    tx: broadcast::Sender<JobProgress>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to all job progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressSink for BroadcastSink {
    async fn emit(
        &self,
        job_id: JobId,
        snapshot: &ProgressSnapshot,
        status: &str,
    ) -> Result<(), SinkError> {
        self.tx
            .send(JobProgress::new(job_id, snapshot, status))
            .map(|_| ())
            .map_err(|_| SinkError::NoSubscribers)
    }
}

/// Writes each update as an `info` log line.
pub struct TracingSink;

#[async_trait]
impl ProgressSink for TracingSink {
    async fn emit(
        &self,
        job_id: JobId,
        snapshot: &ProgressSnapshot,
        status: &str,
    ) -> Result<(), SinkError> {
        let counts = serde_json::to_string(&snapshot.counts)
            .map_err(|e| SinkError::Unreachable(e.to_string()))?;
        tracing::info!(job_id, status, total = snapshot.total(), %counts, "Sweep progress");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_sweep_core::CategoryCount;

    fn snapshot(count: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            counts: vec![CategoryCount {
                category: "channels".to_string(),
                count,
            }],
        }
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new();
        let mut rx = sink.subscribe();

        sink.emit(7, &snapshot(3), "Deleting channels").await.unwrap();

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.job_id, 7);
        assert_eq!(progress.status, "Deleting channels");
        assert_eq!(progress.count("channels"), 3);
    }

    #[tokio::test]
    async fn test_broadcast_sink_without_subscribers_reports_error() {
        let sink = BroadcastSink::new();
        let err = sink.emit(7, &snapshot(1), "Starting").await.unwrap_err();
        assert_eq!(err, SinkError::NoSubscribers);
    }

    #[test]
    fn test_tracing_sink_never_fails() {
        tokio_test::block_on(async {
            assert!(TracingSink.emit(1, &snapshot(5), "Completed").await.is_ok());
        });
    }
}
