// crates/jobs/src/executor.rs
//! Bounded-concurrency batch runner for one category.
//!
//! Each item is attempted at most once. Failures are logged and not
//! counted; they never abort the batch. The stop flag is checked right
//! before every item call, so once a stop is requested no new call begins.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use guild_sweep_core::{ItemError, JobId};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cancel::CancelRegistry;
use crate::progress::ProgressState;
use crate::reporter::Reporter;
use crate::store::CountStore;

/// Runs per-item actions for one job with at most `max_concurrency` in flight.
///
/// Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct BatchExecutor {
    job_id: JobId,
    max_concurrency: usize,
    progress: Arc<ProgressState>,
    cancel: Arc<CancelRegistry>,
    store: Arc<dyn CountStore>,
    reporter: Arc<Reporter>,
}

#[derive(Default)]
struct BatchStats {
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl BatchExecutor {
    pub fn new(
        job_id: JobId,
        max_concurrency: usize,
        progress: Arc<ProgressState>,
        cancel: Arc<CancelRegistry>,
        store: Arc<dyn CountStore>,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            job_id,
            max_concurrency: max_concurrency.max(1),
            progress,
            cancel,
            store,
            reporter,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn progress(&self) -> &Arc<ProgressState> {
        &self.progress
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_stop_requested(self.job_id)
    }

    /// Run `delete_fn` over `items`, counting one unit per success.
    ///
    /// Returns the category's count once every dispatched item has been
    /// attempted or skipped.
    pub async fn run<T, F, Fut>(
        &self,
        items: Vec<T>,
        delete_fn: F,
        category: &str,
        status: &str,
    ) -> u64
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ItemError>> + Send + 'static,
    {
        self.run_weighted(
            items,
            move |item| {
                let call = delete_fn(item);
                async move { call.await.map(|()| 1u64) }
            },
            category,
            status,
        )
        .await
    }

    /// Like [`run`](Self::run), but each success reports how many units it
    /// affected (messages purged, roles removed). `Ok(0)` counts nothing.
    pub async fn run_weighted<T, F, Fut>(
        &self,
        items: Vec<T>,
        delete_fn: F,
        category: &str,
        status: &str,
    ) -> u64
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<u64, ItemError>> + Send + 'static,
    {
        if items.is_empty() {
            return self.progress.count(category);
        }

        let attempted = items.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let delete_fn = Arc::new(delete_fn);
        let category: Arc<str> = Arc::from(category);
        let status: Arc<str> = Arc::from(status);
        let stats = Arc::new(BatchStats::default());
        let mut workers = JoinSet::new();

        let mut pending = items.into_iter();
        for item in pending.by_ref() {
            if self.is_stop_requested() {
                stats.skipped.fetch_add(1, Ordering::Relaxed);
                break;
            }
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let executor = self.clone();
            let delete_fn = Arc::clone(&delete_fn);
            let category = Arc::clone(&category);
            let status = Arc::clone(&status);
            let stats = Arc::clone(&stats);
            workers.spawn(async move {
                let _permit = permit;
                if executor.is_stop_requested() {
                    stats.skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                match delete_fn(item).await {
                    Ok(0) => {}
                    Ok(units) => executor.record(&category, &status, units).await,
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(
                            job_id = executor.job_id,
                            category = %category,
                            kind = e.kind(),
                            error = %e,
                            "Item failed; skipping"
                        );
                    }
                }
            });
        }
        stats
            .skipped
            .fetch_add(pending.len() as u64, Ordering::Relaxed);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(job_id = self.job_id, category = %category, error = %e, "Item worker panicked");
            }
        }

        let count = self.progress.count(&category);
        tracing::info!(
            job_id = self.job_id,
            category = %category,
            count,
            attempted,
            failed = stats.failed.load(Ordering::Relaxed),
            skipped = stats.skipped.load(Ordering::Relaxed),
            "Category finished"
        );
        count
    }

    /// Count a success, persist the new count under the progress lock, then
    /// let the reporter decide whether to emit.
    async fn record(&self, category: &str, status: &str, units: u64) {
        let update = self.progress.record(category, units, |tally| {
            if let Err(e) = self.store.persist_count(self.job_id, category, tally.count) {
                tracing::warn!(job_id = self.job_id, category, error = %e, "Failed to persist count");
            }
            self.reporter.should_emit(tally.total, false)
        });
        if let Some(snapshot) = update.snapshot {
            self.reporter.emit(&snapshot, status).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::BroadcastSink;
    use crate::store::MemoryStore;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Harness {
        executor: BatchExecutor,
        cancel: Arc<CancelRegistry>,
        store: Arc<MemoryStore>,
        sink: Arc<BroadcastSink>,
    }

    fn harness(max_concurrency: usize) -> Harness {
        let cancel = Arc::new(CancelRegistry::new());
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(BroadcastSink::new());
        let reporter = Arc::new(Reporter::new(1, 5, sink.clone()));
        let executor = BatchExecutor::new(
            1,
            max_concurrency,
            Arc::new(ProgressState::new()),
            cancel.clone(),
            store.clone(),
            reporter,
        );
        Harness {
            executor,
            cancel,
            store,
            sink,
        }
    }

    #[tokio::test]
    async fn test_empty_items_returns_current_count() {
        let h = harness(5);
        h.executor.progress().add("channels", 3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let count = h
            .executor
            .run(
                Vec::<u32>::new(),
                move |_| {
                    calls_in.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<(), ItemError>(()) }
                },
                "channels",
                "Deleting channels",
            )
            .await;
        assert_eq!(count, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attempts_every_item_and_counts_successes() {
        let h = harness(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let count = h
            .executor
            .run(
                (0..20u32).collect(),
                move |n| {
                    calls_in.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n % 4 == 0 {
                            Err(ItemError::transient("502 Bad Gateway"))
                        } else {
                            Ok(())
                        }
                    }
                },
                "roles",
                "Deleting roles",
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 20);
        // 0, 4, 8, 12, 16 fail.
        assert_eq!(count, 15);
        let persisted = h.store.load(1).unwrap().unwrap();
        assert_eq!(persisted.counts.get("roles"), Some(&15));
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_respected() {
        let h = harness(4);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (in_flight_in, peak_in) = (in_flight.clone(), peak.clone());
        let count = h
            .executor
            .run(
                (0..16u32).collect(),
                move |_| {
                    let in_flight = in_flight_in.clone();
                    let peak = peak_in.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<(), ItemError>(())
                    }
                },
                "emojis",
                "Deleting emojis",
            )
            .await;
        assert_eq!(count, 16);
        assert_eq!(peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_no_new_call_after_stop() {
        let h = harness(3);
        let cancel = h.cancel.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let late_calls = Arc::new(AtomicUsize::new(0));
        let (calls_in, late_in) = (calls.clone(), late_calls.clone());
        let count = h
            .executor
            .run(
                (0..30u32).collect(),
                move |_| {
                    if cancel.is_stop_requested(1) {
                        late_in.fetch_add(1, Ordering::SeqCst);
                    }
                    let n = calls_in.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 4 {
                        cancel.request_stop(1);
                    }
                    async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok::<(), ItemError>(())
                    }
                },
                "channels",
                "Deleting channels",
            )
            .await;
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        let calls = calls.load(Ordering::SeqCst);
        assert!(calls >= 4 && calls < 30, "calls = {calls}");
        assert_eq!(count as usize, calls);
    }

    #[tokio::test]
    async fn test_weighted_successes_add_units() {
        let h = harness(2);
        let count = h
            .executor
            .run_weighted(
                vec![10u64, 0, 25, 7],
                |deleted| async move { Ok::<u64, ItemError>(deleted) },
                "purged_messages",
                "Purging messages",
            )
            .await;
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn test_reports_every_fifth_success() {
        let h = harness(1);
        let mut rx = h.sink.subscribe();
        h.executor
            .run(
                (0..12u32).collect(),
                |_| async { Ok::<(), ItemError>(()) },
                "channels",
                "Deleting channels",
            )
            .await;
        let mut totals = Vec::new();
        while let Ok(progress) = rx.try_recv() {
            assert_eq!(progress.status, "Deleting channels");
            totals.push(progress.total);
        }
        assert_eq!(totals, vec![5, 10]);
    }

    #[tokio::test]
    async fn test_panicking_item_does_not_abort_batch() {
        let h = harness(2);
        let count = h
            .executor
            .run(
                (0..6u32).collect(),
                |n| async move {
                    if n == 2 {
                        panic!("simulated client bug");
                    }
                    Ok::<(), ItemError>(())
                },
                "stickers",
                "Deleting stickers",
            )
            .await;
        assert_eq!(count, 5);
    }
}
