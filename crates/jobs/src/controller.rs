// crates/jobs/src/controller.rs
//! Central controller that runs sweep pipelines, one job per target.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use guild_sweep_core::{JobError, JobId, JobOutcome, JobReport, ProgressSnapshot, SweepConfig};

use crate::cancel::CancelRegistry;
use crate::executor::BatchExecutor;
use crate::reporter::Reporter;
use crate::sink::ProgressSink;
use crate::stage::Pipeline;
use crate::state::JobState;
use crate::store::CountStore;
use crate::types::JobStatus;

pub const STATUS_STARTING: &str = "Starting";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_CANCELLED: &str = "Cancelled";

type JobMap = HashMap<JobId, Arc<JobState>>;

/// Runs sweep pipelines and tracks which targets have a job in flight.
///
/// Share it behind an `Arc`: `start` runs for the whole job, while `stop`
/// and the status queries are called from elsewhere in the meantime.
pub struct JobController {
    max_concurrency: usize,
    update_interval: u64,
    jobs: RwLock<JobMap>,
    cancel: Arc<CancelRegistry>,
    store: Arc<dyn CountStore>,
    sink: Arc<dyn ProgressSink>,
}

/// Removes the job entry when `start` returns, including on panic.
/// Only the entry this run inserted is removed.
struct ActiveJob<'a> {
    controller: &'a JobController,
    state: Arc<JobState>,
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        let mut jobs = self.controller.jobs_mut();
        let job_id = self.state.id();
        if jobs.get(&job_id).is_some_and(|job| Arc::ptr_eq(job, &self.state)) {
            jobs.remove(&job_id);
        }
    }
}

impl JobController {
    pub fn new(config: &SweepConfig, store: Arc<dyn CountStore>, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            update_interval: config.update_interval.max(1),
            jobs: RwLock::new(HashMap::new()),
            cancel: Arc::new(CancelRegistry::new()),
            store,
            sink,
        }
    }

    /// Use a registry shared with other controllers in the process.
    pub fn with_cancel_registry(mut self, cancel: Arc<CancelRegistry>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_registry(&self) -> Arc<CancelRegistry> {
        Arc::clone(&self.cancel)
    }

    fn jobs(&self) -> RwLockReadGuard<'_, JobMap> {
        match self.jobs.read() {
            Ok(jobs) => jobs,
            Err(poisoned) => {
                tracing::error!("RwLock poisoned reading jobs map");
                poisoned.into_inner()
            }
        }
    }

    fn jobs_mut(&self) -> RwLockWriteGuard<'_, JobMap> {
        match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(poisoned) => {
                tracing::error!("RwLock poisoned writing jobs map");
                poisoned.into_inner()
            }
        }
    }

    fn job(&self, job_id: JobId) -> Option<Arc<JobState>> {
        self.jobs().get(&job_id).cloned()
    }

    fn owns(&self, state: &Arc<JobState>) -> bool {
        self.jobs()
            .get(&state.id())
            .is_some_and(|job| Arc::ptr_eq(job, state))
    }

    /// Run `pipeline` for `job_id` to completion or cancellation.
    ///
    /// Rejects with [`JobError::AlreadyRunning`] without touching anything
    /// while the id has any entry, including a finished job still emitting
    /// its final update. Stages run strictly in order; once a stop is
    /// requested the remaining stages are skipped.
    pub async fn start(&self, job_id: JobId, pipeline: Pipeline) -> Result<JobReport, JobError> {
        let state = {
            let mut jobs = self.jobs_mut();
            if jobs.contains_key(&job_id) {
                tracing::warn!(job_id, "Sweep already in progress; start rejected");
                return Err(JobError::AlreadyRunning(job_id));
            }
            let state = Arc::new(JobState::new(job_id, pipeline.iter().map(|s| s.category())));
            jobs.insert(job_id, Arc::clone(&state));
            state
        };
        let _active = ActiveJob {
            controller: self,
            state: Arc::clone(&state),
        };

        self.cancel.clear(job_id);
        let started_at = state.started_at();
        if let Err(e) = self
            .store
            .clear(job_id)
            .and_then(|()| self.store.set_in_progress(job_id, true, Some(started_at)))
        {
            tracing::warn!(job_id, error = %e, "Failed to persist sweep start");
        }

        let reporter = Arc::new(Reporter::new(job_id, self.update_interval, Arc::clone(&self.sink)));
        let executor = BatchExecutor::new(
            job_id,
            self.max_concurrency,
            Arc::clone(state.progress()),
            Arc::clone(&self.cancel),
            Arc::clone(&self.store),
            Arc::clone(&reporter),
        );

        tracing::info!(
            job_id,
            stages = pipeline.len(),
            max_concurrency = self.max_concurrency,
            "Sweep started"
        );
        reporter.emit(&state.progress().snapshot(), STATUS_STARTING).await;

        for stage in pipeline {
            if executor.is_stop_requested() {
                tracing::info!(job_id, next = stage.category(), "Stop requested; skipping remaining stages");
                break;
            }
            stage.run(&executor).await;
        }

        let outcome = if self.cancel.is_stop_requested(job_id) {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Completed
        };
        let elapsed = state.elapsed();
        state.finish(outcome);

        let snapshot = state.progress().snapshot();
        let label = match outcome {
            JobOutcome::Completed => STATUS_COMPLETED,
            JobOutcome::Cancelled => STATUS_CANCELLED,
        };
        reporter.emit(&snapshot, label).await;

        if !self.owns(&state) {
            tracing::error!(job_id, "Job entry replaced while running; leaving persisted state alone");
        } else if let Err(e) = self.store.clear(job_id) {
            tracing::warn!(job_id, error = %e, "Failed to clear persisted sweep state");
        }

        let report = JobReport {
            job_id,
            outcome,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: elapsed.as_millis() as u64,
            categories: snapshot.counts,
        };
        tracing::info!(
            job_id,
            outcome = %outcome,
            total = report.total(),
            elapsed_ms = report.elapsed_ms,
            "Sweep finished"
        );
        Ok(report)
    }

    /// Request cooperative cancellation.
    ///
    /// Returns the counts at the moment of the request, or `None` (and does
    /// nothing) when no job is in flight for `job_id`. Does not wait for
    /// in-flight item calls.
    pub fn stop(&self, job_id: JobId) -> Option<ProgressSnapshot> {
        let state = match self.job(job_id) {
            Some(state) if state.status().is_active() => state,
            _ => {
                tracing::debug!(job_id, "Stop ignored; no sweep in progress");
                return None;
            }
        };
        self.cancel.request_stop(job_id);
        state.mark_stopping();
        tracing::info!(job_id, "Stop requested");
        Some(state.progress().snapshot())
    }

    pub fn status(&self, job_id: JobId) -> JobStatus {
        self.job(job_id)
            .map(|state| state.status())
            .unwrap_or(JobStatus::Idle)
    }

    pub fn snapshot(&self, job_id: JobId) -> Option<ProgressSnapshot> {
        self.job(job_id).map(|state| state.progress().snapshot())
    }

    /// Ids of every job currently running or stopping.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self
            .jobs()
            .values()
            .filter(|state| state.status().is_active())
            .map(|state| state.id())
            .collect();
        ids.sort_unstable();
        ids
    }
}
