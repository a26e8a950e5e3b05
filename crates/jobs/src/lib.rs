// crates/jobs/src/lib.rs
//! Sweep job engine: bounded-concurrency batch deletion with live progress
//! and cooperative cancellation.
//!
//! Provides:
//! - `JobController`: runs one pipeline per target and rejects overlaps
//! - `BatchExecutor`: runs a category's items under a concurrency ceiling
//! - `ProgressState`: per-category counters behind a single lock
//! - `Reporter` / `ProgressSink`: throttled progress delivery
//! - `CancelRegistry`: process-wide stop flags
//! - `CountStore`: durable write-through of counters

pub mod cancel;
pub mod controller;
pub mod executor;
pub mod progress;
pub mod reporter;
pub mod sink;
pub mod stage;
pub mod state;
pub mod store;
pub mod types;

pub use cancel::CancelRegistry;
pub use controller::{JobController, STATUS_CANCELLED, STATUS_COMPLETED, STATUS_STARTING};
pub use executor::BatchExecutor;
pub use progress::{ProgressState, Tally};
pub use reporter::Reporter;
pub use sink::{BroadcastSink, ProgressSink, TracingSink};
pub use stage::{CategoryOperation, Pipeline, Stage};
pub use state::JobState;
pub use store::{CountStore, JsonFileStore, MemoryStore, PersistedState};
pub use types::{JobProgress, JobStatus};
