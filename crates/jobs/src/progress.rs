// crates/jobs/src/progress.rs
//! Per-category progress counters for one sweep job.
//!
//! Every mutation goes through a single exclusive lock shared by all
//! categories. The executor persists each count inside the same critical
//! section that produced it.

use std::sync::{Mutex, MutexGuard};

use guild_sweep_core::{CategoryCount, ProgressSnapshot};

/// Result of one increment: the category's new count and the new total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub count: u64,
    pub total: u64,
}

/// Outcome of [`ProgressState::record`].
#[derive(Debug, Clone)]
pub struct Update {
    pub tally: Tally,
    /// Snapshot taken under the lock, present when the callback asked for one.
    pub snapshot: Option<ProgressSnapshot>,
}

#[derive(Default)]
struct Counters {
    // Vec keeps registration order for reports.
    entries: Vec<CategoryCount>,
    total: u64,
}

impl Counters {
    fn slot(&mut self, category: &str) -> &mut CategoryCount {
        let idx = match self.entries.iter().position(|c| c.category == category) {
            Some(idx) => idx,
            None => {
                self.entries.push(CategoryCount {
                    category: category.to_string(),
                    count: 0,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    fn add(&mut self, category: &str, n: u64) -> Tally {
        let slot = self.slot(category);
        slot.count += n;
        let count = slot.count;
        self.total += n;
        Tally {
            count,
            total: self.total,
        }
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            counts: self.entries.clone(),
        }
    }
}

/// Shared mutable counters, one per category, plus the derived total.
#[derive(Default)]
pub struct ProgressState {
    inner: Mutex<Counters>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with categories pre-registered at zero, in the given order.
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = Self::new();
        for category in categories {
            state.register(category.as_ref());
        }
        state
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Progress lock poisoned; continuing with last known counts");
                poisoned.into_inner()
            }
        }
    }

    /// Make `category` visible in snapshots with a count of zero.
    pub fn register(&self, category: &str) {
        self.lock().slot(category);
    }

    /// Increment one category by one and return the new total across categories.
    pub fn increment(&self, category: &str) -> u64 {
        self.add(category, 1).total
    }

    /// Increment one category by `n`.
    pub fn add(&self, category: &str, n: u64) -> Tally {
        self.lock().add(category, n)
    }

    /// Increment by `n` and run `on_update` while still holding the lock.
    ///
    /// `on_update` returns whether a snapshot should be captured before the
    /// lock is released.
    pub fn record<F>(&self, category: &str, n: u64, on_update: F) -> Update
    where
        F: FnOnce(&Tally) -> bool,
    {
        let mut counters = self.lock();
        let tally = counters.add(category, n);
        let snapshot = on_update(&tally).then(|| counters.snapshot());
        Update { tally, snapshot }
    }

    pub fn count(&self, category: &str) -> u64 {
        self.lock()
            .entries
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().snapshot()
    }

    /// Zero every category, keeping registrations.
    pub fn reset(&self) {
        let mut counters = self.lock();
        for entry in counters.entries.iter_mut() {
            entry.count = 0;
        }
        counters.total = 0;
    }
}
