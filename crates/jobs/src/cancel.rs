// crates/jobs/src/cancel.rs
//! Process-wide stop flags keyed by job id.

use std::collections::HashSet;
use std::sync::RwLock;

use guild_sweep_core::JobId;

/// Cooperative cancellation: entry present means "stop requested".
///
/// A flag stays set until the next job for the same id starts and calls
/// [`CancelRegistry::clear`].
#[derive(Default)]
pub struct CancelRegistry {
    flags: RwLock<HashSet<JobId>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self, job_id: JobId) {
        match self.flags.write() {
            Ok(mut flags) => {
                flags.insert(job_id);
            }
            Err(e) => tracing::error!("RwLock poisoned writing stop flags: {e}"),
        }
    }

    pub fn is_stop_requested(&self, job_id: JobId) -> bool {
        match self.flags.read() {
            Ok(flags) => flags.contains(&job_id),
            Err(e) => {
                // Unreadable flags read as stopped.
                tracing::error!("RwLock poisoned reading stop flags: {e}");
                true
            }
        }
    }

    pub fn clear(&self, job_id: JobId) {
        match self.flags.write() {
            Ok(mut flags) => {
                flags.remove(&job_id);
            }
            Err(e) => tracing::error!("RwLock poisoned clearing stop flags: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_lifecycle() {
        let registry = CancelRegistry::new();
        assert!(!registry.is_stop_requested(1));

        registry.request_stop(1);
        assert!(registry.is_stop_requested(1));
        // Setting twice is harmless.
        registry.request_stop(1);
        assert!(registry.is_stop_requested(1));

        registry.clear(1);
        assert!(!registry.is_stop_requested(1));
    }

    #[test]
    fn test_flags_are_per_job() {
        let registry = CancelRegistry::new();
        registry.request_stop(1);
        assert!(!registry.is_stop_requested(2));
        registry.clear(2);
        assert!(registry.is_stop_requested(1));
    }
}
