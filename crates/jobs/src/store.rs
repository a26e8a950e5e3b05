// crates/jobs/src/store.rs
//! Durable write-through of sweep counters.
//!
//! Every successful item updates the persisted count for its category so a
//! separate process can inspect progress after a crash.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use guild_sweep_core::{JobId, StoreError};
use serde::{Deserialize, Serialize};

/// Persisted state of one target's sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub job_id: JobId,
    pub in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
}

impl PersistedState {
    fn empty(job_id: JobId) -> Self {
        Self {
            job_id,
            ..Self::default()
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Key-value store for per-target counters.
///
/// Calls are synchronous: the executor invokes `persist_count` while holding
/// the progress lock.
pub trait CountStore: Send + Sync {
    fn persist_count(&self, job_id: JobId, category: &str, count: u64) -> Result<(), StoreError>;

    fn set_in_progress(
        &self,
        job_id: JobId,
        in_progress: bool,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    fn load(&self, job_id: JobId) -> Result<Option<PersistedState>, StoreError>;

    /// Forget everything stored for `job_id`.
    fn clear(&self, job_id: JobId) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    states: Mutex<HashMap<JobId, PersistedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn states(&self) -> Result<MutexGuard<'_, HashMap<JobId, PersistedState>>, StoreError> {
        self.states.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl CountStore for MemoryStore {
    fn persist_count(&self, job_id: JobId, category: &str, count: u64) -> Result<(), StoreError> {
        self.states()?
            .entry(job_id)
            .or_insert_with(|| PersistedState::empty(job_id))
            .counts
            .insert(category.to_string(), count);
        Ok(())
    }

    fn set_in_progress(
        &self,
        job_id: JobId,
        in_progress: bool,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut states = self.states()?;
        let state = states
            .entry(job_id)
            .or_insert_with(|| PersistedState::empty(job_id));
        state.in_progress = in_progress;
        state.started_at = started_at;
        Ok(())
    }

    fn load(&self, job_id: JobId) -> Result<Option<PersistedState>, StoreError> {
        Ok(self.states()?.get(&job_id).cloned())
    }

    fn clear(&self, job_id: JobId) -> Result<(), StoreError> {
        self.states()?.remove(&job_id);
        Ok(())
    }
}

// ============================================================================
// JSON files
// ============================================================================

/// One `<job_id>.json` file per target under a state directory.
///
/// Writes go to a temp file and are renamed into place so a crash never
/// leaves a half-written state file.
pub struct JsonFileStore {
    dir: PathBuf,
    cache: Mutex<HashMap<JobId, PersistedState>>,
}

impl JsonFileStore {
    /// Open (and create if needed) the state directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self {
            dir,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job_id: JobId) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    fn read_file(&self, job_id: JobId) -> Result<Option<PersistedState>, StoreError> {
        let path = self.path_for(job_id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::MalformedJson {
                path,
                message: e.to_string(),
            })
    }

    fn write_file(&self, state: &PersistedState) -> Result<(), StoreError> {
        let path = self.path_for(state.job_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(state).map_err(|e| StoreError::MalformedJson {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&tmp, body).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))
    }

    /// Apply `f` to the cached state (loading it from disk on first use) and
    /// write the result through. The cache only changes once the write lands.
    fn update<F>(&self, job_id: JobId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut PersistedState),
    {
        let mut cache = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = match cache.get(&job_id) {
            Some(state) => state.clone(),
            None => self
                .read_file(job_id)?
                .unwrap_or_else(|| PersistedState::empty(job_id)),
        };
        f(&mut next);
        self.write_file(&next)?;
        cache.insert(job_id, next);
        Ok(())
    }
}

impl CountStore for JsonFileStore {
    fn persist_count(&self, job_id: JobId, category: &str, count: u64) -> Result<(), StoreError> {
        self.update(job_id, |state| {
            state.counts.insert(category.to_string(), count);
        })
    }

    fn set_in_progress(
        &self,
        job_id: JobId,
        in_progress: bool,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.update(job_id, |state| {
            state.in_progress = in_progress;
            state.started_at = started_at;
        })
    }

    fn load(&self, job_id: JobId) -> Result<Option<PersistedState>, StoreError> {
        let cache = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        match cache.get(&job_id) {
            Some(state) => Ok(Some(state.clone())),
            None => self.read_file(job_id),
        }
    }

    fn clear(&self, job_id: JobId) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().map_err(|_| StoreError::Poisoned)?;
        cache.remove(&job_id);
        let path = self.path_for(job_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}
