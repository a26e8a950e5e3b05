// crates/core/src/config.rs
//! Sweep configuration.
//!
//! Loaded from an optional TOML file, then overridden by `GUILD_SWEEP_*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const ENV_MAX_CONCURRENCY: &str = "GUILD_SWEEP_MAX_CONCURRENCY";
const ENV_UPDATE_INTERVAL: &str = "GUILD_SWEEP_UPDATE_INTERVAL";
const ENV_STATE_DIR: &str = "GUILD_SWEEP_STATE_DIR";

/// Verification level forced onto a swept server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    None,
    Low,
    Medium,
    High,
    Highest,
}

/// Server name, description and verification level applied by the
/// settings stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub name: String,
    pub description: String,
    pub verification_level: VerificationLevel,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            name: "Nuked Server".into(),
            description: "This server has been cleaned up.".into(),
            verification_level: VerificationLevel::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Emit a progress update every time the running total hits a multiple
    /// of this value.
    pub update_interval: u64,
    /// Per-category ceiling on in-flight item calls.
    pub max_concurrency: usize,
    /// Directory for persisted counters. `None` keeps state in memory.
    pub state_dir: Option<PathBuf>,
    /// User ids allowed to start or stop a sweep.
    pub allowed_users: Vec<u64>,
    pub settings: GuildSettings,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            update_interval: 5,
            max_concurrency: 5,
            state_dir: None,
            allowed_users: Vec::new(),
            settings: GuildSettings::default(),
        }
    }
}

impl SweepConfig {
    /// Load from `path` if given, otherwise defaults; then apply env overrides.
    ///
    /// An explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config.normalized())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str::<Self>(raw)
            .map(Self::normalized)
            .map_err(|e| e.to_string())
    }

    /// Apply overrides from a variable lookup (the process env in `load`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = parse_env(ENV_MAX_CONCURRENCY, &value)?;
        }
        if let Some(value) = lookup(ENV_UPDATE_INTERVAL) {
            self.update_interval = parse_env(ENV_UPDATE_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_STATE_DIR) {
            if !value.is_empty() {
                self.state_dir = Some(PathBuf::from(value));
            }
        }
        Ok(())
    }

    /// Clamp zero values so the semaphore and the modulo stay valid.
    pub fn normalized(mut self) -> Self {
        self.max_concurrency = self.max_concurrency.max(1);
        self.update_interval = self.update_interval.max(1);
        self
    }

    pub fn is_allowed(&self, user_id: u64) -> bool {
        self.allowed_users.contains(&user_id)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}
