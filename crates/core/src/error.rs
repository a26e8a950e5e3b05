// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::types::JobId;

/// Failure of a single fetch or per-item call against the target.
///
/// Never fatal to a job: the executor logs it and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("Missing permission for {category}")]
    PermissionDenied { category: String },

    #[error("Transient API error: {message}")]
    Transient { message: String },

    #[error("Item no longer exists")]
    NotFound,

    #[error("{0}")]
    Other(String),
}

impl ItemError {
    pub fn permission(category: impl Into<String>) -> Self {
        Self::PermissionDenied {
            category: category.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Short tag for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Transient { .. } => "transient",
            Self::NotFound => "not_found",
            Self::Other(_) => "other",
        }
    }
}

/// Errors surfaced by the job controller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("A sweep is already in progress for target {0}")]
    AlreadyRunning(JobId),
}

/// A progress update could not be delivered. Always swallowed by the reporter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Progress destination unreachable: {0}")]
    Unreachable(String),

    #[error("No subscribers for progress updates")]
    NoSubscribers,
}

/// Errors from the durable counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed state file {path}: {message}")]
    MalformedJson { path: PathBuf, message: String },

    #[error("State lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors loading [`crate::config::SweepConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },
}
