// crates/core/src/lib.rs
//! Shared types for guild-sweep: categories, progress snapshots, reports,
//! errors and configuration.

pub mod category;
pub mod config;
pub mod error;
pub mod types;

pub use category::Category;
pub use config::{GuildSettings, SweepConfig, VerificationLevel};
pub use error::*;
pub use types::*;
