// crates/cli/src/lib.rs
//! Command layer for `guild-sweep`: authorization, simulated targets,
//! terminal progress and report rendering.

pub mod auth;
pub mod commands;
pub mod fixture;
pub mod spinner;
pub mod summary;

pub use auth::{authorize, check_permissions, AuthError, Permission, REQUIRED_PERMISSIONS};
pub use commands::RunArgs;
pub use fixture::Fixture;
pub use spinner::SpinnerSink;
