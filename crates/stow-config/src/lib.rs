//! Restore configuration for stow
//!
//! This crate builds the global `RestoreArgs` for a restore session by
//! layering defaults, `STOW_*` environment variables and command-line flags,
//! and computes the effective package sources of each project.

pub mod args;
pub mod merge;
pub mod sources;

// Re-export main types
pub use args::RestoreArgs;
pub use merge::{CliOverrides, ConfigLayering};
pub use sources::merge_sources;

use stow_core::error::StowError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, StowError>;
