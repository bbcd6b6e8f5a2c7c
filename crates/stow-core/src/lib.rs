//! # stow-core
//!
//! Core types and utilities shared across all stow crates.
//!
//! This crate provides:
//! - `Version` and `VersionRange` with interval-notation parsing
//! - `PackageSpec`, the per-project restore description, and its parts
//! - `StowError`, the unified error type with its category taxonomy
//! - Hashing and path helpers
//!
//! ## Architecture
//!
//! - `types`: core data types (versions, frameworks, project specs, sources)
//! - `error`: error types and result aliases
//! - `utils`: utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorCategory, StowError, StowResult};
pub use types::{
    LibraryDependency, PackageSourceRef, PackageSpec, ProjectReference, ProjectRestoreMetadata,
    ProjectStyle, TargetFramework, Version, VersionRange,
};
