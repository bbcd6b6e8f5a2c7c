//! Dependency resolution engine for stow
//!
//! This crate turns a dependency graph of projects into one restore request
//! per root project, walks each request's package graph per target framework
//! and writes the resulting lock files, restoring independent projects in
//! parallel.

pub mod diagnostics;
pub mod external;
pub mod graph;
pub mod request;
pub mod runner;
pub mod semver;
pub mod tools;
pub mod walk;

// Re-export main types
pub use diagnostics::{Diagnostic, DiagnosticCode, RequestedRange, ResolutionConflict, Severity};
pub use external::ExternalProjectReference;
pub use graph::{DependencyGraphSpec, DG_FILE_NAME};
pub use request::{RestoreRequest, RestoreRequestBuilder, RestoreSummaryRequest};
pub use runner::{ProjectRestoreResult, RestoreBatchResult, RestoreOutcome, RestoreRunner};
pub use semver::VersionSelector;
pub use tools::{dedup_tool_requests, ToolDedup, ToolRequestKey};
pub use walk::{FrameworkResolution, GraphWalker, ResolvedPackage, ResolvedProject, WalkResult};

use stow_core::error::StowError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, StowError>;
