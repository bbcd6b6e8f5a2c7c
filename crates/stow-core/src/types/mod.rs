//! Core data types for stow restores.
//!
//! This module provides the fundamental types used throughout stow:
//! - Version and version range types
//! - Target framework monikers
//! - Project restore descriptions and their dependencies
//! - Package source references

pub mod dependency;
pub mod framework;
pub mod project;
pub mod source;
pub mod version;

// Re-export all public types
pub use dependency::LibraryDependency;
pub use framework::TargetFramework;
pub use project::{
    PackageSpec, ProjectReference, ProjectRestoreFrameworkInfo, ProjectRestoreMetadata, ProjectStyle,
    TargetFrameworkInfo,
};
pub use source::PackageSourceRef;
pub use version::{Version, VersionError, VersionRange};
