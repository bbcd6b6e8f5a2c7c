//! Package source access for stow
//!
//! This crate provides the package-source collaborator interface used during
//! graph walks, a local folder feed and an in-memory source, a TTL metadata
//! cache, and the process-wide provider cache that shares one provider set
//! among every project with the same packages path, fallback folders and
//! sources.

pub mod api;
pub mod cache;
pub mod providers;
pub mod source;

// Re-export main types
pub use api::{DependencyGroup, PackageDependency, PackageIndexDocument, PackageVersionInfo, VersionEntry};
pub use cache::{CacheEntry, MetadataCache, QueryKey};
pub use providers::{ProviderCache, ProviderKey, RestoreProviders};
pub use source::{
    FeedSource, FeedSourceFactory, InMemorySource, PackageSource, RegisteredSourceFactory, SourceFactory,
};

use stow_core::error::StowError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, StowError>;
