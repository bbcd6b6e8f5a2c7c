//! Package source collaborator interface
//!
//! A source answers two questions during a walk: which versions of a package
//! satisfy a range (with their manifests for one framework), and what the
//! latest version is. Sources may be slow or unreliable; every call is async
//! and failures surface as infrastructure errors.

mod feed;
mod memory;

pub use feed::FeedSource;
pub use memory::InMemorySource;

use crate::api::PackageVersionInfo;
use crate::RegistryResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use stow_core::error::StowError;
use stow_core::{PackageSourceRef, TargetFramework, Version, VersionRange};

/// A package source
#[async_trait]
pub trait PackageSource: Send + Sync + fmt::Debug {
    /// Display name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Versions of `id` satisfying `range`, ascending, with their dependencies
    /// for `framework`. A package the source does not know yields an empty list.
    async fn query_dependencies(
        &self,
        id: &str,
        range: &VersionRange,
        framework: &TargetFramework,
    ) -> RegistryResult<Vec<PackageVersionInfo>>;

    /// Highest known version of `id`
    async fn get_latest_version(
        &self,
        id: &str,
        framework: &TargetFramework,
        include_prerelease: bool,
    ) -> RegistryResult<Option<Version>> {
        let versions = self.query_dependencies(id, &VersionRange::all(), framework).await?;
        Ok(versions
            .into_iter()
            .map(|info| info.version)
            .filter(|version| include_prerelease || !version.is_prerelease())
            .max())
    }
}

/// Turns configured source references into live sources
pub trait SourceFactory: Send + Sync + fmt::Debug {
    fn create(&self, source: &PackageSourceRef) -> RegistryResult<Arc<dyn PackageSource>>;
}

/// Factory for local folder feeds
///
/// Network sources need a client outside this crate; their locations are
/// rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedSourceFactory;

impl SourceFactory for FeedSourceFactory {
    fn create(&self, source: &PackageSourceRef) -> RegistryResult<Arc<dyn PackageSource>> {
        if !source.is_local() {
            return Err(StowError::SourceUnavailable {
                source_name: source.name.clone(),
                message: format!("'{}' is not a local feed folder", source.source),
                source: None,
            });
        }

        let location = source.source.trim();
        let root = PathBuf::from(location.strip_prefix("file://").unwrap_or(location));
        Ok(Arc::new(FeedSource::new(source.name.clone(), root)))
    }
}

/// Factory handing out pre-built sources by location
///
/// Lets embedders and tests plug any `PackageSource` into the provider cache.
#[derive(Debug, Default, Clone)]
pub struct RegisteredSourceFactory {
    sources: HashMap<String, Arc<dyn PackageSource>>,
}

impl RegisteredSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `source` for every reference whose location matches `location`
    pub fn register(mut self, location: &str, source: Arc<dyn PackageSource>) -> Self {
        let key = PackageSourceRef::from_location(location).normalized_location();
        self.sources.insert(key, source);
        self
    }
}

impl SourceFactory for RegisteredSourceFactory {
    fn create(&self, source: &PackageSourceRef) -> RegistryResult<Arc<dyn PackageSource>> {
        self.sources
            .get(&source.normalized_location())
            .cloned()
            .ok_or_else(|| StowError::SourceUnavailable {
                source_name: source.name.clone(),
                message: format!("no source registered for '{}'", source.source),
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_core::ErrorCategory;

    #[test]
    fn test_feed_factory_rejects_remote() {
        let err = FeedSourceFactory
            .create(&PackageSourceRef::from_location("https://feed.example/v3"))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Infrastructure);

        let source = FeedSourceFactory
            .create(&PackageSourceRef::new("local", "file:///var/feed"))
            .unwrap();
        assert_eq!(source.name(), "local");
    }

    #[test]
    fn test_registered_factory_matches_normalized_location() {
        let memory: Arc<dyn PackageSource> = Arc::new(InMemorySource::new("memory"));
        let factory = RegisteredSourceFactory::new().register("/feeds/Memory/", memory);

        assert!(factory.create(&PackageSourceRef::from_location("/feeds/memory")).is_ok());
        assert!(factory.create(&PackageSourceRef::from_location("/feeds/other")).is_err());
    }
}
