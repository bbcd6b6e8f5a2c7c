//! In-memory package source

use super::PackageSource;
use crate::api::{PackageDependency, PackageVersionInfo, VersionEntry};
use crate::RegistryResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use stow_core::error::StowError;
use stow_core::{TargetFramework, Version, VersionRange};

/// Programmatic source that counts the queries it serves
#[derive(Debug)]
pub struct InMemorySource {
    name: String,
    packages: DashMap<String, BTreeMap<Version, VersionEntry>>,
    queries: AtomicUsize,
    unavailable: AtomicBool,
    delay: Option<Duration>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: DashMap::new(),
            queries: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Wait this long before answering each query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Publish a version whose dependencies apply to every framework
    pub fn add_package(&self, id: &str, version: Version, dependencies: Vec<PackageDependency>) {
        self.add_entry(id, VersionEntry::with_dependencies(version, dependencies));
    }

    /// Publish a version with explicit dependency groups
    pub fn add_entry(&self, id: &str, entry: VersionEntry) {
        self.packages
            .entry(id.to_ascii_lowercase())
            .or_default()
            .insert(entry.version.clone(), entry);
    }

    /// Make every following query fail as if the source were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of queries served so far
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageSource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_dependencies(
        &self,
        id: &str,
        range: &VersionRange,
        framework: &TargetFramework,
    ) -> RegistryResult<Vec<PackageVersionInfo>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StowError::SourceUnavailable {
                source_name: self.name.clone(),
                message: "source is offline".to_string(),
                source: None,
            });
        }

        let Some(versions) = self.packages.get(&id.to_ascii_lowercase()) else {
            return Ok(Vec::new());
        };

        // BTreeMap iteration is already ascending
        Ok(versions
            .values()
            .filter(|entry| range.satisfies(&entry.version))
            .map(|entry| entry.to_info(framework))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_queries() {
        let source = InMemorySource::new("memory");
        source.add_package("Foo", Version::new(1, 0, 0), Vec::new());
        source.add_package("foo", Version::new(1, 2, 0), Vec::new());
        let net8 = TargetFramework::new("net8.0");

        let found = source
            .query_dependencies("FOO", &VersionRange::parse("[1.1, )").unwrap(), &net8)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, Version::new(1, 2, 0));
        assert_eq!(source.queries(), 1);

        source.set_unavailable(true);
        assert!(source.query_dependencies("foo", &VersionRange::all(), &net8).await.is_err());
        assert_eq!(source.queries(), 2);
    }
}
