//! Shared resolution providers
//!
//! Projects restored in one session that share a packages path, fallback
//! folders and source list also share one `RestoreProviders` instance, and
//! with it one metadata cache. `ProviderCache` hands those instances out,
//! constructing each at most once per key even under concurrent first access.

use crate::api::PackageVersionInfo;
use crate::cache::{MetadataCache, QueryKey, DEFAULT_TTL};
use crate::source::{PackageSource, SourceFactory};
use crate::RegistryResult;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stow_core::error::StowError;
use stow_core::{PackageSourceRef, TargetFramework, Version, VersionRange};
use tracing::{debug, trace};

/// Identity of a provider set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    pub packages_path: PathBuf,
    pub fallback_folders: Vec<PathBuf>,
    pub sources: Vec<PackageSourceRef>,
}

/// Sources plus the metadata cache shared by every walk with the same key
///
/// Only read access is exposed; instances are shared across concurrent walks.
#[derive(Debug)]
pub struct RestoreProviders {
    key: ProviderKey,
    sources: Vec<Arc<dyn PackageSource>>,
    cache: MetadataCache,
}

impl RestoreProviders {
    pub fn new(key: ProviderKey, sources: Vec<Arc<dyn PackageSource>>) -> Self {
        Self::with_metadata_ttl(key, sources, DEFAULT_TTL)
    }

    pub fn with_metadata_ttl(key: ProviderKey, sources: Vec<Arc<dyn PackageSource>>, ttl: Duration) -> Self {
        Self {
            key,
            sources,
            cache: MetadataCache::with_ttl(ttl),
        }
    }

    pub fn key(&self) -> &ProviderKey {
        &self.key
    }

    pub fn sources(&self) -> &[Arc<dyn PackageSource>] {
        &self.sources
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Versions of `id` in `range` across all sources, ascending
    ///
    /// When several sources publish the same version, the first source in
    /// order wins.
    pub async fn query(
        &self,
        id: &str,
        range: &VersionRange,
        framework: &TargetFramework,
    ) -> RegistryResult<Vec<PackageVersionInfo>> {
        let mut merged: BTreeMap<Version, PackageVersionInfo> = BTreeMap::new();

        for source in &self.sources {
            let key = QueryKey::new(source.name(), id, range, framework);
            let versions = match self.cache.get(&key) {
                Some(hit) => {
                    trace!(source = source.name(), package = id, "metadata cache hit");
                    hit
                },
                None => {
                    let fetched = source.query_dependencies(id, range, framework).await?;
                    self.cache.insert(key, fetched.clone());
                    fetched
                },
            };

            for info in versions {
                merged.entry(info.version.clone()).or_insert(info);
            }
        }

        Ok(merged.into_values().collect())
    }

    /// Highest version of `id` known to any source, served through the metadata cache
    pub async fn get_latest_version(
        &self,
        id: &str,
        framework: &TargetFramework,
        include_prerelease: bool,
    ) -> RegistryResult<Option<Version>> {
        let versions = self.query(id, &VersionRange::all(), framework).await?;
        Ok(versions
            .into_iter()
            .map(|info| info.version)
            .filter(|version| include_prerelease || !version.is_prerelease())
            .max())
    }
}

/// Injectable cache of provider sets, one per distinct `ProviderKey`
#[derive(Debug)]
pub struct ProviderCache {
    factory: Arc<dyn SourceFactory>,
    entries: DashMap<ProviderKey, Arc<OnceCell<Arc<RestoreProviders>>>>,
    constructed: AtomicUsize,
    metadata_ttl: Duration,
}

impl ProviderCache {
    pub fn new(factory: Arc<dyn SourceFactory>) -> Self {
        Self::with_metadata_ttl(factory, DEFAULT_TTL)
    }

    /// Provider sets whose cached query results live for `metadata_ttl`
    pub fn with_metadata_ttl(factory: Arc<dyn SourceFactory>, metadata_ttl: Duration) -> Self {
        Self {
            factory,
            entries: DashMap::new(),
            constructed: AtomicUsize::new(0),
            metadata_ttl,
        }
    }

    /// Shared providers for `key`, constructing them on first use
    ///
    /// Concurrent callers with the same key block on one initialization slot,
    /// so construction happens exactly once. A failed construction leaves the
    /// slot empty for the next caller.
    pub fn get_or_create(&self, key: &ProviderKey) -> RegistryResult<Arc<RestoreProviders>> {
        let slot = {
            let entry = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        if let Some(providers) = slot.get() {
            trace!(packages_path = %key.packages_path.display(), "provider cache hit");
            return Ok(Arc::clone(providers));
        }

        let providers = slot.get_or_try_init(|| self.construct(key))?;

        if providers.key() != key {
            return Err(StowError::invariant(format!(
                "provider cache slot for {} holds providers for {}",
                key.packages_path.display(),
                providers.key().packages_path.display()
            )));
        }
        Ok(Arc::clone(providers))
    }

    fn construct(&self, key: &ProviderKey) -> RegistryResult<Arc<RestoreProviders>> {
        let sources = key
            .sources
            .iter()
            .map(|source| self.factory.create(source))
            .collect::<RegistryResult<Vec<_>>>()?;

        self.constructed.fetch_add(1, Ordering::SeqCst);
        debug!(
            packages_path = %key.packages_path.display(),
            sources = sources.len(),
            "constructed restore providers"
        );
        Ok(Arc::new(RestoreProviders::with_metadata_ttl(
            key.clone(),
            sources,
            self.metadata_ttl,
        )))
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop stale metadata from every constructed provider set
    ///
    /// Returns the number of entries removed. Slots whose construction is
    /// still pending or failed are skipped.
    pub fn evict_stale(&self) -> usize {
        let evicted: usize = self
            .entries
            .iter()
            .filter_map(|entry| entry.value().get().map(|providers| providers.metadata_cache().cleanup()))
            .sum();
        if evicted > 0 {
            debug!(evicted, "evicted stale package metadata");
        }
        evicted
    }

    /// Number of provider sets constructed so far
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests;
