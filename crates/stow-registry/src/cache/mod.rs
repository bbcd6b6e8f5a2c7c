//! Query-result caching with TTL support

use crate::api::PackageVersionInfo;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use stow_core::{TargetFramework, VersionRange};

/// Default time-to-live of a cached query (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Identity of one source query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub source: String,
    pub package_id: String,
    pub range: VersionRange,
    pub framework: TargetFramework,
}

impl QueryKey {
    pub fn new(source: &str, package_id: &str, range: &VersionRange, framework: &TargetFramework) -> Self {
        Self {
            source: source.to_string(),
            package_id: package_id.to_ascii_lowercase(),
            range: range.clone(),
            framework: framework.clone(),
        }
    }
}

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached query result
    pub versions: Vec<PackageVersionInfo>,
    /// When the entry was stored
    pub stored_at: Instant,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create cache entry with custom TTL
    pub fn with_ttl(versions: Vec<PackageVersionInfo>, ttl: Duration) -> Self {
        Self {
            versions,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// In-memory query cache shared by all walks using one provider set
#[derive(Debug)]
pub struct MetadataCache {
    cache: DashMap<QueryKey, CacheEntry>,
    ttl: Duration,
}

impl MetadataCache {
    /// Create new metadata cache
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache whose entries live for `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Get a cached result if fresh
    pub fn get(&self, key: &QueryKey) -> Option<Vec<PackageVersionInfo>> {
        let fresh = {
            let entry = self.cache.get(key)?;
            entry.is_fresh().then(|| entry.versions.clone())
        };

        if fresh.is_none() {
            // Stale entry; the read guard is released above
            self.cache.remove(key);
        }
        fresh
    }

    /// Store a result with the cache TTL
    pub fn insert(&self, key: QueryKey, versions: Vec<PackageVersionInfo>) {
        self.cache.insert(key, CacheEntry::with_ttl(versions, self.ttl));
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Remove stale entries
    pub fn cleanup(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_fresh());
        before - self.cache.len()
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}
