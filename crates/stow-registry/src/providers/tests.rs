//! Unit tests for shared providers

use super::*;
use crate::api::PackageDependency;
use crate::source::{InMemorySource, RegisteredSourceFactory};

fn key(sources: &[&str]) -> ProviderKey {
    ProviderKey {
        packages_path: PathBuf::from("/home/dev/.stow/packages"),
        fallback_folders: Vec::new(),
        sources: sources.iter().map(|s| PackageSourceRef::from_location(*s)).collect(),
    }
}

fn factory() -> (Arc<InMemorySource>, Arc<InMemorySource>, Arc<dyn SourceFactory>) {
    let first = Arc::new(InMemorySource::new("first"));
    let second = Arc::new(InMemorySource::new("second"));
    let factory = RegisteredSourceFactory::new()
        .register("/feeds/first", first.clone())
        .register("/feeds/second", second.clone());
    (first, second, Arc::new(factory))
}

#[test]
fn test_same_key_constructs_once() {
    let (_, _, factory) = factory();
    let cache = ProviderCache::new(factory);

    let a = cache.get_or_create(&key(&["/feeds/first"])).unwrap();
    let b = cache.get_or_create(&key(&["/feeds/first"])).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.constructed(), 1);

    let c = cache.get_or_create(&key(&["/feeds/first", "/feeds/second"])).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(cache.constructed(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_concurrent_first_access_constructs_once() {
    let (_, _, factory) = factory();
    let cache = ProviderCache::new(factory);
    let shared_key = key(&["/feeds/first"]);

    let results: Vec<Arc<RestoreProviders>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| cache.get_or_create(&shared_key).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.constructed(), 1);
    assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_failed_construction_is_not_cached() {
    let (_, _, factory) = factory();
    let cache = ProviderCache::new(factory);

    assert!(cache.get_or_create(&key(&["/feeds/unknown"])).is_err());
    assert!(cache.get_or_create(&key(&["/feeds/unknown"])).is_err());
    assert_eq!(cache.constructed(), 0);
}

#[tokio::test]
async fn test_query_merges_sources_in_order() {
    let (first, second, factory) = factory();
    first.add_package("Foo", Version::new(1, 0, 0), Vec::new());
    second.add_package(
        "Foo",
        Version::new(1, 0, 0),
        vec![PackageDependency::new("Ignored", VersionRange::all())],
    );
    second.add_package("Foo", Version::new(1, 3, 0), Vec::new());

    let cache = ProviderCache::new(factory);
    let providers = cache
        .get_or_create(&key(&["/feeds/first", "/feeds/second"]))
        .unwrap();
    let net8 = TargetFramework::new("net8.0");

    let versions = providers.query("foo", &VersionRange::all(), &net8).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, Version::new(1, 0, 0));
    assert!(versions[0].dependencies.is_empty());
    assert_eq!(versions[1].version, Version::new(1, 3, 0));

    // Second query is served from the metadata cache
    providers.query("foo", &VersionRange::all(), &net8).await.unwrap();
    assert_eq!(first.queries(), 1);
    assert_eq!(second.queries(), 1);

    let latest = providers.get_latest_version("foo", &net8, false).await.unwrap();
    assert_eq!(latest, Some(Version::new(1, 3, 0)));
}

#[tokio::test]
async fn test_evict_stale_spans_every_provider_set() {
    let (first, second, factory) = factory();
    first.add_package("Foo", Version::new(1, 0, 0), Vec::new());
    second.add_package("Bar", Version::new(2, 0, 0), Vec::new());

    let cache = ProviderCache::with_metadata_ttl(factory, std::time::Duration::ZERO);
    let net8 = TargetFramework::new("net8.0");

    let a = cache.get_or_create(&key(&["/feeds/first"])).unwrap();
    let b = cache.get_or_create(&key(&["/feeds/second"])).unwrap();
    a.query("Foo", &VersionRange::all(), &net8).await.unwrap();
    b.query("Bar", &VersionRange::all(), &net8).await.unwrap();
    assert_eq!(a.metadata_cache().len(), 1);

    // A pending or failed slot is skipped
    assert!(cache.get_or_create(&key(&["/feeds/unknown"])).is_err());

    assert_eq!(cache.evict_stale(), 2);
    assert!(a.metadata_cache().is_empty());
    assert!(b.metadata_cache().is_empty());
    assert_eq!(cache.evict_stale(), 0);
}

#[tokio::test]
async fn test_evict_stale_keeps_fresh_metadata() {
    let (first, _, factory) = factory();
    first.add_package("Foo", Version::new(1, 0, 0), Vec::new());

    let cache = ProviderCache::new(factory);
    let providers = cache.get_or_create(&key(&["/feeds/first"])).unwrap();
    providers
        .query("Foo", &VersionRange::all(), &TargetFramework::new("net8.0"))
        .await
        .unwrap();

    assert_eq!(cache.evict_stale(), 0);
    assert_eq!(providers.metadata_cache().len(), 1);
}
