//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use std::sync::Arc;
use stow_config::RestoreArgs;
use stow_core::{PackageSourceRef, PackageSpec, ProjectReference, Version, VersionRange};
use stow_registry::{InMemorySource, PackageDependency, ProviderCache, RegisteredSourceFactory};
use stow_resolver::{DependencyGraphSpec, RestoreRequest, RestoreRequestBuilder};

/// Location the synthetic feed is registered under
pub const BENCH_FEED: &str = "/bench/feed";

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

pub fn project_name(index: usize) -> String {
    format!("Project{index:04}")
}

pub fn package_name(index: usize) -> String {
    format!("Package{index:04}")
}

/// Layered project graph: every project references up to `fan_out`
/// projects of the next layer, so closures overlap like a real solution
pub fn layered_graph(projects: usize, fan_out: usize) -> DependencyGraphSpec {
    let layer_width = fan_out.max(1) * 2;
    let mut graph = DependencyGraphSpec::new();

    for index in 0..projects {
        let name = project_name(index);
        let mut spec = PackageSpec::new(&name, format!("/bench/{name}/{name}.csproj"));
        spec.add_framework("net8.0");

        let next_layer = (index / layer_width + 1) * layer_width;
        for offset in 0..fan_out {
            let target = next_layer + (index + offset) % layer_width;
            if target < projects {
                spec.add_project_reference("net8.0", project_name(target), ProjectReference::default());
            }
        }
        spec.add_package_dependency("net8.0", package_name(index % 50), VersionRange::at_least(Version::new(1, 0, 0)));

        if graph.add_project(spec).is_ok() && index < layer_width {
            graph.add_restore(name);
        }
    }

    graph
}

/// Feed with `packages` packages of `versions` versions each; package `i`
/// depends on package `i + 1`, so a walk over package 0 visits all of them
pub fn chained_feed(packages: usize, versions: usize) -> Arc<InMemorySource> {
    let source = Arc::new(InMemorySource::new("bench"));

    for index in 0..packages {
        for minor in 0..versions {
            let dependencies = if index + 1 < packages {
                vec![PackageDependency::new(
                    package_name(index + 1),
                    VersionRange::at_least(Version::new(1, 0, 0)),
                )]
            } else {
                Vec::new()
            };
            source.add_package(&package_name(index), Version::new(1, minor as u64, 0), dependencies);
        }
    }

    source
}

/// Request for `root` of `graph` against `source`
pub fn bench_request(graph: &DependencyGraphSpec, root: &str, source: Arc<InMemorySource>) -> Option<RestoreRequest> {
    let args = RestoreArgs {
        sources: vec![PackageSourceRef::from_location(BENCH_FEED)],
        ..Default::default()
    };
    let cache = ProviderCache::new(Arc::new(RegisteredSourceFactory::new().register(BENCH_FEED, source)));

    RestoreRequestBuilder::new(&args, &cache)
        .build_for_root(graph, root)
        .ok()
        .map(|summary| summary.request)
}
