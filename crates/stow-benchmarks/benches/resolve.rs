//! Resolution performance benchmarks
//!
//! Version selection over large version lists, range intersection and the
//! full per-framework graph walk against an in-memory feed.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use stow_benchmarks::{bench_request, chained_feed, criterion_config, package_name};
use stow_core::{PackageSpec, Version, VersionRange};
use stow_resolver::semver::intersect_all;
use stow_resolver::{DependencyGraphSpec, GraphWalker, VersionSelector};
use tokio::runtime::Runtime;

fn bench_version_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_selection");

    for count in [10, 100, 1000].iter() {
        let versions = (0..*count).map(|i| Version::new(1, i as u64 / 10, i as u64 % 10));
        let selector = VersionSelector::new(versions);
        let ranges: Vec<VersionRange> = ["[1.0.0, )", "[1.2.0, 1.50.0)"]
            .iter()
            .filter_map(|input| VersionRange::parse(input).ok())
            .collect();
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("select_preferred", count), count, |b, _| {
            b.iter(|| black_box(selector.select_preferred(&ranges, false)))
        });
    }

    group.finish();
}

fn bench_range_intersection(c: &mut Criterion) {
    let ranges: Vec<VersionRange> = ["[1.0.0, )", "[1.2.0, 3.0.0)", "(1.1.0, 2.5.0]", "[1.4.0, 2.0.0)", "1.5.0"]
        .iter()
        .filter_map(|input| VersionRange::parse(input).ok())
        .collect();

    c.bench_function("intersect_all", |b| b.iter(|| black_box(intersect_all(ranges.iter()))));
    c.bench_function("parse_range", |b| {
        b.iter(|| black_box(VersionRange::parse(black_box("[1.2.0-beta.1, 3.0.0)")).is_ok()))
    });
}

fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");
    group.sample_size(20);
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    for depth in [10, 50, 200].iter() {
        let mut root = PackageSpec::new("App", "/bench/App/App.csproj");
        root.add_package_dependency("net8.0", package_name(0), VersionRange::at_least(Version::new(1, 0, 0)));
        let mut graph = DependencyGraphSpec::new();
        if graph.add_project(root).is_err() {
            continue;
        }
        graph.add_restore("App");

        group.throughput(Throughput::Elements(*depth as u64));
        group.bench_with_input(BenchmarkId::new("chain", depth), depth, |b, &depth| {
            b.iter_batched(
                || bench_request(&graph, "App", chained_feed(depth, 5)),
                |request| {
                    if let Some(request) = request {
                        let result = rt.block_on(GraphWalker::new(&request).walk());
                        black_box(result.success());
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_version_selection, bench_range_intersection, bench_walk
}
criterion_main!(benches);
