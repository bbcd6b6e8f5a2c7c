//! Effective package source computation.

use std::collections::HashSet;
use std::path::Path;
use stow_core::utils::normalize_path;
use stow_core::PackageSourceRef;

/// Compute the effective sources of one project
///
/// Graph-level overrides, when present, replace everything. Otherwise the
/// project's own sources come first, followed by global sources it does not
/// already list. Disabled sources are dropped and duplicates (by normalized
/// location) keep their first occurrence.
pub fn merge_sources(
    overrides: Option<&[PackageSourceRef]>,
    project_sources: &[PackageSourceRef],
    global_sources: &[PackageSourceRef],
) -> Vec<PackageSourceRef> {
    let candidates: Vec<&PackageSourceRef> = match overrides {
        Some(overrides) => overrides.iter().collect(),
        None => project_sources.iter().chain(global_sources.iter()).collect(),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|source| source.enabled)
        .filter(|source| seen.insert(dedup_key(source)))
        .cloned()
        .collect()
}

fn dedup_key(source: &PackageSourceRef) -> String {
    let location = source.source.trim();
    if source.is_local() && !location.starts_with("file://") {
        let normalized = normalize_path(Path::new(location));
        PackageSourceRef::from_location(normalized.to_string_lossy()).normalized_location()
    } else {
        source.normalized_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(location: &str) -> PackageSourceRef {
        PackageSourceRef::from_location(location)
    }

    #[test]
    fn test_project_sources_first() {
        let merged = merge_sources(
            None,
            &[src("/feeds/local")],
            &[src("https://feed.example/v3"), src("/feeds/local/")],
        );
        assert_eq!(merged, vec![src("/feeds/local"), src("https://feed.example/v3")]);
    }

    #[test]
    fn test_overrides_replace_everything() {
        let merged = merge_sources(
            Some(&[src("/override")]),
            &[src("/feeds/local")],
            &[src("https://feed.example/v3")],
        );
        assert_eq!(merged, vec![src("/override")]);
    }

    #[test]
    fn test_disabled_and_relative_duplicates() {
        let merged = merge_sources(
            None,
            &[src("feeds/./a"), src("/disabled").disabled()],
            &[src("feeds/a"), src("FEEDS/b/../a")],
        );
        assert_eq!(merged, vec![src("feeds/./a")]);
    }
}
