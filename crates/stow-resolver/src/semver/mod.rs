//! Version selection over interval ranges
//!
//! The walker merges every range requested for a package into one
//! intersection and asks the selector for the best available version inside
//! it. Stable versions win unless a prerelease was asked for explicitly.

use std::collections::BTreeSet;

use stow_core::{Version, VersionRange};

/// Version selector for finding best matching versions
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    /// Available versions, ascending
    available_versions: BTreeSet<Version>,
}

impl VersionSelector {
    pub fn new(versions: impl IntoIterator<Item = Version>) -> Self {
        Self {
            available_versions: versions.into_iter().collect(),
        }
    }

    /// Highest version inside every range
    pub fn select_best(&self, ranges: &[VersionRange]) -> Option<Version> {
        self.available_versions
            .iter()
            .rev()
            .find(|version| ranges.iter().all(|range| range.satisfies(version)))
            .cloned()
    }

    /// Highest stable version inside every range
    pub fn select_best_stable(&self, ranges: &[VersionRange]) -> Option<Version> {
        self.available_versions
            .iter()
            .rev()
            .filter(|version| !version.is_prerelease())
            .find(|version| ranges.iter().all(|range| range.satisfies(version)))
            .cloned()
    }

    /// Select with a preference for stable versions
    ///
    /// Without `allow_prerelease`, a prerelease is only chosen when no stable
    /// version satisfies the ranges.
    pub fn select_preferred(&self, ranges: &[VersionRange], allow_prerelease: bool) -> Option<Version> {
        if allow_prerelease {
            self.select_best(ranges)
        } else {
            self.select_best_stable(ranges)
                .or_else(|| self.select_best(ranges))
        }
    }
}

/// Intersection of all `ranges`; `None` when they share no version
///
/// An empty input yields the unbounded range.
pub fn intersect_all<'a>(ranges: impl IntoIterator<Item = &'a VersionRange>) -> Option<VersionRange> {
    ranges
        .into_iter()
        .try_fold(VersionRange::all(), |merged, range| merged.intersect(range))
}

/// Whether any requester pinned a bound to a prerelease
pub fn allows_prerelease<'a>(ranges: impl IntoIterator<Item = &'a VersionRange>) -> bool {
    ranges.into_iter().any(VersionRange::has_prerelease_bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn r(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    fn create_versions() -> Vec<Version> {
        ["1.0.0", "1.1.0", "1.2.0", "2.0.0-alpha.1", "2.0.0", "2.1.0"]
            .into_iter()
            .map(v)
            .collect()
    }

    #[test]
    fn test_select_best() {
        let selector = VersionSelector::new(create_versions());
        assert_eq!(selector.select_best(&[r("[1.0.0, 2.0.0)")]), Some(v("1.2.0")));
        assert_eq!(selector.select_best(&[r("[1.0.0, )"), r("(, 1.1.0]")]), Some(v("1.1.0")));
        assert_eq!(selector.select_best(&[r("[3.0.0, )")]), None);
    }

    #[test]
    fn test_select_preferred_stable() {
        let selector = VersionSelector::new(create_versions());
        assert_eq!(selector.select_preferred(&[r("[2.0.0-alpha.1, 2.0.0]")], false), Some(v("2.0.0")));
    }

    #[test]
    fn test_select_preferred_falls_back_to_prerelease() {
        let selector = VersionSelector::new(vec![v("1.0.0"), v("2.0.0-beta.1")]);
        assert_eq!(selector.select_preferred(&[r("[1.5.0, )")], false), Some(v("2.0.0-beta.1")));
        assert_eq!(selector.select_preferred(&[r("[1.0.0, )")], false), Some(v("1.0.0")));
        assert_eq!(selector.select_preferred(&[r("[1.0.0, )")], true), Some(v("2.0.0-beta.1")));
    }

    #[test]
    fn test_intersect_all() {
        let ranges = [r("[1.0.0, 2.0.0)"), r("[1.5.0, 3.0.0)")];
        assert_eq!(intersect_all(&ranges), Some(r("[1.5.0, 2.0.0)")));

        let disjoint = [r("[1.0.0, 2.0.0)"), r("[2.1.0, 3.0.0)")];
        assert_eq!(intersect_all(&disjoint), None);

        assert_eq!(intersect_all(std::iter::empty()), Some(VersionRange::all()));
    }

    #[test]
    fn test_allows_prerelease() {
        assert!(allows_prerelease(&[r("[1.0.0, )"), r("[2.0.0-beta.1, )")]));
        assert!(!allows_prerelease(&[r("[1.0.0, 2.0.0)")]));
    }
}
