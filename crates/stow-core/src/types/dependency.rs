//! Package dependency declarations.
//!
//! A dependency is keyed by package id in its owning map; this type carries
//! the requested range and the asset flags handed through to the lock file.

use super::VersionRange;
use serde::{Deserialize, Serialize};

/// Direct package dependency of a project
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDependency {
    #[serde(rename = "version", default)]
    pub range: VersionRange,

    /// Assets to consume (`all`, `compile;runtime`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_assets: Option<String>,

    /// Assets to drop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_assets: Option<String>,

    /// Assets hidden from projects that reference this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_parent: Option<String>,
}

impl LibraryDependency {
    /// Create a dependency on the given range
    pub fn new(range: VersionRange) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn with_include_assets(mut self, assets: impl Into<String>) -> Self {
        self.include_assets = Some(assets.into());
        self
    }

    pub fn with_exclude_assets(mut self, assets: impl Into<String>) -> Self {
        self.exclude_assets = Some(assets.into());
        self
    }

    pub fn with_suppress_parent(mut self, assets: impl Into<String>) -> Self {
        self.suppress_parent = Some(assets.into());
        self
    }

    /// Check if the dependency stays private to the declaring project
    pub fn is_private(&self) -> bool {
        self.suppress_parent
            .as_deref()
            .is_some_and(|flags| flags.split(';').any(|flag| flag.trim().eq_ignore_ascii_case("all")))
    }
}
