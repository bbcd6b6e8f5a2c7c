//! Package metadata types returned by sources

use serde::{Deserialize, Serialize};
use stow_core::{TargetFramework, Version, VersionRange};

/// One package document of a folder feed (`<lowercase-id>.json`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageIndexDocument {
    /// Package id
    pub id: String,
    /// Every published version
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

/// A published version and its dependency groups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub version: Version,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_groups: Vec<DependencyGroup>,
}

/// Dependencies declared for one framework, or for all when the framework is absent
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<TargetFramework>,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

/// Dependency edge of a package manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PackageDependency {
    pub id: String,
    #[serde(default)]
    pub range: VersionRange,
}

/// A version available from a source with its manifest for one framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersionInfo {
    pub version: Version,
    pub dependencies: Vec<PackageDependency>,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
        Self { id: id.into(), range }
    }
}

impl VersionEntry {
    /// Version with no dependencies
    pub fn new(version: Version) -> Self {
        Self {
            version,
            dependency_groups: Vec::new(),
        }
    }

    /// Version whose dependencies apply to every framework
    pub fn with_dependencies(version: Version, dependencies: Vec<PackageDependency>) -> Self {
        Self {
            version,
            dependency_groups: vec![DependencyGroup {
                target_framework: None,
                dependencies,
            }],
        }
    }

    /// Dependencies for a framework
    ///
    /// The group for exactly this framework wins, then the framework-agnostic
    /// group; with neither the version has no dependencies.
    pub fn dependencies_for(&self, framework: &TargetFramework) -> &[PackageDependency] {
        self.dependency_groups
            .iter()
            .find(|group| group.target_framework.as_ref() == Some(framework))
            .or_else(|| self.dependency_groups.iter().find(|group| group.target_framework.is_none()))
            .map(|group| group.dependencies.as_slice())
            .unwrap_or_default()
    }

    /// Manifest of this version for a framework
    pub fn to_info(&self, framework: &TargetFramework) -> PackageVersionInfo {
        PackageVersionInfo {
            version: self.version.clone(),
            dependencies: self.dependencies_for(framework).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_shape() {
        let json = r#"{
            "id": "Foo",
            "versions": [
                { "version": "1.0.0" },
                {
                    "version": "1.2.0",
                    "dependencyGroups": [
                        { "dependencies": [ { "id": "Bar", "range": "[2.0.0, )" } ] },
                        { "targetFramework": "net8.0", "dependencies": [] }
                    ]
                }
            ]
        }"#;

        let doc: PackageIndexDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.versions.len(), 2);

        let entry = &doc.versions[1];
        assert!(entry.dependencies_for(&TargetFramework::new("net8.0")).is_empty());
        let agnostic = entry.dependencies_for(&TargetFramework::new("net48"));
        assert_eq!(agnostic.len(), 1);
        assert_eq!(agnostic[0].id, "Bar");

        assert!(doc.versions[0]
            .dependencies_for(&TargetFramework::new("net8.0"))
            .is_empty());
    }
}
