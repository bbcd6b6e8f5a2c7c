//! Project restore descriptions.
//!
//! A `PackageSpec` describes one project as the build host sees it: its
//! target frameworks, direct package dependencies per framework, and the
//! restore metadata (style, paths, sources, project references). The unique
//! name in the restore metadata is the only key used to join projects across
//! a dependency graph.

use super::{LibraryDependency, PackageSourceRef, TargetFramework, Version, VersionRange};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of project file a spec was produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectStyle {
    PackageReference,
    PackagesConfig,
    ProjectJson,
    /// Pseudo-project representing a globally installed tool
    DotnetCliTool,
    #[default]
    Unknown,
}

impl ProjectStyle {
    pub fn is_tool(&self) -> bool {
        matches!(self, ProjectStyle::DotnetCliTool)
    }
}

impl fmt::Display for ProjectStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectStyle::PackageReference => "PackageReference",
            ProjectStyle::PackagesConfig => "PackagesConfig",
            ProjectStyle::ProjectJson => "ProjectJson",
            ProjectStyle::DotnetCliTool => "DotnetCliTool",
            ProjectStyle::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Reference from one project to another, keyed by the referenced unique name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<PathBuf>,

    /// Framework of the referenced project to consume, when it differs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<TargetFramework>,
}

/// Per-framework restore metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRestoreFrameworkInfo {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub project_references: IndexMap<String, ProjectReference>,
}

/// Per-framework package dependencies
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFrameworkInfo {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, LibraryDependency>,
}

/// Restore settings of one project
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRestoreMetadata {
    /// Filled from the graph key when omitted
    #[serde(default)]
    pub project_unique_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_name: String,

    pub project_path: PathBuf,

    #[serde(default)]
    pub project_style: ProjectStyle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_file_paths: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_folders: Vec<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<PackageSourceRef>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub frameworks: IndexMap<TargetFramework, ProjectRestoreFrameworkInfo>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub legacy_packages_directory: bool,
}

/// Restore description of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default = "default_project_version")]
    pub version: Version,

    pub restore: ProjectRestoreMetadata,

    /// Dependencies shared by every framework
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, LibraryDependency>,

    #[serde(default)]
    pub frameworks: IndexMap<TargetFramework, TargetFrameworkInfo>,
}

fn default_project_version() -> Version {
    Version::new(1, 0, 0)
}

impl PackageSpec {
    /// Create a spec for the project at `project_path`
    pub fn new(unique_name: impl Into<String>, project_path: impl Into<PathBuf>) -> Self {
        let unique_name = unique_name.into();
        Self {
            name: unique_name.clone(),
            version: default_project_version(),
            restore: ProjectRestoreMetadata {
                project_name: unique_name.clone(),
                project_unique_name: unique_name,
                project_path: project_path.into(),
                ..Default::default()
            },
            dependencies: IndexMap::new(),
            frameworks: IndexMap::new(),
        }
    }

    pub fn with_style(mut self, style: ProjectStyle) -> Self {
        self.restore.project_style = style;
        self
    }

    /// Declare a target framework
    pub fn add_framework(&mut self, framework: impl Into<TargetFramework>) -> &mut Self {
        let framework = framework.into();
        self.frameworks.entry(framework.clone()).or_default();
        self.restore.frameworks.entry(framework).or_default();
        self
    }

    /// Add a package dependency to one framework, declaring the framework if needed
    pub fn add_package_dependency(
        &mut self,
        framework: impl Into<TargetFramework>,
        id: impl Into<String>,
        range: VersionRange,
    ) -> &mut Self {
        self.add_dependency(framework, id, LibraryDependency::new(range))
    }

    pub fn add_dependency(
        &mut self,
        framework: impl Into<TargetFramework>,
        id: impl Into<String>,
        dependency: LibraryDependency,
    ) -> &mut Self {
        let framework = framework.into();
        self.add_framework(framework.clone());
        self.frameworks
            .entry(framework)
            .or_default()
            .dependencies
            .insert(id.into(), dependency);
        self
    }

    /// Add a project reference to one framework, declaring the framework if needed
    pub fn add_project_reference(
        &mut self,
        framework: impl Into<TargetFramework>,
        unique_name: impl Into<String>,
        reference: ProjectReference,
    ) -> &mut Self {
        let framework = framework.into();
        self.add_framework(framework.clone());
        self.restore
            .frameworks
            .entry(framework)
            .or_default()
            .project_references
            .insert(unique_name.into(), reference);
        self
    }

    pub fn unique_name(&self) -> &str {
        &self.restore.project_unique_name
    }

    pub fn project_path(&self) -> &Path {
        &self.restore.project_path
    }

    pub fn style(&self) -> ProjectStyle {
        self.restore.project_style
    }

    /// Declared frameworks in declaration order
    pub fn target_frameworks(&self) -> Vec<TargetFramework> {
        let mut frameworks: Vec<TargetFramework> = self.frameworks.keys().cloned().collect();
        for framework in self.restore.frameworks.keys() {
            if !frameworks.contains(framework) {
                frameworks.push(framework.clone());
            }
        }
        frameworks
    }

    /// Effective package dependencies for one framework
    ///
    /// Shared dependencies come first; a framework-specific entry with the
    /// same id (case-insensitive) replaces the shared one in place.
    pub fn dependencies_for(&self, framework: &TargetFramework) -> Vec<(&str, &LibraryDependency)> {
        let mut merged: IndexMap<String, (&str, &LibraryDependency)> = IndexMap::new();
        let specific = self
            .frameworks
            .get(framework)
            .into_iter()
            .flat_map(|info| info.dependencies.iter());

        for (id, dependency) in self.dependencies.iter().chain(specific) {
            merged.insert(id.to_ascii_lowercase(), (id.as_str(), dependency));
        }

        merged.into_values().collect()
    }

    /// Direct project references for one framework
    pub fn project_references_for(&self, framework: &TargetFramework) -> Vec<(&str, &ProjectReference)> {
        self.restore
            .frameworks
            .get(framework)
            .map(|info| {
                info.project_references
                    .iter()
                    .map(|(name, reference)| (name.as_str(), reference))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of all directly referenced projects across frameworks,
    /// deduplicated case-insensitively in first-seen order
    pub fn project_reference_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.restore
            .frameworks
            .values()
            .flat_map(|info| info.project_references.keys())
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .cloned()
            .collect()
    }

    /// Copy of this spec with its source list replaced
    pub fn with_sources(&self, sources: Vec<PackageSourceRef>) -> PackageSpec {
        let mut spec = self.clone();
        spec.restore.sources = sources;
        spec
    }
}
