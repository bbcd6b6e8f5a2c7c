//! Lock file document model
//!
//! All maps are `BTreeMap`s so the serialized form only depends on content,
//! never on resolution order.

use crate::LockfileResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stow_core::error::StowError;
use stow_core::{ProjectStyle, Version};

/// Current lock file format version
pub const LOCK_FILE_VERSION: u32 = 1;

/// Key of a library in `targets` and `libraries`: `Id/Version`
pub fn library_key(id: &str, version: &Version) -> String {
    format!("{}/{}", id, version.to_normalized_string())
}

/// Resolution result of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    pub version: u32,
    pub project: LockedProject,
    /// Fingerprint of the restore inputs
    pub fingerprint: String,
    /// Framework → `Id/Version` → resolved library
    #[serde(default)]
    pub targets: BTreeMap<String, BTreeMap<String, LockedLibrary>>,
    /// Content locations of every library in any target
    #[serde(default)]
    pub libraries: BTreeMap<String, LibraryEntry>,
    #[serde(default)]
    pub package_folders: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<LockedDiagnostic>,
}

/// Identity of the restored project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedProject {
    pub name: String,
    pub path: PathBuf,
    pub style: ProjectStyle,
}

/// Package or project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Package,
    Project,
}

/// A library resolved for one framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedLibrary {
    #[serde(rename = "type")]
    pub kind: LibraryKind,
    /// Dependency id → requested range
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Framework consumed from a referenced project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_assets: Option<String>,
}

/// Where the build host finds a library's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    #[serde(rename = "type")]
    pub kind: LibraryKind,
    /// Package folder relative path, or the project file for projects
    pub path: String,
}

/// Diagnostic recorded by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedDiagnostic {
    pub code: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    pub message: String,
}

impl LockFile {
    pub fn new(project: LockedProject, fingerprint: impl Into<String>) -> Self {
        Self {
            version: LOCK_FILE_VERSION,
            project,
            fingerprint: fingerprint.into(),
            targets: BTreeMap::new(),
            libraries: BTreeMap::new(),
            package_folders: Vec::new(),
            sources: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record a resolved library for one framework
    pub fn add_library(&mut self, framework: &str, key: String, library: LockedLibrary, entry: LibraryEntry) {
        self.targets
            .entry(framework.to_string())
            .or_default()
            .insert(key.clone(), library);
        self.libraries.entry(key).or_insert(entry);
    }

    /// Resolved version of a package in one framework
    pub fn resolved_version(&self, framework: &str, id: &str) -> Option<Version> {
        self.targets.get(framework)?.iter().find_map(|(key, library)| {
            let (key_id, version) = key.rsplit_once('/')?;
            if library.kind == LibraryKind::Package && key_id.eq_ignore_ascii_case(id) {
                version.parse().ok()
            } else {
                None
            }
        })
    }

    /// Check if any diagnostic is an error
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == "error")
    }

    /// Structural self-check used before trusting a lock file for a no-op
    ///
    /// Every target entry must have a `libraries` record of the same kind and
    /// a well-formed `Id/Version` key.
    pub fn is_consistent(&self) -> bool {
        self.version == LOCK_FILE_VERSION
            && self.targets.values().all(|libraries| {
                libraries.iter().all(|(key, library)| {
                    let well_formed = key
                        .rsplit_once('/')
                        .is_some_and(|(id, version)| !id.is_empty() && version.parse::<Version>().is_ok());
                    well_formed
                        && self
                            .libraries
                            .get(key)
                            .is_some_and(|entry| entry.kind == library.kind)
                })
            })
    }

    /// Deterministic pretty JSON with a trailing newline
    pub fn to_json(&self) -> LockfileResult<String> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| StowError::json("lock file", e))?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> LockfileResult<Self> {
        serde_json::from_str(json).map_err(|e| StowError::json("lock file", e))
    }

    /// Read a lock file from disk
    pub fn load(path: &Path) -> LockfileResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StowError::io(format!("Failed to read lock file {}", path.display()), e))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> LockedProject {
        LockedProject {
            name: "AppA".to_string(),
            path: PathBuf::from("/src/AppA/AppA.csproj"),
            style: ProjectStyle::PackageReference,
        }
    }

    fn package(version: &str) -> (String, LockedLibrary, LibraryEntry) {
        let version: Version = version.parse().unwrap();
        (
            library_key("Foo", &version),
            LockedLibrary {
                kind: LibraryKind::Package,
                dependencies: BTreeMap::new(),
                framework: None,
                include_assets: None,
                exclude_assets: None,
            },
            LibraryEntry {
                kind: LibraryKind::Package,
                path: format!("foo/{}", version),
            },
        )
    }

    #[test]
    fn test_library_key_drops_build_metadata() {
        let version: Version = "1.3.0+sha.1".parse().unwrap();
        assert_eq!(library_key("Foo", &version), "Foo/1.3.0");
    }

    #[test]
    fn test_resolved_version() {
        let mut lock = LockFile::new(project(), "abc");
        let (key, library, entry) = package("1.3.0");
        lock.add_library("net8.0", key, library, entry);

        assert_eq!(lock.resolved_version("net8.0", "foo"), Some(Version::new(1, 3, 0)));
        assert_eq!(lock.resolved_version("net48", "foo"), None);
        assert!(lock.is_consistent());
    }

    #[test]
    fn test_inconsistent_lock() {
        let mut lock = LockFile::new(project(), "abc");
        let (key, library, entry) = package("1.3.0");
        lock.add_library("net8.0", key.clone(), library, entry);
        lock.libraries.remove(&key);
        assert!(!lock.is_consistent());

        let mut lock = LockFile::new(project(), "abc");
        let (_, library, entry) = package("1.3.0");
        lock.add_library("net8.0", "Foo-no-version".to_string(), library, entry);
        assert!(!lock.is_consistent());
    }

    #[test]
    fn test_json_is_deterministic() {
        let mut a = LockFile::new(project(), "abc");
        let mut b = LockFile::new(project(), "abc");
        let (k1, l1, e1) = package("1.0.0");
        let (k2, l2, e2) = package("1.3.0");

        a.add_library("net8.0", k1.clone(), l1.clone(), e1.clone());
        a.add_library("net48", k2.clone(), l2.clone(), e2.clone());
        b.add_library("net48", k2, l2, e2);
        b.add_library("net8.0", k1, l1, e1);

        let json = a.to_json().unwrap();
        assert_eq!(json, b.to_json().unwrap());
        assert!(json.ends_with('\n'));
        assert_eq!(LockFile::from_json(&json).unwrap(), a);
    }

    #[test]
    fn test_has_errors() {
        let mut lock = LockFile::new(project(), "abc");
        assert!(!lock.has_errors());
        lock.diagnostics.push(LockedDiagnostic {
            code: "Conflict".to_string(),
            level: "error".to_string(),
            framework: Some("net8.0".to_string()),
            package_id: Some("Foo".to_string()),
            message: "no version of Foo satisfies every request".to_string(),
        });
        assert!(lock.has_errors());
    }
}
