//! Local folder feed

use super::PackageSource;
use crate::api::{PackageIndexDocument, PackageVersionInfo};
use crate::RegistryResult;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stow_core::error::StowError;
use stow_core::{TargetFramework, VersionRange};
use tracing::{debug, trace};

/// Source backed by a folder holding one `<lowercase-id>.json` per package
#[derive(Debug, Clone)]
pub struct FeedSource {
    name: String,
    root: PathBuf,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read one package document; `None` when the package is not in this feed
    async fn load_document(&self, id: &str) -> RegistryResult<Option<PackageIndexDocument>> {
        let path = self.root.join(format!("{}.json", id.to_ascii_lowercase()));

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(source = %self.name, package = id, "package not in feed");
                return Ok(None);
            },
            Err(e) => {
                return Err(StowError::source_unavailable(
                    self.name.clone(),
                    format!("failed to read {}", path.display()),
                    e,
                ))
            },
        };

        let document = serde_json::from_slice(&bytes).map_err(|e| {
            StowError::source_unavailable(self.name.clone(), format!("malformed package document {}", path.display()), e)
        })?;
        Ok(Some(document))
    }
}

#[async_trait]
impl PackageSource for FeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_dependencies(
        &self,
        id: &str,
        range: &VersionRange,
        framework: &TargetFramework,
    ) -> RegistryResult<Vec<PackageVersionInfo>> {
        let Some(document) = self.load_document(id).await? else {
            return Ok(Vec::new());
        };

        let mut versions: Vec<PackageVersionInfo> = document
            .versions
            .iter()
            .filter(|entry| range.satisfies(&entry.version))
            .map(|entry| entry.to_info(framework))
            .collect();
        versions.sort_by(|a, b| a.version.cmp(&b.version));

        debug!(source = %self.name, package = id, range = %range, matches = versions.len(), "queried feed");
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_core::ErrorCategory;

    fn write_feed(dir: &Path) {
        std::fs::write(
            dir.join("foo.json"),
            r#"{
                "id": "Foo",
                "versions": [
                    { "version": "1.3.0" },
                    { "version": "1.0.0" },
                    { "version": "1.2.0", "dependencyGroups": [
                        { "dependencies": [ { "id": "Bar", "range": "[2.0.0, )" } ] }
                    ] },
                    { "version": "2.0.0-beta" }
                ]
            }"#,
        )
        .unwrap();
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
    }

    #[tokio::test]
    async fn test_query_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        let feed = FeedSource::new("local", dir.path());
        let net8 = TargetFramework::new("net8.0");

        let range = VersionRange::parse("[1.2.0, )").unwrap();
        let versions = feed.query_dependencies("FOO", &range, &net8).await.unwrap();
        let found: Vec<String> = versions.iter().map(|v| v.version.to_string()).collect();
        assert_eq!(found, vec!["1.2.0", "1.3.0", "2.0.0-beta"]);
        assert_eq!(versions[0].dependencies[0].id, "Bar");
    }

    #[tokio::test]
    async fn test_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        let feed = FeedSource::new("local", dir.path());
        let net8 = TargetFramework::new("net8.0");

        let stable = feed.get_latest_version("foo", &net8, false).await.unwrap();
        assert_eq!(stable.unwrap().to_string(), "1.3.0");

        let any = feed.get_latest_version("foo", &net8, true).await.unwrap();
        assert_eq!(any.unwrap().to_string(), "2.0.0-beta");
    }

    #[tokio::test]
    async fn test_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        let feed = FeedSource::new("local", dir.path());
        let net8 = TargetFramework::new("net8.0");

        let missing = feed.query_dependencies("nope", &VersionRange::all(), &net8).await.unwrap();
        assert!(missing.is_empty());

        let err = feed
            .query_dependencies("broken", &VersionRange::all(), &net8)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Infrastructure);
    }
}
