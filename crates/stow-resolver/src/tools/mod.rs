//! Tool restore deduplication
//!
//! Several roots may each declare the same global tool. Those pseudo-projects
//! produce requests with identical effective inputs; only the first of each
//! equivalence class is walked and the others reuse its result.

use crate::request::RestoreSummaryRequest;
use std::collections::HashMap;
use tracing::debug;

/// Equivalence key of a tool request: every (framework, package, range)
/// it declares plus its effective sources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolRequestKey {
    packages: Vec<(String, String, String)>,
    sources: Vec<String>,
}

impl ToolRequestKey {
    /// Key of a tool-style request; `None` for every other project style
    pub fn of(summary: &RestoreSummaryRequest) -> Option<Self> {
        let request = &summary.request;
        if !request.project_style.is_tool() {
            return None;
        }

        let mut packages: Vec<(String, String, String)> = request
            .project
            .target_frameworks()
            .iter()
            .flat_map(|framework| {
                request
                    .project
                    .dependencies_for(framework)
                    .into_iter()
                    .map(move |(id, dependency)| {
                        (
                            framework.to_string(),
                            id.to_ascii_lowercase(),
                            dependency.range.to_string(),
                        )
                    })
            })
            .collect();
        packages.sort();

        Some(Self {
            packages,
            sources: request.sources.iter().map(|source| source.normalized_location()).collect(),
        })
    }
}

/// Requests left after deduplication
#[derive(Debug, Default)]
pub struct ToolDedup {
    /// Requests to restore, in input order
    pub unique: Vec<RestoreSummaryRequest>,
    /// `(duplicate project, representative project)` pairs
    pub duplicates: Vec<(String, String)>,
}

/// Drop tool requests equivalent to an earlier one
///
/// Non-tool requests always survive. The first request of each class is its
/// representative, so the result only depends on input order.
pub fn dedup_tool_requests(requests: Vec<RestoreSummaryRequest>) -> ToolDedup {
    let mut representatives: HashMap<ToolRequestKey, String> = HashMap::new();
    let mut result = ToolDedup::default();

    for summary in requests {
        let Some(key) = ToolRequestKey::of(&summary) else {
            result.unique.push(summary);
            continue;
        };

        match representatives.get(&key) {
            Some(representative) => {
                debug!(
                    tool = summary.project_name(),
                    representative = representative.as_str(),
                    "reusing equivalent tool restore"
                );
                result
                    .duplicates
                    .push((summary.project_name().to_string(), representative.clone()));
            },
            None => {
                representatives.insert(key, summary.project_name().to_string());
                result.unique.push(summary);
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraphSpec;
    use crate::request::RestoreRequestBuilder;
    use std::sync::Arc;
    use stow_config::RestoreArgs;
    use stow_core::{PackageSourceRef, PackageSpec, ProjectStyle, VersionRange};
    use stow_registry::{FeedSourceFactory, ProviderCache};

    fn tool(name: &str, version: &str) -> PackageSpec {
        let mut spec = PackageSpec::new(name, format!("/tools/{name}.json")).with_style(ProjectStyle::DotnetCliTool);
        spec.add_package_dependency("net8.0", "dotnet-format", VersionRange::parse(version).unwrap());
        spec
    }

    fn requests(specs: Vec<PackageSpec>) -> Vec<RestoreSummaryRequest> {
        let args = RestoreArgs {
            sources: vec![PackageSourceRef::from_location("/feeds/tools")],
            ..Default::default()
        };
        let cache = ProviderCache::new(Arc::new(FeedSourceFactory));
        let builder = RestoreRequestBuilder::new(&args, &cache);

        let mut graph = DependencyGraphSpec::new();
        for spec in specs {
            let name = spec.unique_name().to_string();
            graph.add_project(spec).unwrap();
            graph.add_restore(name);
        }

        graph
            .restore_roots()
            .iter()
            .map(|root| builder.build_for_root(&graph, root).unwrap())
            .collect()
    }

    fn names(requests: &[RestoreSummaryRequest]) -> Vec<&str> {
        requests.iter().map(|summary| summary.project_name()).collect()
    }

    #[test]
    fn test_duplicates_collapse_to_first() {
        let result = dedup_tool_requests(requests(vec![
            tool("ToolA", "[3.0.0]"),
            tool("ToolB", "[3.0.0]"),
            tool("ToolC", "[3.0.0]"),
        ]));

        assert_eq!(names(&result.unique), vec!["ToolA"]);
        assert_eq!(
            result.duplicates,
            vec![
                ("ToolB".to_string(), "ToolA".to_string()),
                ("ToolC".to_string(), "ToolA".to_string()),
            ]
        );
    }

    #[test]
    fn test_different_versions_survive() {
        let result = dedup_tool_requests(requests(vec![tool("ToolA", "[3.0.0]"), tool("ToolB", "[4.0.0]")]));
        assert_eq!(names(&result.unique), vec!["ToolA", "ToolB"]);
        assert!(result.duplicates.is_empty());
    }

    #[test]
    fn test_regular_projects_are_never_deduplicated() {
        let mut a = PackageSpec::new("AppA", "/src/AppA/AppA.csproj");
        a.add_package_dependency("net8.0", "Foo", VersionRange::parse("[1.0.0]").unwrap());
        let mut b = PackageSpec::new("AppB", "/src/AppB/AppB.csproj");
        b.add_package_dependency("net8.0", "Foo", VersionRange::parse("[1.0.0]").unwrap());

        let result = dedup_tool_requests(requests(vec![a, b]));
        assert_eq!(names(&result.unique), vec!["AppA", "AppB"]);
    }
}
