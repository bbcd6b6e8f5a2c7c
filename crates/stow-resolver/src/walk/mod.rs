//! Graph walker: version selection for one restore request
//!
//! Every target framework of the root project is resolved independently and
//! concurrently. A framework walk has two phases:
//!
//! 1. Project expansion: a depth-first worklist over project references
//!    collects the package requirements of the root and of every project it
//!    consumes. Project edges carry no version range.
//! 2. Package resolution: a bounded fixpoint over a requirement table. Each
//!    round intersects every range requested for a package, selects the best
//!    available version inside the intersection, and re-derives the table
//!    from the dependencies of the selected versions. A dependency that
//!    leads back to an ancestor on the current path is a cycle: it is
//!    reported and adds no requirement. The walk stops when a round changes
//!    nothing, or after `max_iterations` rounds.
//!
//! Packages that cannot be resolved are marked failed and their dependencies
//! are not expanded; the rest of the graph still resolves so one failure
//! reports as much context as possible.

use crate::diagnostics::{Diagnostic, DiagnosticCode, RequestedRange, ResolutionConflict};
use crate::graph::format_cycle;
use crate::request::RestoreRequest;
use crate::semver::{allows_prerelease, intersect_all, VersionSelector};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use stow_core::{PackageSpec, ProjectReference, TargetFramework, Version, VersionRange};
use stow_registry::{PackageDependency, PackageVersionInfo};
use tracing::{debug, trace, warn};

/// Upper bound on fixpoint rounds per framework
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Walk state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Unvisited,
    /// On the active path
    Resolving,
    Resolved,
    Failed,
}

/// A package version chosen for one framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// Id as first requested
    pub id: String,
    pub version: Version,
    pub dependencies: Vec<PackageDependency>,
    pub include_assets: Option<String>,
    pub exclude_assets: Option<String>,
}

/// A referenced project consumed by one framework of the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProject {
    pub unique_name: String,
    pub project_path: PathBuf,
    pub version: Version,
    /// Framework of the referenced project that is consumed
    pub framework: TargetFramework,
    /// Direct package dependencies of the referenced project
    pub dependencies: Vec<(String, VersionRange)>,
    pub project_references: Vec<String>,
}

/// Resolution of one target framework of the root project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkResolution {
    pub framework: TargetFramework,
    /// Lowercased id → selected package
    pub packages: BTreeMap<String, ResolvedPackage>,
    /// Lowercased unique name → consumed project
    pub projects: BTreeMap<String, ResolvedProject>,
    /// Lowercased ids of packages that could not be resolved
    pub failed: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub iterations: usize,
}

impl FrameworkResolution {
    pub fn state_of(&self, id: &str) -> NodeState {
        let key = id.to_ascii_lowercase();
        if self.packages.contains_key(&key) {
            NodeState::Resolved
        } else if self.failed.contains(&key) {
            NodeState::Failed
        } else {
            NodeState::Unvisited
        }
    }

    pub fn resolved_version(&self, id: &str) -> Option<&Version> {
        self.packages.get(&id.to_ascii_lowercase()).map(|package| &package.version)
    }
}

/// Resolution of every framework of one root project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkResult {
    pub project: String,
    /// In the root's framework declaration order
    pub frameworks: Vec<FrameworkResolution>,
}

impl WalkResult {
    /// No error diagnostics in any framework
    pub fn success(&self) -> bool {
        self.diagnostics().all(|diagnostic| !diagnostic.is_error())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.frameworks.iter().flat_map(|framework| framework.diagnostics.iter())
    }

    pub fn framework(&self, framework: &TargetFramework) -> Option<&FrameworkResolution> {
        self.frameworks.iter().find(|resolution| &resolution.framework == framework)
    }

    pub fn resolved_version(&self, framework: &TargetFramework, id: &str) -> Option<&Version> {
        self.framework(framework)?.resolved_version(id)
    }
}

/// A package requirement declared by a project
#[derive(Debug, Clone)]
struct DirectRequirement {
    id: String,
    range: VersionRange,
    requested_by: String,
    include_assets: Option<String>,
    exclude_assets: Option<String>,
}

/// Output of project expansion
#[derive(Debug, Default)]
struct ProjectExpansion {
    requirements: Vec<DirectRequirement>,
    projects: BTreeMap<String, ResolvedProject>,
    /// Lowercased names of every project reached, root included
    names: HashSet<String>,
}

/// Every range requested for one package, keyed by lowercased id
type RequirementTable = BTreeMap<String, (String, Vec<RequestedRange>)>;

enum Frame<'s> {
    Enter {
        spec: &'s PackageSpec,
        framework: TargetFramework,
    },
    Exit(String),
}

/// Walks the package graph of one restore request
#[derive(Debug)]
pub struct GraphWalker<'a> {
    request: &'a RestoreRequest,
    max_iterations: usize,
}

impl<'a> GraphWalker<'a> {
    pub fn new(request: &'a RestoreRequest) -> Self {
        Self {
            request,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Resolve every framework of the root project
    pub async fn walk(&self) -> WalkResult {
        let frameworks = self.request.project.target_frameworks();
        let resolutions = join_all(frameworks.iter().map(|framework| self.walk_framework(framework))).await;

        WalkResult {
            project: self.request.project_name().to_string(),
            frameworks: resolutions,
        }
    }

    async fn walk_framework(&self, framework: &TargetFramework) -> FrameworkResolution {
        let project = self.request.project_name();
        let mut diagnostics = Vec::new();

        let expansion = self.expand_projects(framework, &mut diagnostics);
        debug!(
            project,
            framework = %framework,
            requirements = expansion.requirements.len(),
            projects = expansion.projects.len(),
            "expanded project references"
        );

        let mut catalog: HashMap<String, Vec<PackageVersionInfo>> = HashMap::new();
        let mut query_failures: HashMap<String, String> = HashMap::new();
        let mut selections: BTreeMap<String, Version> = BTreeMap::new();
        let mut failures: BTreeMap<String, Diagnostic> = BTreeMap::new();
        let mut table = RequirementTable::new();
        let mut cycles = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let graph = requirement_table(&expansion, &selections, &catalog);
            table = graph.table;
            cycles = graph.cycles;

            let missing: Vec<String> = table
                .keys()
                .filter(|key| !catalog.contains_key(*key) && !query_failures.contains_key(*key))
                .cloned()
                .collect();
            self.fetch(&missing, framework, &mut catalog, &mut query_failures).await;

            let mut next_selections = BTreeMap::new();
            let mut next_failures = BTreeMap::new();
            for (key, (id, requested)) in &table {
                let outcome = if let Some(message) = query_failures.get(key) {
                    Err(Diagnostic::error(
                        DiagnosticCode::SourceFailure,
                        project,
                        format!("Failed to query package '{}': {}", id, message),
                    )
                    .with_package(id.clone()))
                } else {
                    let available = catalog.get(key).map(Vec::as_slice).unwrap_or_default();
                    self.select(id, requested, available)
                };

                match outcome {
                    Ok(version) => {
                        next_selections.insert(key.clone(), version);
                    },
                    Err(diagnostic) => {
                        next_failures.insert(key.clone(), diagnostic.with_framework(framework));
                    },
                }
            }

            let stable = next_selections == selections
                && next_failures.keys().eq(failures.keys());
            selections = next_selections;
            failures = next_failures;
            trace!(project, framework = %framework, iterations, selected = selections.len(), "resolution round");

            if stable {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(project, framework = %framework, iterations, "resolution did not converge");
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::ResolutionDidNotConverge,
                    project,
                    format!("Package versions were still changing after {} rounds", iterations),
                )
                .with_framework(framework),
            );
        }

        for (key, diagnostic) in failures.iter_mut() {
            if let Some(conflict) = diagnostic.conflict.as_mut() {
                let include_prerelease = allows_prerelease(conflict.requested.iter().map(|request| &request.range));
                conflict.latest = self
                    .request
                    .providers
                    .get_latest_version(&conflict.package_id, framework, include_prerelease)
                    .await
                    .ok()
                    .flatten();
            }
            debug!(project, framework = %framework, package = key.as_str(), "package could not be resolved");
        }

        let packages = self.resolved_packages(&expansion, &table, &selections, &catalog);
        let failed: BTreeSet<String> = failures.keys().cloned().collect();
        diagnostics.extend(failures.into_values());
        diagnostics.extend(cycle_diagnostics(project, framework, &cycles));

        debug!(
            project,
            framework = %framework,
            packages = packages.len(),
            failed = failed.len(),
            iterations,
            "framework resolved"
        );

        FrameworkResolution {
            framework: framework.clone(),
            packages,
            projects: expansion.projects,
            failed,
            diagnostics,
            iterations,
        }
    }

    /// Depth-first expansion of project references starting at the root
    fn expand_projects(&self, framework: &TargetFramework, diagnostics: &mut Vec<Diagnostic>) -> ProjectExpansion {
        let root = self.request.project.as_ref();
        let graph = &self.request.dependency_graph;
        let root_key = root.unique_name().to_ascii_lowercase();

        let mut expansion = ProjectExpansion::default();
        let mut states: HashMap<String, NodeState> = HashMap::new();
        let mut path: Vec<String> = Vec::new();
        let mut stack = vec![Frame::Enter {
            spec: root,
            framework: framework.clone(),
        }];

        while let Some(frame) = stack.pop() {
            let (spec, consumed) = match frame {
                Frame::Exit(key) => {
                    path.pop();
                    states.insert(key, NodeState::Resolved);
                    continue;
                },
                Frame::Enter { spec, framework } => (spec, framework),
            };

            let key = spec.unique_name().to_ascii_lowercase();
            match states.get(&key).copied().unwrap_or(NodeState::Unvisited) {
                NodeState::Resolving => {
                    let start = path
                        .iter()
                        .position(|name| name.eq_ignore_ascii_case(spec.unique_name()))
                        .unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].iter().map(String::as_str).collect();
                    cycle.push(spec.unique_name());
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::Cycle,
                            self.request.project_name(),
                            format!("Cycle detected: {}", format_cycle(&cycle)),
                        )
                        .with_framework(framework),
                    );
                    continue;
                },
                NodeState::Unvisited => {},
                NodeState::Resolved | NodeState::Failed => {
                    if let Some(previous) = expansion.projects.get(&key).filter(|previous| previous.framework != consumed) {
                        debug!(
                            project = spec.unique_name(),
                            consumed = %previous.framework,
                            requested = %consumed,
                            "project already consumed with another framework"
                        );
                        diagnostics.push(
                            Diagnostic::warning(
                                DiagnosticCode::FrameworkMismatch,
                                self.request.project_name(),
                                format!(
                                    "Project '{}' is consumed as '{}' and as '{}'; '{}' is used",
                                    spec.unique_name(),
                                    previous.framework,
                                    consumed,
                                    previous.framework
                                ),
                            )
                            .with_framework(framework),
                        );
                    }
                    continue;
                },
            }

            let is_root = key == root_key;
            states.insert(key.clone(), NodeState::Resolving);
            path.push(spec.unique_name().to_string());
            expansion.names.insert(key.clone());
            stack.push(Frame::Exit(key.clone()));

            let mut dependencies = Vec::new();
            for (id, dependency) in spec.dependencies_for(&consumed) {
                dependencies.push((id.to_string(), dependency.range.clone()));
                if !is_root && dependency.is_private() {
                    continue;
                }
                expansion.requirements.push(DirectRequirement {
                    id: id.to_string(),
                    range: dependency.range.clone(),
                    requested_by: spec.unique_name().to_string(),
                    include_assets: dependency.include_assets.clone().filter(|_| is_root),
                    exclude_assets: dependency.exclude_assets.clone().filter(|_| is_root),
                });
            }

            let references = spec.project_references_for(&consumed);
            if !is_root {
                expansion.projects.insert(
                    key,
                    ResolvedProject {
                        unique_name: spec.unique_name().to_string(),
                        project_path: spec.project_path().to_path_buf(),
                        version: spec.version.clone(),
                        framework: consumed.clone(),
                        dependencies,
                        project_references: references.iter().map(|(name, _)| name.to_string()).collect(),
                    },
                );
            }

            for (name, reference) in references.into_iter().rev() {
                let Some(child) = graph.get_project(name) else {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::MissingProject,
                            self.request.project_name(),
                            format!("Project '{}' references '{}', which is not part of the restore", spec.unique_name(), name),
                        )
                        .with_framework(framework),
                    );
                    continue;
                };

                match consumed_framework(child, reference, &consumed) {
                    Some(child_framework) => stack.push(Frame::Enter {
                        spec: child,
                        framework: child_framework,
                    }),
                    None => diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::FrameworkMismatch,
                            self.request.project_name(),
                            format!(
                                "Project '{}' has no framework compatible with '{}' as used by '{}'",
                                child.unique_name(),
                                consumed,
                                spec.unique_name()
                            ),
                        )
                        .with_framework(framework),
                    ),
                }
            }
        }

        expansion
    }

    /// Query every package in `ids` concurrently
    async fn fetch(
        &self,
        ids: &[String],
        framework: &TargetFramework,
        catalog: &mut HashMap<String, Vec<PackageVersionInfo>>,
        failures: &mut HashMap<String, String>,
    ) {
        if ids.is_empty() {
            return;
        }

        let all = VersionRange::all();
        let providers = &self.request.providers;
        let results = join_all(ids.iter().map(|id| providers.query(id, &all, framework))).await;

        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(versions) => {
                    catalog.insert(id.clone(), versions);
                },
                Err(e) => {
                    warn!(package = id.as_str(), framework = %framework, error = %e, "package query failed");
                    failures.insert(id.clone(), e.to_string());
                },
            }
        }
    }

    /// Pick the version of one package, or explain why there is none
    fn select(
        &self,
        id: &str,
        requested: &[RequestedRange],
        available: &[PackageVersionInfo],
    ) -> Result<Version, Diagnostic> {
        let project = self.request.project_name();

        if available.is_empty() {
            let sources: Vec<&str> = self.request.sources.iter().map(|source| source.name.as_str()).collect();
            return Err(Diagnostic::error(
                DiagnosticCode::PackageNotFound,
                project,
                format!(
                    "Unable to find package '{}'. No packages exist with this id in source(s): {}",
                    id,
                    sources.join(", ")
                ),
            )
            .with_package(id));
        }

        let conflict = || ResolutionConflict {
            package_id: id.to_string(),
            requested: requested.to_vec(),
            available: available.iter().map(|info| info.version.clone()).collect(),
            latest: None,
        };

        let ranges: Vec<VersionRange> = requested.iter().map(|request| request.range.clone()).collect();
        let Some(merged) = intersect_all(&ranges) else {
            let conflict = conflict();
            let message = format!(
                "Version conflict for '{}': {} have no version in common",
                id,
                conflict.describe_requests()
            );
            return Err(Diagnostic::error(DiagnosticCode::Conflict, project, message).with_conflict(conflict));
        };

        let selector = VersionSelector::new(available.iter().map(|info| info.version.clone()));
        match selector.select_preferred(&[merged.clone()], allows_prerelease(&ranges)) {
            Some(version) => Ok(version),
            None => {
                let conflict = conflict();
                let message = format!(
                    "Unable to find a version of '{}' in {} as requested by {}",
                    id,
                    merged,
                    conflict.describe_requests()
                );
                Err(Diagnostic::error(DiagnosticCode::Conflict, project, message).with_conflict(conflict))
            },
        }
    }

    fn resolved_packages(
        &self,
        expansion: &ProjectExpansion,
        table: &RequirementTable,
        selections: &BTreeMap<String, Version>,
        catalog: &HashMap<String, Vec<PackageVersionInfo>>,
    ) -> BTreeMap<String, ResolvedPackage> {
        let root = self.request.project_name();
        let mut packages = BTreeMap::new();

        for (key, version) in selections {
            let id = table.get(key).map(|(id, _)| id.clone()).unwrap_or_else(|| key.clone());
            let dependencies = catalog
                .get(key)
                .and_then(|versions| versions.iter().find(|info| &info.version == version))
                .map(|info| info.dependencies.clone())
                .unwrap_or_default();
            let direct = expansion
                .requirements
                .iter()
                .find(|requirement| requirement.requested_by == root && requirement.id.eq_ignore_ascii_case(key));

            packages.insert(
                key.clone(),
                ResolvedPackage {
                    id,
                    version: version.clone(),
                    dependencies,
                    include_assets: direct.and_then(|requirement| requirement.include_assets.clone()),
                    exclude_assets: direct.and_then(|requirement| requirement.exclude_assets.clone()),
                },
            );
        }

        packages
    }
}

/// Framework of `child` consumed through `reference` by a parent built for `parent`
///
/// An explicit override wins, then the same framework, then the child's only
/// framework. A child declaring no frameworks contributes nothing and
/// accepts any.
fn consumed_framework(
    child: &PackageSpec,
    reference: &ProjectReference,
    parent: &TargetFramework,
) -> Option<TargetFramework> {
    let declared = child.target_frameworks();

    if let Some(requested) = &reference.target_framework {
        return declared.contains(requested).then(|| requested.clone());
    }
    if declared.is_empty() || declared.contains(parent) {
        return Some(parent.clone());
    }
    match declared.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// Requirement table of one round plus the dependency edges left out of it
struct RequirementGraph {
    table: RequirementTable,
    /// Display ids along each edge that returned to an ancestor, the
    /// ancestor repeated at the end
    cycles: Vec<Vec<String>>,
}

/// Rebuild the requirement table from the projects' requirements plus the
/// dependencies of every reachable selected package
///
/// Selected packages are expanded depth-first. A dependency on a package
/// that is still on the active path is a cycle: it adds no requirement and
/// is not descended into. Packages not yet selected, or failed, are not
/// expanded. Dependencies on a project of the closure are satisfied by that
/// project.
fn requirement_table(
    expansion: &ProjectExpansion,
    selections: &BTreeMap<String, Version>,
    catalog: &HashMap<String, Vec<PackageVersionInfo>>,
) -> RequirementGraph {
    enum Step {
        Enter(String),
        Exit,
    }

    let mut table = RequirementTable::new();
    for requirement in &expansion.requirements {
        let key = requirement.id.to_ascii_lowercase();
        if expansion.names.contains(&key) {
            continue;
        }
        table
            .entry(key)
            .or_insert_with(|| (requirement.id.clone(), Vec::new()))
            .1
            .push(RequestedRange {
                range: requirement.range.clone(),
                requested_by: requirement.requested_by.clone(),
            });
    }

    let mut states: HashMap<String, NodeState> = HashMap::new();
    let mut path: Vec<String> = Vec::new();
    let mut cycles = Vec::new();
    let roots: Vec<String> = table.keys().cloned().collect();

    for root in roots {
        let mut stack = vec![Step::Enter(root)];

        while let Some(step) = stack.pop() {
            let key = match step {
                Step::Exit => {
                    if let Some(key) = path.pop() {
                        states.insert(key, NodeState::Resolved);
                    }
                    continue;
                },
                Step::Enter(key) => key,
            };
            if states.contains_key(&key) {
                continue;
            }

            states.insert(key.clone(), NodeState::Resolving);
            path.push(key.clone());
            stack.push(Step::Exit);

            let Some(version) = selections.get(&key) else {
                continue;
            };
            let Some(info) = catalog
                .get(&key)
                .and_then(|versions| versions.iter().find(|info| &info.version == version))
            else {
                continue;
            };

            let requested_by = format!("{}/{}", display_id(&table, &key), version.to_normalized_string());

            for dependency in info.dependencies.iter().rev() {
                let dependency_key = dependency.id.to_ascii_lowercase();
                if expansion.names.contains(&dependency_key) {
                    continue;
                }

                if states.get(&dependency_key) == Some(&NodeState::Resolving) {
                    let from = path.iter().position(|entry| *entry == dependency_key).unwrap_or(0);
                    let mut cycle: Vec<String> = path[from..].iter().map(|entry| display_id(&table, entry)).collect();
                    cycle.push(display_id(&table, &dependency_key));
                    trace!(cycle = ?cycle, "dependency returns to an ancestor");
                    cycles.push(cycle);
                    continue;
                }

                table
                    .entry(dependency_key.clone())
                    .or_insert_with(|| (dependency.id.clone(), Vec::new()))
                    .1
                    .push(RequestedRange {
                        range: dependency.range.clone(),
                        requested_by: requested_by.clone(),
                    });
                stack.push(Step::Enter(dependency_key));
            }
        }
    }

    RequirementGraph { table, cycles }
}

fn display_id(table: &RequirementTable, key: &str) -> String {
    table.get(key).map(|(id, _)| id.clone()).unwrap_or_else(|| key.to_string())
}

/// One warning per distinct cycle found in the final round
fn cycle_diagnostics(project: &str, framework: &TargetFramework, cycles: &[Vec<String>]) -> Vec<Diagnostic> {
    let mut reported = BTreeSet::new();
    let mut diagnostics = Vec::new();

    for cycle in cycles {
        let names: Vec<&str> = cycle.iter().map(String::as_str).collect();
        let description = format_cycle(&names);
        if !reported.insert(description.clone()) {
            continue;
        }
        diagnostics.push(
            Diagnostic::warning(DiagnosticCode::Cycle, project, format!("Cycle detected: {}", description))
                .with_framework(framework)
                .with_package(cycle.last().cloned().unwrap_or_default()),
        );
    }

    diagnostics
}
