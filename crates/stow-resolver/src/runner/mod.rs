//! Restore orchestration
//!
//! The runner validates a dependency graph, builds one request per restore
//! root, drops duplicate tool requests and restores the rest concurrently,
//! bounded by `max_parallel` and by the session timeout. Each project either
//! skips its walk through the no-op check or walks its graph and writes a
//! fresh lock file plus no-op cache. A project failure never stops its
//! siblings; it is reported in that project's result.

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::graph::DependencyGraphSpec;
use crate::request::{RestoreRequest, RestoreRequestBuilder, RestoreSummaryRequest};
use crate::tools::{dedup_tool_requests, ToolDedup};
use crate::walk::{GraphWalker, WalkResult};
use crate::ResolverResult;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stow_config::RestoreArgs;
use stow_core::error::StowError;
use stow_core::Version;
use stow_lockfile::{
    library_key, LibraryEntry, LibraryKind, LockFile, LockFileWriter, LockedLibrary, LockedProject, NoOpCache,
    NoOpCheck, NoOpDecision,
};
use stow_registry::ProviderCache;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// What happened to one restore root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Graph walked and lock file written
    Restored,
    /// Inputs unchanged; the existing lock file was kept
    NoOp,
    /// Equivalent to another tool request, whose result is reused
    Reused { representative: String },
    Failed,
}

/// Result of restoring one root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRestoreResult {
    pub project: String,
    pub outcome: RestoreOutcome,
    pub diagnostics: Vec<Diagnostic>,
    /// Lock file on disk after the restore, if any
    pub lock_file_path: Option<PathBuf>,
}

impl ProjectRestoreResult {
    pub fn success(&self) -> bool {
        self.outcome != RestoreOutcome::Failed && !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    fn failed(project: &str, error: &StowError) -> Self {
        let code = match error {
            StowError::SourceUnavailable { .. } => DiagnosticCode::SourceFailure,
            _ => DiagnosticCode::RestoreFailure,
        };
        Self {
            project: project.to_string(),
            outcome: RestoreOutcome::Failed,
            diagnostics: vec![Diagnostic::error(code, project, error.to_string())],
            lock_file_path: None,
        }
    }
}

/// Results of one restore session, in restore-root order
#[derive(Debug, Clone)]
pub struct RestoreBatchResult {
    pub results: Vec<ProjectRestoreResult>,
    pub elapsed: Duration,
}

impl RestoreBatchResult {
    pub fn success(&self) -> bool {
        self.results.iter().all(ProjectRestoreResult::success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProjectRestoreResult> {
        self.results.iter().filter(|result| !result.success())
    }

    pub fn no_op_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome == RestoreOutcome::NoOp)
            .count()
    }

    /// Result of one root, by case-insensitive name
    pub fn get(&self, project: &str) -> Option<&ProjectRestoreResult> {
        self.results
            .iter()
            .find(|result| result.project.eq_ignore_ascii_case(project))
    }
}

/// Restores every root of a dependency graph
#[derive(Debug, Clone)]
pub struct RestoreRunner {
    args: RestoreArgs,
    provider_cache: Arc<ProviderCache>,
}

impl RestoreRunner {
    pub fn new(args: RestoreArgs, provider_cache: Arc<ProviderCache>) -> Self {
        Self { args, provider_cache }
    }

    pub fn args(&self) -> &RestoreArgs {
        &self.args
    }

    pub fn provider_cache(&self) -> &Arc<ProviderCache> {
        &self.provider_cache
    }

    /// Restore every root of `graph`
    ///
    /// Returns `Err` only for problems with the graph itself, for the session
    /// timeout and for internal failures. Resolution problems are reported
    /// per project in the batch result.
    pub async fn run(&self, graph: &DependencyGraphSpec) -> ResolverResult<RestoreBatchResult> {
        let started = Instant::now();

        if let Some(dir) = &self.args.persist_graph_path {
            if let Err(e) = graph.persist_for_diagnostics(dir) {
                warn!(dir = %dir.display(), error = %e, "failed to persist dependency graph");
            }
        }

        graph.validate()?;

        let requests = {
            let runner = self.clone();
            let graph = graph.clone();
            tokio::task::spawn_blocking(move || runner.build_requests(&graph))
                .await
                .map_err(join_error)??
        };
        let ToolDedup { unique, duplicates } = dedup_tool_requests(requests);
        info!(
            roots = graph.restore_roots().len(),
            restoring = unique.len(),
            reused = duplicates.len(),
            max_parallel = self.args.max_parallel,
            "starting restore"
        );

        let restored = self.restore_all(unique).await?;

        let by_name: HashMap<String, ProjectRestoreResult> = restored
            .into_iter()
            .map(|result| (result.project.to_ascii_lowercase(), result))
            .collect();
        let reused: HashMap<String, String> = duplicates
            .into_iter()
            .map(|(duplicate, representative)| (duplicate.to_ascii_lowercase(), representative))
            .collect();

        let mut results = Vec::with_capacity(graph.restore_roots().len());
        for root in graph.restore_roots() {
            let key = root.to_ascii_lowercase();
            if let Some(representative) = reused.get(&key) {
                let shared = by_name.get(&representative.to_ascii_lowercase());
                results.push(ProjectRestoreResult {
                    project: root.clone(),
                    outcome: RestoreOutcome::Reused {
                        representative: representative.clone(),
                    },
                    diagnostics: shared.map(|result| result.diagnostics.clone()).unwrap_or_default(),
                    lock_file_path: shared.and_then(|result| result.lock_file_path.clone()),
                });
            } else if let Some(result) = by_name.get(&key).cloned() {
                results.push(result);
            } else {
                return Err(StowError::invariant(format!("restore root '{}' produced no result", root)));
            }
        }

        // The provider cache outlives the batch
        let evicted = self.provider_cache.evict_stale();

        let batch = RestoreBatchResult {
            results,
            elapsed: started.elapsed(),
        };
        info!(
            projects = batch.results.len(),
            failed = batch.failed().count(),
            no_op = batch.no_op_count(),
            evicted,
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "restore finished"
        );
        Ok(batch)
    }

    /// One request per restore root, built in parallel
    fn build_requests(&self, graph: &DependencyGraphSpec) -> ResolverResult<Vec<RestoreSummaryRequest>> {
        let builder = RestoreRequestBuilder::new(&self.args, &self.provider_cache);
        graph
            .restore_roots()
            .par_iter()
            .map(|root| builder.build_for_root(graph, root))
            .collect()
    }

    async fn restore_all(&self, requests: Vec<RestoreSummaryRequest>) -> ResolverResult<Vec<ProjectRestoreResult>> {
        let semaphore = Arc::new(Semaphore::new(self.args.max_parallel.max(1)));
        let mut tasks = JoinSet::new();

        for summary in requests {
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(StowError::invariant("restore semaphore closed"));
                };
                Ok(restore_project(summary.request).await)
            });
        }

        let collect = async {
            let mut results = Vec::with_capacity(tasks.len());
            while let Some(joined) = tasks.join_next().await {
                results.push(joined.map_err(join_error)??);
            }
            Ok::<_, StowError>(results)
        };

        let outcome = tokio::time::timeout(self.args.timeout, collect).await;
        match outcome {
            Ok(results) => results,
            Err(_) => {
                tasks.abort_all();
                error!(seconds = self.args.timeout.as_secs(), "restore timed out");
                Err(StowError::Timeout {
                    operation: "restore batch".to_string(),
                    seconds: self.args.timeout.as_secs(),
                })
            },
        }
    }
}

fn join_error(e: JoinError) -> StowError {
    StowError::invariant(format!("restore task failed: {}", e))
}

/// Restore one project; every error becomes a failed result
async fn restore_project(request: RestoreRequest) -> ProjectRestoreResult {
    let project = request.project_name().to_string();
    match try_restore_project(request).await {
        Ok(result) => result,
        Err(e) => {
            error!(project = project.as_str(), error = %e, "restore failed");
            ProjectRestoreResult::failed(&project, &e)
        },
    }
}

async fn try_restore_project(mut request: RestoreRequest) -> ResolverResult<ProjectRestoreResult> {
    let project = request.project_name().to_string();
    let fingerprint = request.compute_fingerprint()?;
    request.dg_spec_hash = Some(fingerprint.clone());

    let decision = {
        let fingerprint = fingerprint.clone();
        let cache_path = request.cache_file_path.clone();
        let allow_no_op = request.allow_no_op;
        tokio::task::spawn_blocking(move || NoOpCheck::evaluate(&fingerprint, &cache_path, allow_no_op))
            .await
            .map_err(join_error)?
    };

    match decision {
        NoOpDecision::Skip { lock_file_path } => {
            info!(project = project.as_str(), "inputs unchanged, skipping restore");
            return Ok(ProjectRestoreResult {
                project,
                outcome: RestoreOutcome::NoOp,
                diagnostics: Vec::new(),
                lock_file_path: Some(lock_file_path),
            });
        },
        NoOpDecision::Restore(reason) => {
            debug!(project = project.as_str(), %reason, "restoring");
        },
    }

    let walk = GraphWalker::new(&request).walk().await;
    let success = walk.success();
    for diagnostic in walk.diagnostics() {
        if diagnostic.is_error() {
            warn!(project = project.as_str(), "{}", diagnostic);
        } else {
            debug!(project = project.as_str(), "{}", diagnostic);
        }
    }

    let lock = build_lock_file(&request, &fingerprint, &walk);
    let lock_file_path = request.lock_file_path.clone();
    let cache_path = request.cache_file_path.clone();
    {
        let lock_file_path = lock_file_path.clone();
        tokio::task::spawn_blocking(move || -> ResolverResult<()> {
            let hash = LockFileWriter::write(&lock_file_path, &lock)?;
            NoOpCache::new(fingerprint, success, &lock_file_path, hash).save(&cache_path)
        })
        .await
        .map_err(join_error)??;
    }

    if success {
        info!(project = project.as_str(), lock = %lock_file_path.display(), "restored");
    }

    Ok(ProjectRestoreResult {
        project,
        outcome: if success { RestoreOutcome::Restored } else { RestoreOutcome::Failed },
        diagnostics: walk.diagnostics().cloned().collect(),
        lock_file_path: Some(lock_file_path),
    })
}

/// Lock file contents for a finished walk
pub(crate) fn build_lock_file(request: &RestoreRequest, fingerprint: &str, walk: &WalkResult) -> LockFile {
    let mut lock = LockFile::new(
        LockedProject {
            name: request.project_name().to_string(),
            path: request.project.project_path().to_path_buf(),
            style: request.project_style,
        },
        fingerprint,
    );

    for resolution in &walk.frameworks {
        let framework = resolution.framework.to_string();

        for package in resolution.packages.values() {
            lock.add_library(
                &framework,
                library_key(&package.id, &package.version),
                LockedLibrary {
                    kind: LibraryKind::Package,
                    dependencies: package
                        .dependencies
                        .iter()
                        .map(|dependency| (dependency.id.clone(), dependency.range.to_string()))
                        .collect(),
                    framework: None,
                    include_assets: package.include_assets.clone(),
                    exclude_assets: package.exclude_assets.clone(),
                },
                LibraryEntry {
                    kind: LibraryKind::Package,
                    path: package_path(&package.id, &package.version, request.lowercase_packages_directory),
                },
            );
        }

        for project in resolution.projects.values() {
            let mut dependencies: BTreeMap<String, String> = project
                .dependencies
                .iter()
                .map(|(id, range)| (id.clone(), range.to_string()))
                .collect();
            for reference in &project.project_references {
                if let Some(referenced) = resolution.projects.get(&reference.to_ascii_lowercase()) {
                    dependencies.insert(referenced.unique_name.clone(), referenced.version.to_normalized_string());
                }
            }

            lock.add_library(
                &framework,
                library_key(&project.unique_name, &project.version),
                LockedLibrary {
                    kind: LibraryKind::Project,
                    dependencies,
                    framework: Some(project.framework.to_string()),
                    include_assets: None,
                    exclude_assets: None,
                },
                LibraryEntry {
                    kind: LibraryKind::Project,
                    path: project.project_path.display().to_string(),
                },
            );
        }
    }

    lock.package_folders = std::iter::once(&request.packages_path)
        .chain(request.fallback_folders.iter())
        .map(|folder| folder.display().to_string())
        .collect();
    lock.sources = request.sources.iter().map(|source| source.source.clone()).collect();
    lock.diagnostics = walk.diagnostics().map(Diagnostic::to_locked).collect();
    lock
}

/// Folder of a package relative to the packages path
fn package_path(id: &str, version: &Version, lowercase: bool) -> String {
    let id = if lowercase { id.to_ascii_lowercase() } else { id.to_string() };
    format!("{}/{}", id, version.to_normalized_string().to_ascii_lowercase())
}
