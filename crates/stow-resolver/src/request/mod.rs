//! Restore requests: one per restore root, built from the root's closure
//! and the session's restore arguments
//!
//! Building a request is cheap. Fingerprinting, lock file access and the
//! graph walk all happen later in the runner.

use crate::external::{check_closed, ExternalProjectReference};
use crate::graph::DependencyGraphSpec;
use crate::ResolverResult;
use std::path::PathBuf;
use std::sync::Arc;
use stow_config::{merge_sources, RestoreArgs};
use stow_core::error::StowError;
use stow_core::utils::project_directory;
use stow_core::{PackageSourceRef, PackageSpec, ProjectStyle};
use stow_lockfile::{fingerprint, FingerprintInputs, CACHE_FILE_SUFFIX, FINGERPRINT_FORMAT_VERSION, LOCK_FILE_SUFFIX};
use stow_registry::{ProviderCache, ProviderKey, RestoreProviders};
use tracing::debug;

/// Everything needed to restore one root project
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Root spec with the effective sources attached
    pub project: Arc<PackageSpec>,
    pub external_closure: Vec<ExternalProjectReference>,
    pub sources: Vec<PackageSourceRef>,
    pub packages_path: PathBuf,
    pub fallback_folders: Vec<PathBuf>,
    pub project_style: ProjectStyle,
    pub output_path: PathBuf,
    pub lowercase_packages_directory: bool,
    pub allow_no_op: bool,
    /// Closure graph of the root, used for fingerprinting and for looking up
    /// referenced projects during the walk
    pub dependency_graph: Arc<DependencyGraphSpec>,
    pub providers: Arc<RestoreProviders>,
    pub lock_file_path: PathBuf,
    pub cache_file_path: PathBuf,
    /// Input fingerprint, filled in by the runner
    pub dg_spec_hash: Option<String>,
}

impl RestoreRequest {
    pub fn project_name(&self) -> &str {
        self.project.unique_name()
    }

    /// Fingerprint of every input that can change this request's lock file
    pub fn compute_fingerprint(&self) -> ResolverResult<String> {
        let dg_spec = self.dependency_graph.to_json()?;
        fingerprint(&FingerprintInputs {
            format_version: FINGERPRINT_FORMAT_VERSION,
            dg_spec: &dg_spec,
            sources: &self.sources,
            packages_path: &self.packages_path,
            fallback_folders: &self.fallback_folders,
            lowercase_packages_directory: self.lowercase_packages_directory,
        })
    }
}

/// A request plus the settings it was built from, kept for reporting
#[derive(Debug, Clone)]
pub struct RestoreSummaryRequest {
    pub request: RestoreRequest,
    pub sources: Vec<PackageSourceRef>,
    pub args: RestoreArgs,
}

impl RestoreSummaryRequest {
    pub fn project_name(&self) -> &str {
        self.request.project_name()
    }
}

/// Builds restore requests against one shared provider cache
#[derive(Debug, Clone, Copy)]
pub struct RestoreRequestBuilder<'a> {
    args: &'a RestoreArgs,
    provider_cache: &'a ProviderCache,
}

impl<'a> RestoreRequestBuilder<'a> {
    pub fn new(args: &'a RestoreArgs, provider_cache: &'a ProviderCache) -> Self {
        Self { args, provider_cache }
    }

    /// Build the request of restore root `root` in `graph`
    pub fn build_for_root(&self, graph: &DependencyGraphSpec, root: &str) -> ResolverResult<RestoreSummaryRequest> {
        let project_graph = graph.with_project_closure(root)?;
        let closure = ExternalProjectReference::closure_of(&project_graph, root)?;
        let spec = project_graph
            .get_project(root)
            .cloned()
            .ok_or_else(|| StowError::UnknownRestoreRoot { name: root.to_string() })?;
        self.build(&spec, closure, project_graph)
    }

    /// Build a request for `root` from its closure
    ///
    /// `closure` must contain `root` and be closed under project references.
    /// The root spec itself is left untouched; the request carries a copy
    /// with the effective sources.
    pub fn build(
        &self,
        root: &PackageSpec,
        closure: Vec<ExternalProjectReference>,
        project_graph: DependencyGraphSpec,
    ) -> ResolverResult<RestoreSummaryRequest> {
        check_closed(root.unique_name(), &closure)?;

        let sources = merge_sources(project_graph.sources(), &root.restore.sources, &self.args.sources);
        let packages_path = self.args.packages_path_for(root);
        let fallback_folders = self.args.fallback_folders_for(root);

        let providers = self.provider_cache.get_or_create(&ProviderKey {
            packages_path: packages_path.clone(),
            fallback_folders: fallback_folders.clone(),
            sources: sources.clone(),
        })?;

        let output_path = root
            .restore
            .output_path
            .clone()
            .unwrap_or_else(|| project_directory(root.project_path()));
        let stem = file_stem(root.unique_name());
        let lock_file_path = output_path.join(format!("{}{}", stem, LOCK_FILE_SUFFIX));
        let cache_file_path = output_path.join(format!("{}{}", stem, CACHE_FILE_SUFFIX));

        let request = RestoreRequest {
            project: Arc::new(root.with_sources(sources.clone())),
            external_closure: closure,
            sources: sources.clone(),
            packages_path,
            fallback_folders,
            project_style: root.style(),
            output_path,
            lowercase_packages_directory: self.args.lowercase_packages_directory
                && !root.restore.legacy_packages_directory,
            allow_no_op: self.args.allow_no_op,
            dependency_graph: Arc::new(project_graph),
            providers,
            lock_file_path,
            cache_file_path,
            dg_spec_hash: None,
        };

        debug!(
            project = request.project_name(),
            style = %request.project_style,
            sources = request.sources.len(),
            closure = request.external_closure.len(),
            output = %request.output_path.display(),
            "built restore request"
        );

        Ok(RestoreSummaryRequest {
            request,
            sources,
            args: self.args.clone(),
        })
    }
}

/// File-name-safe form of a unique name, which may itself be a path
fn file_stem(unique_name: &str) -> String {
    let stem: String = unique_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    stem.trim_start_matches('.').to_string()
}
