//! Closure members as seen by a restore request

use crate::graph::DependencyGraphSpec;
use crate::ResolverResult;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stow_core::error::StowError;
use stow_core::PackageSpec;

/// One project of a closure together with its direct references
///
/// Identity is the unique name, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct ExternalProjectReference {
    unique_name: String,
    spec: Arc<PackageSpec>,
    project_path: PathBuf,
    references: Vec<String>,
}

impl ExternalProjectReference {
    pub fn from_spec(spec: Arc<PackageSpec>) -> Self {
        Self {
            unique_name: spec.unique_name().to_string(),
            project_path: spec.project_path().to_path_buf(),
            references: spec.project_reference_names(),
            spec,
        }
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn spec(&self) -> &Arc<PackageSpec> {
        &self.spec
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Unique names of directly referenced projects, deduplicated
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Closure of `root` in `graph` as external references, root first
    pub fn closure_of(graph: &DependencyGraphSpec, root: &str) -> ResolverResult<Vec<ExternalProjectReference>> {
        Ok(graph
            .get_closure(root)?
            .into_iter()
            .map(|spec| ExternalProjectReference::from_spec(Arc::new(spec.clone())))
            .collect())
    }
}

impl PartialEq for ExternalProjectReference {
    fn eq(&self, other: &Self) -> bool {
        self.unique_name.eq_ignore_ascii_case(&other.unique_name)
    }
}

impl Eq for ExternalProjectReference {}

impl Hash for ExternalProjectReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_name.to_ascii_lowercase().hash(state);
    }
}

/// Check that `closure` contains `root` and every direct reference of every member
///
/// A failure means the caller assembled the closure incorrectly.
pub fn check_closed(root: &str, closure: &[ExternalProjectReference]) -> ResolverResult<()> {
    let members: HashSet<String> = closure
        .iter()
        .map(|member| member.unique_name().to_ascii_lowercase())
        .collect();

    if !members.contains(&root.to_ascii_lowercase()) {
        return Err(StowError::invariant(format!(
            "restore root '{}' is not part of its own closure",
            root
        )));
    }

    for member in closure {
        for reference in member.references() {
            if !members.contains(&reference.to_ascii_lowercase()) {
                return Err(StowError::invariant(format!(
                    "closure of '{}' is not closed: '{}' references '{}'",
                    root,
                    member.unique_name(),
                    reference
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_core::ProjectReference;

    fn spec(name: &str, references: &[&str]) -> PackageSpec {
        let mut spec = PackageSpec::new(name, format!("/src/{name}.csproj"));
        for reference in references {
            spec.add_project_reference("net8.0", *reference, ProjectReference::default());
            spec.add_project_reference("net48", reference.to_ascii_uppercase(), ProjectReference::default());
        }
        spec
    }

    #[test]
    fn test_references_are_deduplicated() {
        let reference = ExternalProjectReference::from_spec(Arc::new(spec("App", &["Lib"])));
        assert_eq!(reference.references(), &["Lib".to_string()]);
        assert_eq!(reference.project_path(), Path::new("/src/App.csproj"));
    }

    #[test]
    fn test_identity_ignores_case() {
        let a = ExternalProjectReference::from_spec(Arc::new(spec("App", &[])));
        let b = ExternalProjectReference::from_spec(Arc::new(spec("APP", &["Lib"])));
        assert_eq!(a, b);

        let set: HashSet<ExternalProjectReference> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_check_closed() {
        let mut graph = DependencyGraphSpec::new();
        graph.add_project(spec("App", &["Lib"])).unwrap();
        graph.add_project(spec("Lib", &[])).unwrap();

        let closure = ExternalProjectReference::closure_of(&graph, "App").unwrap();
        check_closed("App", &closure).unwrap();

        let open: Vec<_> = closure.iter().filter(|member| member.unique_name() == "App").cloned().collect();
        assert!(matches!(
            check_closed("App", &open),
            Err(StowError::InvariantViolation { .. })
        ));
        assert!(matches!(
            check_closed("Other", &closure),
            Err(StowError::InvariantViolation { .. })
        ));
    }
}
