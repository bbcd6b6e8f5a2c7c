//! Dependency graph spec: every project of a restore session plus the
//! ordered restore roots
//!
//! Projects live in an insertion-ordered arena keyed by unique name. Closure
//! computations are worklists over that arena and never recurse, so deep or
//! cyclic reference chains cannot blow the stack.

use crate::ResolverResult;
use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use stow_core::error::StowError;
use stow_core::{PackageSourceRef, PackageSpec};
use stow_lockfile::LockFileWriter;
use tracing::{debug, info};

/// File written by `persist_for_diagnostics`
pub const DG_FILE_NAME: &str = "stow.dg.json";

/// All projects of one restore session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraphSpec {
    restore: Vec<String>,
    projects: IndexMap<String, PackageSpec>,
    /// Lowercased unique name → position in `projects`
    index: HashMap<String, usize>,
    sources: Option<Vec<PackageSourceRef>>,
}

/// Serialized form, borrowed for writing
#[derive(Serialize)]
struct DocumentRef<'a> {
    restore: &'a [String],
    projects: &'a IndexMap<String, PackageSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<&'a Vec<PackageSourceRef>>,
}

/// Serialized form, owned for reading
///
/// `projects` keeps duplicate keys so they can be reported instead of
/// silently overwritten.
#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    restore: Vec<String>,
    #[serde(default, deserialize_with = "project_entries")]
    projects: Vec<(String, PackageSpec)>,
    #[serde(default)]
    sources: Option<Vec<PackageSourceRef>>,
}

fn project_entries<'de, D>(deserializer: D) -> Result<Vec<(String, PackageSpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, PackageSpec)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of project unique names to package specs")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, PackageSpec>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

impl DependencyGraphSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project, keyed by its unique name
    pub fn add_project(&mut self, spec: PackageSpec) -> ResolverResult<()> {
        let name = spec.unique_name().to_string();
        if name.trim().is_empty() {
            return Err(StowError::InvalidGraph {
                message: format!("project at {} has no unique name", spec.project_path().display()),
            });
        }

        let lowered = name.to_ascii_lowercase();
        if self.index.contains_key(&lowered) {
            return Err(StowError::DuplicateProject { name });
        }

        self.index.insert(lowered, self.projects.len());
        self.projects.insert(name, spec);
        Ok(())
    }

    /// Mark a project as a restore root; repeated names keep their first position
    pub fn add_restore(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.restore.iter().any(|root| root.eq_ignore_ascii_case(&name)) {
            self.restore.push(name);
        }
    }

    pub fn restore_roots(&self) -> &[String] {
        &self.restore
    }

    /// Projects in declaration order
    pub fn projects(&self) -> impl Iterator<Item = &PackageSpec> {
        self.projects.values()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Look up a project by unique name, ignoring case
    pub fn get_project(&self, name: &str) -> Option<&PackageSpec> {
        self.position(name)
            .and_then(|position| self.projects.get_index(position))
            .map(|(_, spec)| spec)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Graph-level source overrides
    pub fn sources(&self) -> Option<&[PackageSourceRef]> {
        self.sources.as_deref()
    }

    pub fn set_sources(&mut self, sources: Option<Vec<PackageSourceRef>>) {
        self.sources = sources;
    }

    /// Projects that directly reference `name`, in declaration order
    pub fn parents_of(&self, name: &str) -> Vec<&PackageSpec> {
        self.projects
            .values()
            .filter(|spec| {
                spec.project_reference_names()
                    .iter()
                    .any(|reference| reference.eq_ignore_ascii_case(name))
            })
            .collect()
    }

    /// Every project reachable from `root` through project references,
    /// the root first, then breadth-first in reference order
    ///
    /// Terminates on cycles. A reference to an undeclared project is an error.
    pub fn get_closure(&self, root: &str) -> ResolverResult<Vec<&PackageSpec>> {
        let root_position = self
            .position(root)
            .ok_or_else(|| StowError::UnknownRestoreRoot { name: root.to_string() })?;

        let mut visited = HashSet::from([root_position]);
        let mut worklist = VecDeque::from([root_position]);
        let mut closure = Vec::new();

        while let Some(position) = worklist.pop_front() {
            let Some((_, spec)) = self.projects.get_index(position) else {
                continue;
            };
            closure.push(spec);

            for reference in spec.project_reference_names() {
                let referenced = self.position(&reference).ok_or_else(|| StowError::MissingProjectReference {
                    project: spec.unique_name().to_string(),
                    reference: reference.clone(),
                })?;
                if visited.insert(referenced) {
                    worklist.push_back(referenced);
                }
            }
        }

        Ok(closure)
    }

    /// A new graph holding only the closure of `root`, with `root` as its
    /// single restore root
    ///
    /// Projects keep their declaration order and the source overrides carry
    /// over.
    pub fn with_project_closure(&self, root: &str) -> ResolverResult<DependencyGraphSpec> {
        let members: HashSet<String> = self
            .get_closure(root)?
            .iter()
            .map(|spec| spec.unique_name().to_ascii_lowercase())
            .collect();

        let mut graph = DependencyGraphSpec::new();
        for spec in self.projects.values() {
            if members.contains(&spec.unique_name().to_ascii_lowercase()) {
                graph.add_project(spec.clone())?;
            }
        }

        let root_name = self
            .get_project(root)
            .map(|spec| spec.unique_name().to_string())
            .unwrap_or_else(|| root.to_string());
        graph.add_restore(root_name);
        graph.sources = self.sources.clone();
        Ok(graph)
    }

    /// Check the graph's shape before any resolution starts
    ///
    /// Every restore root and every project reference must name a declared
    /// project, and project references must not form a cycle.
    pub fn validate(&self) -> ResolverResult<()> {
        for root in &self.restore {
            if self.position(root).is_none() {
                return Err(StowError::UnknownRestoreRoot { name: root.clone() });
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.projects.len(), 0);
        let nodes: Vec<NodeIndex> = (0..self.projects.len()).map(|position| graph.add_node(position)).collect();

        for (position, spec) in self.projects.values().enumerate() {
            for reference in spec.project_reference_names() {
                let referenced = self.position(&reference).ok_or_else(|| StowError::MissingProjectReference {
                    project: spec.unique_name().to_string(),
                    reference: reference.clone(),
                })?;
                graph.update_edge(nodes[position], nodes[referenced], ());
            }
        }

        if let Some(cycle) = find_cycle(&graph) {
            let names: Vec<&str> = cycle
                .iter()
                .filter_map(|node| self.projects.get_index(graph[*node]))
                .map(|(name, _)| name.as_str())
                .collect();
            return Err(StowError::CircularProjectReference {
                cycle: format_cycle(&names),
            });
        }

        debug!(
            projects = self.projects.len(),
            roots = self.restore.len(),
            "dependency graph is valid"
        );
        Ok(())
    }

    pub fn from_json(json: &str) -> ResolverResult<Self> {
        let document: Document =
            serde_json::from_str(json).map_err(|e| StowError::json("dependency graph", e))?;

        let mut graph = DependencyGraphSpec::new();
        for (key, mut spec) in document.projects {
            if spec.unique_name().is_empty() {
                spec.restore.project_unique_name = key.clone();
            } else if !spec.unique_name().eq_ignore_ascii_case(&key) {
                return Err(StowError::InvalidGraph {
                    message: format!(
                        "project key '{}' does not match its projectUniqueName '{}'",
                        key,
                        spec.unique_name()
                    ),
                });
            }
            graph.add_project(spec)?;
        }
        for root in document.restore {
            graph.add_restore(root);
        }
        graph.sources = document.sources;
        Ok(graph)
    }

    /// Read a dependency graph document from disk
    pub fn load(path: &Path) -> ResolverResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StowError::io(format!("Failed to read dependency graph {}", path.display()), e))?;
        Self::from_json(&json)
    }

    /// Pretty JSON with a trailing newline; projects keep declaration order
    pub fn to_json(&self) -> ResolverResult<String> {
        let document = DocumentRef {
            restore: &self.restore,
            projects: &self.projects,
            sources: self.sources.as_ref(),
        };
        let mut json = serde_json::to_string_pretty(&document).map_err(|e| StowError::json("dependency graph", e))?;
        json.push('\n');
        Ok(json)
    }

    pub fn save(&self, path: &Path) -> ResolverResult<()> {
        LockFileWriter::write_atomic(path, self.to_json()?.as_bytes())
    }

    /// Write the graph to `<dir>/stow.dg.json` as a debugging aid
    pub fn persist_for_diagnostics(&self, dir: &Path) -> ResolverResult<PathBuf> {
        let path = dir.join(DG_FILE_NAME);
        self.save(&path)?;
        info!(path = %path.display(), "persisted dependency graph");
        Ok(path)
    }
}

/// Find one cycle as a closed path (`first == last`)
fn find_cycle(graph: &DiGraph<usize, ()>) -> Option<Vec<NodeIndex>> {
    for component in tarjan_scc(graph) {
        let Some(&start) = component.iter().min() else {
            continue;
        };
        if component.len() == 1 {
            if graph.contains_edge(start, start) {
                return Some(vec![start, start]);
            }
            continue;
        }

        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            let mut neighbors: Vec<NodeIndex> = graph.neighbors(node).collect();
            neighbors.sort();

            for next in neighbors {
                if next == start {
                    let mut path = vec![node];
                    let mut current = node;
                    while let Some(&previous) = parent.get(&current) {
                        path.push(previous);
                        current = previous;
                    }
                    path.reverse();
                    path.push(start);
                    return Some(path);
                }
                if members.contains(&next) && !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
    }

    None
}

/// Format a cycle for error messages
pub fn format_cycle(names: &[&str]) -> String {
    names.join(" -> ")
}
