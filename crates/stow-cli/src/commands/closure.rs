//! `stow closure` command implementation.
//!
//! Prints the projects a restore of one project would include, the project
//! itself first, then its references in breadth-first order.

use super::CommandContext;
use std::path::Path;
use stow_core::error::StowResult;
use stow_resolver::DependencyGraphSpec;

/// Execute the `stow closure` command
pub async fn execute(graph_path: &Path, project: &str, ctx: &CommandContext) -> StowResult<bool> {
    let graph = DependencyGraphSpec::load(&ctx.resolve(graph_path))?;

    for line in closure_lines(&graph, project)? {
        ctx.output.plain_line(&line);
    }
    Ok(true)
}

/// One `name  path` line per project of the closure
pub fn closure_lines(graph: &DependencyGraphSpec, project: &str) -> StowResult<Vec<String>> {
    let closure = graph.get_closure(project)?;
    let width = closure.iter().map(|spec| spec.unique_name().len()).max().unwrap_or(0);

    Ok(closure
        .iter()
        .map(|spec| format!("{:width$}  {}", spec.unique_name(), spec.project_path().display(), width = width))
        .collect())
}
