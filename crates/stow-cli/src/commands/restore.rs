//! `stow restore` command implementation.
//!
//! Loads the dependency graph, layers configuration from the environment and
//! the command line, restores every root against local feed sources and
//! prints one line per project plus its diagnostics.

use super::CommandContext;
use std::path::Path;
use std::sync::Arc;
use stow_config::{CliOverrides, ConfigLayering};
use stow_core::error::StowResult;
use stow_registry::{FeedSourceFactory, ProviderCache};
use stow_resolver::{DependencyGraphSpec, ProjectRestoreResult, RestoreBatchResult, RestoreOutcome, RestoreRunner};

/// Execute the `stow restore` command
pub async fn execute(graph_path: &Path, overrides: &CliOverrides, ctx: &CommandContext) -> StowResult<bool> {
    let graph = DependencyGraphSpec::load(&ctx.resolve(graph_path))?;
    let args = ConfigLayering::from_environment(overrides)?;

    ctx.output.info(&format!(
        "Restoring {} project(s) from {}",
        graph.restore_roots().len(),
        graph_path.display()
    ));

    let provider_cache = Arc::new(ProviderCache::new(Arc::new(FeedSourceFactory)));
    let batch = RestoreRunner::new(args, provider_cache).run(&graph).await?;

    report(&batch, ctx);
    Ok(batch.success())
}

fn report(batch: &RestoreBatchResult, ctx: &CommandContext) {
    for result in &batch.results {
        ctx.output.outcome(result.success(), &describe_result(result));
        for diagnostic in &result.diagnostics {
            ctx.output.diagnostic(diagnostic);
        }
    }

    ctx.output.outcome(batch.success(), &summary_line(batch));
}

/// One line describing what happened to a project
pub fn describe_result(result: &ProjectRestoreResult) -> String {
    let lock = result
        .lock_file_path
        .as_ref()
        .map(|path| format!(" ({})", path.display()))
        .unwrap_or_default();

    match &result.outcome {
        RestoreOutcome::Restored if result.success() => format!("{} restored{}", result.project, lock),
        RestoreOutcome::Restored => format!("{} restored with errors{}", result.project, lock),
        RestoreOutcome::NoOp => format!("{} is up to date{}", result.project, lock),
        RestoreOutcome::Reused { representative } => {
            format!("{} shares the restore of {}{}", result.project, representative, lock)
        },
        RestoreOutcome::Failed => format!("{} failed to restore{}", result.project, lock),
    }
}

/// Totals for the whole batch
pub fn summary_line(batch: &RestoreBatchResult) -> String {
    let failed = batch.failed().count();
    format!(
        "{} project(s) in {:.2}s: {} up to date, {} failed",
        batch.results.len(),
        batch.elapsed.as_secs_f64(),
        batch.no_op_count(),
        failed
    )
}
