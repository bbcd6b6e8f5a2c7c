//! Command implementations and dispatch.
//!
//! Each handler returns whether the command succeeded; `Err` is reserved for
//! failures that stop the command outright.

use crate::{output::OutputHandler, Commands};
use std::path::{Path, PathBuf};
use stow_config::CliOverrides;
use stow_core::error::{StowError, StowResult};
use tracing::info;

pub mod closure;
pub mod restore;

#[cfg(test)]
mod tests;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
}

impl CommandContext {
    pub fn new() -> StowResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| StowError::io("Failed to get current directory", e))?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
        })
    }

    /// Resolve a command-line path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> StowResult<bool> {
    match command {
        Commands::Restore {
            graph,
            sources,
            packages,
            fallback,
            force,
            max_parallel,
            timeout_secs,
        } => {
            info!("Restoring {} (force: {})", graph.display(), force);
            let overrides = CliOverrides {
                sources,
                packages: packages.map(|path| ctx.resolve(&path)),
                fallback_folders: fallback.iter().map(|path| ctx.resolve(path)).collect(),
                force,
                max_parallel,
                timeout_secs,
            };
            restore::execute(&graph, &overrides, ctx).await
        },
        Commands::Closure { graph, project } => {
            info!("Computing closure of {} in {}", project, graph.display());
            closure::execute(&graph, &project, ctx).await
        },
    }
}
