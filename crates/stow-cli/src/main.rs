//! # stow-cli
//!
//! Command-line front end of the stow restore engine.
//!
//! Parses arguments, sets up logging, builds the async runtime and dispatches
//! to the command handlers. Domain errors are printed with their suggestion
//! and cause chain; the exit code is non-zero when anything failed.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stow_core::error::StowError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use anyhow::Context;
use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Environment variable holding an explicit log filter
const LOG_ENV: &str = "STOW_LOG";

/// Restore package graphs described by a dependency graph document
#[derive(Parser)]
#[command(name = "stow", version, about = "Package restore engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Restore every root of a dependency graph
    Restore {
        /// Dependency graph document
        #[arg(value_name = "GRAPH")]
        graph: PathBuf,
        /// Package source; replaces the configured sources, may be repeated
        #[arg(long = "source", value_name = "LOCATION")]
        sources: Vec<String>,
        /// Global packages folder
        #[arg(long, value_name = "DIR")]
        packages: Option<PathBuf>,
        /// Fallback package folder, may be repeated
        #[arg(long = "fallback", value_name = "DIR")]
        fallback: Vec<PathBuf>,
        /// Restore even when inputs are unchanged
        #[arg(long)]
        force: bool,
        /// Maximum number of projects restored at once
        #[arg(long, value_name = "N")]
        max_parallel: Option<usize>,
        /// Timeout for the whole restore
        #[arg(long, value_name = "SECONDS")]
        timeout_secs: Option<u64>,
    },
    /// Print the project closure of one project
    Closure {
        /// Dependency graph document
        #[arg(value_name = "GRAPH")]
        graph: PathBuf,
        /// Unique name of the project
        project: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting stow v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let formatter = ErrorFormatter::new();
            match e.downcast_ref::<StowError>() {
                Some(stow_error) => eprint!("{}", formatter.format_error(stow_error)),
                None => eprintln!("{}", formatter.format_simple(&format!("{:#}", e))),
            }
            ExitCode::FAILURE
        },
    }
}

/// Returns whether the command succeeded
fn run_cli(cli: Cli) -> anyhow::Result<bool> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    let succeeded = rt.block_on(async {
        let ctx = CommandContext::new()?;
        commands::dispatch_command(cli.command, &ctx).await
    })?;
    Ok(succeeded)
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!(
            "stow_cli={level},stow_core={level},stow_config={level},stow_registry={level},stow_resolver={level},stow_lockfile={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("stow encountered an unexpected error: {}", panic_info);
        eprintln!("stow crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
