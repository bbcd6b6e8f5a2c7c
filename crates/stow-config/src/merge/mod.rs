//! Configuration layering and environment overrides
//!
//! Precedence, lowest first: built-in defaults, `STOW_*` environment
//! variables, command-line flags.

use crate::{ConfigResult, RestoreArgs};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use stow_core::error::StowError;
use stow_core::PackageSourceRef;
use tracing::debug;

/// Prefix of every environment variable stow reads
pub const ENV_PREFIX: &str = "STOW_";

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub sources: Vec<String>,
    pub packages: Option<PathBuf>,
    pub fallback_folders: Vec<PathBuf>,
    pub force: bool,
    pub max_parallel: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

impl ConfigLayering {
    /// Build restore arguments from defaults, environment and command line
    pub fn resolve(env_overrides: &HashMap<String, String>, cli: &CliOverrides) -> ConfigResult<RestoreArgs> {
        let mut args = RestoreArgs::default();

        Self::apply_env_overrides(&mut args, env_overrides)?;
        Self::apply_cli_overrides(&mut args, cli)?;

        debug!(
            sources = args.sources.len(),
            max_parallel = args.max_parallel,
            timeout_secs = args.timeout.as_secs(),
            allow_no_op = args.allow_no_op,
            "resolved restore arguments"
        );
        Ok(args)
    }

    /// Resolve against the current process environment
    pub fn from_environment(cli: &CliOverrides) -> ConfigResult<RestoreArgs> {
        Self::resolve(&Self::collect_env_overrides(), cli)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(args: &mut RestoreArgs, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            let value = value.trim();
            match key.as_str() {
                "STOW_PACKAGES" if !value.is_empty() => {
                    args.global_packages_folder = Some(PathBuf::from(value));
                },
                "STOW_FALLBACK_FOLDERS" => {
                    args.fallback_folders = std::env::split_paths(value)
                        .filter(|path| !path.as_os_str().is_empty())
                        .collect();
                },
                "STOW_SOURCES" => {
                    args.sources = value
                        .split(';')
                        .map(str::trim)
                        .filter(|location| !location.is_empty())
                        .map(PackageSourceRef::from_location)
                        .collect();
                },
                "STOW_MAX_PARALLEL" => {
                    args.max_parallel = parse_positive(key, value)? as usize;
                },
                "STOW_TIMEOUT_SECS" => {
                    args.timeout = Duration::from_secs(parse_positive(key, value)?);
                },
                "STOW_FORCE" => {
                    if parse_flag(key, value)? {
                        args.allow_no_op = false;
                    }
                },
                "STOW_PERSIST_GRAPH" if !value.is_empty() => {
                    // A plain switch persists next to the working directory
                    args.persist_graph_path = match value.to_ascii_lowercase().as_str() {
                        "0" | "false" | "no" => None,
                        "1" | "true" | "yes" => Some(PathBuf::from(".")),
                        _ => Some(PathBuf::from(value)),
                    };
                },
                _ => {
                    // Unknown or empty variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(args: &mut RestoreArgs, cli: &CliOverrides) -> ConfigResult<()> {
        if !cli.sources.is_empty() {
            args.sources = cli
                .sources
                .iter()
                .map(|location| PackageSourceRef::from_location(location.as_str()))
                .collect();
        }
        if let Some(packages) = &cli.packages {
            args.global_packages_folder = Some(packages.clone());
        }
        if !cli.fallback_folders.is_empty() {
            args.fallback_folders = cli.fallback_folders.clone();
        }
        if cli.force {
            args.allow_no_op = false;
        }
        if let Some(max_parallel) = cli.max_parallel {
            if max_parallel == 0 {
                return Err(StowError::ConfigValidation {
                    field: "max-parallel".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            args.max_parallel = max_parallel;
        }
        if let Some(timeout_secs) = cli.timeout_secs {
            if timeout_secs == 0 {
                return Err(StowError::ConfigValidation {
                    field: "timeout-secs".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            args.timeout = Duration::from_secs(timeout_secs);
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn parse_positive(field: &str, value: &str) -> ConfigResult<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(StowError::ConfigValidation {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        }),
        Err(e) => Err(StowError::ConfigValidation {
            field: field.to_string(),
            reason: format!("'{}' is not a number: {}", value, e),
        }),
    }
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(StowError::ConfigValidation {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides() {
        let overrides = env(&[
            ("STOW_PACKAGES", "/ci/packages"),
            ("STOW_SOURCES", "/feeds/a; https://feed.example/v3 ;"),
            ("STOW_MAX_PARALLEL", "3"),
            ("STOW_TIMEOUT_SECS", "90"),
            ("STOW_FORCE", "true"),
            ("STOW_PERSIST_GRAPH", "/tmp/dg"),
        ]);

        let args = ConfigLayering::resolve(&overrides, &CliOverrides::default()).unwrap();

        assert_eq!(args.global_packages_folder, Some(PathBuf::from("/ci/packages")));
        assert_eq!(
            args.sources,
            vec![
                PackageSourceRef::from_location("/feeds/a"),
                PackageSourceRef::from_location("https://feed.example/v3"),
            ]
        );
        assert_eq!(args.max_parallel, 3);
        assert_eq!(args.timeout, Duration::from_secs(90));
        assert!(!args.allow_no_op);
        assert_eq!(args.persist_graph_path, Some(PathBuf::from("/tmp/dg")));
    }

    #[test]
    fn test_cli_wins_over_env() {
        let overrides = env(&[("STOW_MAX_PARALLEL", "3"), ("STOW_SOURCES", "/feeds/env")]);
        let cli = CliOverrides {
            sources: vec!["/feeds/cli".to_string()],
            max_parallel: Some(8),
            ..Default::default()
        };

        let args = ConfigLayering::resolve(&overrides, &cli).unwrap();
        assert_eq!(args.max_parallel, 8);
        assert_eq!(args.sources, vec![PackageSourceRef::from_location("/feeds/cli")]);
    }

    #[test]
    fn test_invalid_values() {
        let err = ConfigLayering::resolve(&env(&[("STOW_MAX_PARALLEL", "lots")]), &CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, StowError::ConfigValidation { ref field, .. } if field == "STOW_MAX_PARALLEL"));

        assert!(ConfigLayering::resolve(&env(&[("STOW_TIMEOUT_SECS", "0")]), &CliOverrides::default()).is_err());
        assert!(ConfigLayering::resolve(&env(&[("STOW_FORCE", "maybe")]), &CliOverrides::default()).is_err());

        let cli = CliOverrides {
            max_parallel: Some(0),
            ..Default::default()
        };
        assert!(ConfigLayering::resolve(&HashMap::new(), &cli).is_err());
    }

    #[test]
    fn test_persist_graph_switch() {
        let args = ConfigLayering::resolve(&env(&[("STOW_PERSIST_GRAPH", "1")]), &CliOverrides::default()).unwrap();
        assert_eq!(args.persist_graph_path, Some(PathBuf::from(".")));

        let args = ConfigLayering::resolve(&env(&[("STOW_PERSIST_GRAPH", "false")]), &CliOverrides::default()).unwrap();
        assert_eq!(args.persist_graph_path, None);
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("STOW_TEST_COLLECT", "yes");
        std::env::set_var("NOT_STOW_TEST_COLLECT", "ignored");

        let overrides = ConfigLayering::collect_env_overrides();

        assert!(overrides.contains_key("STOW_TEST_COLLECT"));
        assert!(!overrides.contains_key("NOT_STOW_TEST_COLLECT"));

        std::env::remove_var("STOW_TEST_COLLECT");
        std::env::remove_var("NOT_STOW_TEST_COLLECT");
    }
}
