//! Global restore arguments shared by every request in a session.

use std::path::PathBuf;
use std::time::Duration;
use stow_core::{PackageSourceRef, PackageSpec};

/// Default upper bound for a whole restore batch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Settings that apply to every project in one restore session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreArgs {
    /// Globally configured sources
    pub sources: Vec<PackageSourceRef>,
    /// Explicit global packages folder; wins over a project's own path
    pub global_packages_folder: Option<PathBuf>,
    /// Used when neither the override nor the project names a packages folder
    pub default_packages_folder: PathBuf,
    /// Used when a project declares no fallback folders
    pub fallback_folders: Vec<PathBuf>,
    pub allow_no_op: bool,
    pub max_parallel: usize,
    pub timeout: Duration,
    pub lowercase_packages_directory: bool,
    /// Directory receiving the raw input graph before resolution
    pub persist_graph_path: Option<PathBuf>,
}

impl Default for RestoreArgs {
    fn default() -> Self {
        let default_packages_folder = dirs::home_dir()
            .map(|home| home.join(".stow").join("packages"))
            .unwrap_or_else(|| PathBuf::from(".stow").join("packages"));

        Self {
            sources: Vec::new(),
            global_packages_folder: None,
            default_packages_folder,
            fallback_folders: Vec::new(),
            allow_no_op: true,
            max_parallel: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: DEFAULT_TIMEOUT,
            lowercase_packages_directory: true,
            persist_graph_path: None,
        }
    }
}

impl RestoreArgs {
    /// Packages folder for a project: explicit override, then the project's
    /// own path, then the default folder
    pub fn packages_path_for(&self, spec: &PackageSpec) -> PathBuf {
        self.global_packages_folder
            .clone()
            .or_else(|| spec.restore.packages_path.clone())
            .unwrap_or_else(|| self.default_packages_folder.clone())
    }

    /// Fallback folders for a project: its own list if non-empty, else the global list
    pub fn fallback_folders_for(&self, spec: &PackageSpec) -> Vec<PathBuf> {
        if spec.restore.fallback_folders.is_empty() {
            self.fallback_folders.clone()
        } else {
            spec.restore.fallback_folders.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = RestoreArgs::default();
        assert!(args.allow_no_op);
        assert!(args.max_parallel >= 1);
        assert!(args.lowercase_packages_directory);
        assert_eq!(args.timeout, DEFAULT_TIMEOUT);
        assert!(args.default_packages_folder.ends_with(".stow/packages"));
    }

    #[test]
    fn test_packages_path_precedence() {
        let mut spec = PackageSpec::new("AppA", "/src/AppA/AppA.csproj");
        let mut args = RestoreArgs {
            default_packages_folder: PathBuf::from("/home/dev/.stow/packages"),
            ..Default::default()
        };

        assert_eq!(args.packages_path_for(&spec), PathBuf::from("/home/dev/.stow/packages"));

        spec.restore.packages_path = Some(PathBuf::from("/src/AppA/packages"));
        assert_eq!(args.packages_path_for(&spec), PathBuf::from("/src/AppA/packages"));

        args.global_packages_folder = Some(PathBuf::from("/ci/packages"));
        assert_eq!(args.packages_path_for(&spec), PathBuf::from("/ci/packages"));
    }

    #[test]
    fn test_fallback_folders() {
        let mut spec = PackageSpec::new("AppA", "/src/AppA/AppA.csproj");
        let args = RestoreArgs {
            fallback_folders: vec![PathBuf::from("/shared/fallback")],
            ..Default::default()
        };
        assert_eq!(args.fallback_folders_for(&spec), vec![PathBuf::from("/shared/fallback")]);

        spec.restore.fallback_folders = vec![PathBuf::from("/local/fallback")];
        assert_eq!(args.fallback_folders_for(&spec), vec![PathBuf::from("/local/fallback")]);
    }
}
