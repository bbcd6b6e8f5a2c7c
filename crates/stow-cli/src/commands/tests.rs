//! Unit tests for CLI commands.

use super::*;
use crate::output::OutputHandler;
use std::fs;
use std::time::Duration;
use stow_core::{PackageSpec, ProjectReference, VersionRange};
use stow_lockfile::LockFile;
use stow_resolver::{DependencyGraphSpec, ProjectRestoreResult, RestoreBatchResult, RestoreOutcome};
use tempfile::TempDir;

fn create_test_context(temp_dir: &TempDir) -> CommandContext {
    CommandContext {
        cwd: temp_dir.path().to_path_buf(),
        output: OutputHandler::plain(),
    }
}

fn write_feed(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("foo.json"),
        r#"{ "id": "Foo", "versions": [ { "version": "1.0.0" }, { "version": "1.3.0" }, { "version": "2.0.0" } ] }"#,
    )
    .unwrap();
}

fn write_graph(root: &Path) -> PathBuf {
    let mut app = PackageSpec::new("AppA", root.join("src/AppA/AppA.csproj"));
    app.add_package_dependency("net8.0", "Foo", VersionRange::parse("[1.0.0, 2.0.0)").unwrap());
    app.add_project_reference("net8.0", "Lib", ProjectReference::default());
    let mut lib = PackageSpec::new("Lib", root.join("src/Lib/Lib.csproj"));
    lib.add_framework("net8.0");

    let mut graph = DependencyGraphSpec::new();
    graph.add_project(app).unwrap();
    graph.add_project(lib).unwrap();
    graph.add_restore("AppA");

    let path = root.join("graph.json");
    graph.save(&path).unwrap();
    path
}

#[test]
fn test_resolve_relative_paths() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);

    assert_eq!(ctx.resolve(Path::new("graph.json")), temp_dir.path().join("graph.json"));
    assert_eq!(ctx.resolve(Path::new("/abs/graph.json")), Path::new("/abs/graph.json"));
}

#[tokio::test]
async fn test_restore_command() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);
    let feed = temp_dir.path().join("feed");
    write_feed(&feed);
    write_graph(temp_dir.path());

    let overrides = CliOverrides {
        sources: vec![feed.display().to_string()],
        packages: Some(temp_dir.path().join("packages")),
        max_parallel: Some(2),
        ..Default::default()
    };
    let succeeded = restore::execute(Path::new("graph.json"), &overrides, &ctx).await.unwrap();

    assert!(succeeded);
    let lock = LockFile::load(&temp_dir.path().join("src/AppA/AppA.stow.lock.json")).unwrap();
    assert_eq!(lock.resolved_version("net8.0", "Foo").map(|v| v.to_string()), Some("1.3.0".to_string()));
}

#[tokio::test]
async fn test_restore_missing_graph() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);

    let err = restore::execute(Path::new("missing.json"), &CliOverrides::default(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, StowError::Io { .. }));
}

#[tokio::test]
async fn test_closure_command() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&temp_dir);
    let graph_path = write_graph(temp_dir.path());

    assert!(closure::execute(&graph_path, "AppA", &ctx).await.unwrap());

    let graph = DependencyGraphSpec::load(&graph_path).unwrap();
    let lines = closure::closure_lines(&graph, "AppA").unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("AppA  "));
    assert!(lines[1].starts_with("Lib   "));
    assert!(lines[1].ends_with("Lib.csproj"));

    let err = closure::closure_lines(&graph, "Nope").unwrap_err();
    assert!(matches!(err, StowError::UnknownRestoreRoot { .. }));
}

#[test]
fn test_result_descriptions() {
    let restored = ProjectRestoreResult {
        project: "AppA".to_string(),
        outcome: RestoreOutcome::Restored,
        diagnostics: Vec::new(),
        lock_file_path: Some(PathBuf::from("/src/AppA/AppA.stow.lock.json")),
    };
    assert_eq!(
        restore::describe_result(&restored),
        "AppA restored (/src/AppA/AppA.stow.lock.json)"
    );

    let reused = ProjectRestoreResult {
        project: "ToolB".to_string(),
        outcome: RestoreOutcome::Reused {
            representative: "ToolA".to_string(),
        },
        diagnostics: Vec::new(),
        lock_file_path: None,
    };
    assert_eq!(restore::describe_result(&reused), "ToolB shares the restore of ToolA");

    let batch = RestoreBatchResult {
        results: vec![restored, reused],
        elapsed: Duration::from_millis(1500),
    };
    assert_eq!(restore::summary_line(&batch), "2 project(s) in 1.50s: 0 up to date, 0 failed");
}
