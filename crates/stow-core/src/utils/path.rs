//! Path helpers.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components lexically
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => match components.last().copied() {
                Some(Component::Normal(_)) => {
                    components.pop();
                },
                // Cannot climb above the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Directory containing a project file, used as its default output path
pub fn project_directory(project_path: &Path) -> PathBuf {
    match project_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_project_directory() {
        assert_eq!(
            project_directory(Path::new("/src/AppA/AppA.csproj")),
            PathBuf::from("/src/AppA")
        );
        assert_eq!(project_directory(Path::new("AppA.csproj")), PathBuf::from("."));
    }
}
