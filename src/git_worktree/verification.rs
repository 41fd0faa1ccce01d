//! Worktree verification operations.

use crate::error::{Result, RoverError};
use std::path::{Component, Path, PathBuf};

/// Check that `path` lies strictly inside `project_root`.
///
/// Relative paths are taken relative to the project root. `..` components are
/// resolved lexically, and when both paths exist on disk their canonical forms
/// are compared too, so a symlink cannot smuggle the worktree elsewhere.
/// Returns the normalized absolute path.
pub fn ensure_within_project_root(project_root: &Path, path: &Path) -> Result<PathBuf> {
    let root = normalize_lexically(project_root);
    let candidate = if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&root.join(path))
    };

    let outside = || {
        RoverError::Worktree(format!(
            "worktree path '{}' is outside the project root '{}'; refusing to use it",
            path.display(),
            project_root.display()
        ))
    };

    if candidate == root || !candidate.starts_with(&root) {
        return Err(outside());
    }

    if let (Ok(real_root), Ok(real_candidate)) = (root.canonicalize(), candidate.canonicalize())
        && (real_candidate == real_root || !real_candidate.starts_with(&real_root))
    {
        return Err(outside());
    }

    Ok(candidate)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_workspace_is_within_root() {
        let root = Path::new("/repo");
        let path = ensure_within_project_root(root, Path::new("/repo/.rover/tasks/7/workspace"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/repo/.rover/tasks/7/workspace"));
    }

    #[test]
    fn test_relative_path_resolves_against_root() {
        let root = Path::new("/repo");
        let path = ensure_within_project_root(root, Path::new(".rover/tasks/7/workspace")).unwrap();
        assert_eq!(path, PathBuf::from("/repo/.rover/tasks/7/workspace"));
    }

    #[test]
    fn test_outside_paths_are_rejected() {
        let root = Path::new("/repo");
        for bad in [
            "/tmp/workspace",
            "/repo-other/workspace",
            "/repo/.rover/../../etc",
            "/repo",
            "../outside",
        ] {
            let err = ensure_within_project_root(root, Path::new(bad)).unwrap_err();
            assert!(matches!(err, RoverError::Worktree(_)), "accepted {}", bad);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let project = tempfile::TempDir::new().unwrap();
        let elsewhere = tempfile::TempDir::new().unwrap();
        let link = project.path().join("workspace");
        std::os::unix::fs::symlink(elsewhere.path(), &link).unwrap();

        let err = ensure_within_project_root(project.path(), &link).unwrap_err();
        assert!(matches!(err, RoverError::Worktree(_)));
    }
}
