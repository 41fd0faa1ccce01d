//! Branch existence checks and deletion.

use crate::error::{Result, RoverError};
use crate::git::run_git;
use std::path::Path;

/// Check if a branch exists locally (`git show-ref --verify --quiet`).
pub fn branch_exists<P: AsRef<Path>>(repo_root: P, branch: &str) -> Result<bool> {
    let output = run_git(
        repo_root,
        &[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{}", branch),
        ],
    );
    Ok(output.is_ok())
}

/// Delete a branch.
///
/// Task branches are usually unmerged, so `force` (`-D`) is what cleanup uses.
pub fn delete_branch<P: AsRef<Path>>(repo_root: P, branch: &str, force: bool) -> Result<()> {
    let delete_flag = if force { "-D" } else { "-d" };

    run_git(repo_root, &["branch", delete_flag, branch]).map_err(|e| {
        RoverError::Worktree(format!("failed to delete branch '{}': {}", branch, e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;

    #[test]
    fn test_branch_exists() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        assert!(branch_exists(path, "main").unwrap());
        assert!(!branch_exists(path, "nonexistent").unwrap());
    }

    #[test]
    fn test_delete_unmerged_branch_needs_force() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        run_git(path, &["checkout", "-b", "rover-task-1-x"]).unwrap();
        std::fs::write(path.join("agent.txt"), "work\n").unwrap();
        crate::git::commit_all(path, "agent work").unwrap();
        run_git(path, &["checkout", "main"]).unwrap();

        let err = delete_branch(path, "rover-task-1-x", false).unwrap_err();
        assert!(matches!(err, RoverError::Worktree(_)));

        delete_branch(path, "rover-task-1-x", true).unwrap();
        assert!(!branch_exists(path, "rover-task-1-x").unwrap());
    }
}
