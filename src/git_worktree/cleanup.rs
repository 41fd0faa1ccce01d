//! Cleanup of task worktrees and branches.
//!
//! Cleanup always makes forward progress: every failure is logged and
//! recorded as a warning, and something already gone counts as removed.

use crate::error::{Result, RoverError};
use crate::git::run_git;
use std::path::Path;

use super::branch::{branch_exists, delete_branch};
use super::worktree::find_worktree_at;

/// What a cleanup pass managed to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub worktree_removed: bool,
    pub branch_deleted: bool,
    pub warnings: Vec<String>,
}

impl CleanupReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Remove a worktree with `git worktree remove --force`.
///
/// If git refuses, the directory is deleted from disk and
/// `git worktree prune` reconciles git's bookkeeping. Only fails when both
/// routes fail.
pub fn remove_worktree<P: AsRef<Path>>(repo_root: P, worktree_path: &Path) -> Result<()> {
    let repo_root = repo_root.as_ref();
    let worktree_str = worktree_path.to_string_lossy();

    let git_err = match run_git(repo_root, &["worktree", "remove", "--force", &worktree_str]) {
        Ok(_) => return Ok(()),
        Err(e) => e,
    };
    tracing::warn!(
        "git worktree remove failed for '{}', deleting directory instead: {}",
        worktree_str,
        git_err
    );

    if worktree_path.exists() {
        std::fs::remove_dir_all(worktree_path).map_err(|e| {
            RoverError::Worktree(format!(
                "failed to remove worktree '{}': {} (git: {})",
                worktree_str, e, git_err
            ))
        })?;
    }

    if let Err(e) = run_git(repo_root, &["worktree", "prune"]) {
        tracing::warn!("git worktree prune failed: {}", e);
    }

    Ok(())
}

/// Remove a task's worktree, then delete its branch.
///
/// Never fails. An absent worktree or branch is treated as removed.
pub fn cleanup_task_worktree<P: AsRef<Path>>(
    repo_root: P,
    branch: &str,
    worktree_path: Option<&Path>,
) -> CleanupReport {
    let repo_root = repo_root.as_ref();
    let mut report = CleanupReport::default();

    match worktree_path {
        Some(path) => {
            let registered = matches!(find_worktree_at(repo_root, path), Ok(Some(_)));
            if registered || path.exists() {
                match remove_worktree(repo_root, path) {
                    Ok(()) => report.worktree_removed = true,
                    Err(e) => report.warn(format!("worktree '{}' not removed: {}", path.display(), e)),
                }
            } else {
                report.worktree_removed = true;
            }
        }
        None => report.worktree_removed = true,
    }

    if branch.is_empty() {
        report.branch_deleted = true;
        return report;
    }

    match branch_exists(repo_root, branch) {
        Ok(false) => report.branch_deleted = true,
        Ok(true) => match delete_branch(repo_root, branch, true) {
            Ok(()) => report.branch_deleted = true,
            Err(e) => report.warn(format!("branch '{}' not deleted: {}", branch, e)),
        },
        Err(e) => report.warn(format!("could not check branch '{}': {}", branch, e)),
    }

    report
}
