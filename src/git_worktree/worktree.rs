//! Worktree creation, listing, and provisioning.

use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use crate::git::run_git;
use std::path::{Path, PathBuf};

use super::branch::branch_exists;
use super::naming::{random_suffix, task_branch_name};
use super::verification::ensure_within_project_root;

/// Attempts at finding an unused random branch suffix.
const MAX_SUFFIX_ATTEMPTS: usize = 5;

/// Result of provisioning a task worktree.
#[derive(Debug, Clone)]
pub struct WorktreeInfo {
    /// Absolute path to the worktree directory.
    pub path: PathBuf,
    /// Name of the task branch.
    pub branch: String,
    /// Whether the worktree already existed.
    pub reused: bool,
}

/// Information about an existing worktree.
#[derive(Debug, Clone)]
pub struct ExistingWorktree {
    pub path: PathBuf,
    /// Branch the worktree is on (`None` when detached).
    pub branch: Option<String>,
    pub head_sha: String,
}

/// List all worktrees in the repository.
pub fn list_worktrees<P: AsRef<Path>>(repo_root: P) -> Result<Vec<ExistingWorktree>> {
    let output = run_git(repo_root, &["worktree", "list", "--porcelain"])?;

    let mut worktrees = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_head: Option<String> = None;
    let mut current_branch: Option<String> = None;

    for line in output.stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let (Some(path), Some(head)) = (current_path.take(), current_head.take()) {
                worktrees.push(ExistingWorktree {
                    path,
                    branch: current_branch.take(),
                    head_sha: head,
                });
            }
            current_branch = None;
            current_path = Some(PathBuf::from(path));
        } else if let Some(sha) = line.strip_prefix("HEAD ") {
            current_head = Some(sha.to_string());
        } else if let Some(branch_ref) = line.strip_prefix("branch ") {
            current_branch = branch_ref.strip_prefix("refs/heads/").map(String::from);
        } else if line == "detached" {
            current_branch = None;
        }
    }

    if let (Some(path), Some(head)) = (current_path, current_head) {
        worktrees.push(ExistingWorktree {
            path,
            branch: current_branch,
            head_sha: head,
        });
    }

    Ok(worktrees)
}

/// Find the registered worktree at `path`, if any.
pub fn find_worktree_at<P: AsRef<Path>>(
    repo_root: P,
    path: &Path,
) -> Result<Option<ExistingWorktree>> {
    Ok(list_worktrees(repo_root)?
        .into_iter()
        .find(|wt| paths_equivalent(&wt.path, path)))
}

/// Create a worktree at `worktree_path` on a new branch `branch` off HEAD.
///
/// Runs `git worktree add <path> -b <branch>`.
pub fn create_worktree<P: AsRef<Path>>(
    repo_root: P,
    worktree_path: &Path,
    branch: &str,
) -> Result<()> {
    let worktree_str = worktree_path.to_string_lossy();

    if let Some(parent) = worktree_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            RoverError::Worktree(format!(
                "failed to create task directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    run_git(repo_root, &["worktree", "add", &worktree_str, "-b", branch]).map_err(|e| {
        RoverError::Worktree(format!(
            "failed to create worktree at '{}' on branch '{}': {}",
            worktree_str, branch, e
        ))
    })?;

    Ok(())
}

/// Create, or reuse, the worktree for task `task_id`.
///
/// The worktree lives at `.rover/tasks/<id>/workspace`. With a `suffix` the
/// branch name is fixed and an existing branch of that name is an error;
/// without one, random suffixes are tried until an unused name is found.
pub fn provision_task_worktree(
    ctx: &ProjectContext,
    task_id: u64,
    suffix: Option<&str>,
) -> Result<WorktreeInfo> {
    let worktree_path =
        ensure_within_project_root(&ctx.project_root, &ctx.task_workspace_path(task_id))?;

    if let Some(existing) = find_worktree_at(&ctx.project_root, &worktree_path)? {
        let branch = existing.branch.ok_or_else(|| {
            RoverError::Worktree(format!(
                "worktree '{}' is in detached HEAD state; check out its task branch and retry",
                worktree_path.display()
            ))
        })?;
        tracing::debug!(task_id, branch = %branch, "reusing existing worktree");
        return Ok(WorktreeInfo {
            path: worktree_path,
            branch,
            reused: true,
        });
    }

    if worktree_path.exists() {
        return Err(RoverError::Worktree(format!(
            "path '{}' already exists but is not a registered worktree.\n\n\
             Remove the directory manually and try again:\n\
             rm -rf {}",
            worktree_path.display(),
            worktree_path.display()
        )));
    }

    let branch = pick_branch_name(&ctx.project_root, task_id, suffix)?;
    create_worktree(&ctx.project_root, &worktree_path, &branch)?;
    tracing::info!(task_id, branch = %branch, path = %worktree_path.display(), "created worktree");

    Ok(WorktreeInfo {
        path: worktree_path,
        branch,
        reused: false,
    })
}

fn pick_branch_name(repo_root: &Path, task_id: u64, suffix: Option<&str>) -> Result<String> {
    if let Some(suffix) = suffix {
        let branch = task_branch_name(task_id, suffix);
        if branch_exists(repo_root, &branch)? {
            return Err(RoverError::Worktree(format!(
                "branch '{}' already exists; choose a different suffix",
                branch
            )));
        }
        return Ok(branch);
    }

    for _ in 0..MAX_SUFFIX_ATTEMPTS {
        let branch = task_branch_name(task_id, &random_suffix());
        if !branch_exists(repo_root, &branch)? {
            return Ok(branch);
        }
    }

    Err(RoverError::Worktree(format!(
        "could not find an unused branch name for task {}",
        task_id
    )))
}

/// Check if two paths are equivalent (handling symlinks).
fn paths_equivalent(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a_canon), Ok(b_canon)) => a_canon == b_canon,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;

    fn ctx_for(path: &Path) -> ProjectContext {
        ProjectContext::at(path.canonicalize().unwrap())
    }

    #[test]
    fn test_list_worktrees_includes_main() {
        let temp_dir = create_test_repo();
        let worktrees = list_worktrees(temp_dir.path()).unwrap();
        assert_eq!(worktrees.len(), 1);
        assert_eq!(worktrees[0].branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_create_worktree_makes_branch() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let worktree_path = path.join(".rover/tasks/1/workspace");

        create_worktree(path, &worktree_path, "rover-task-1-abc").unwrap();

        assert!(worktree_path.join("README.md").exists());
        assert!(branch_exists(path, "rover-task-1-abc").unwrap());
        let found = find_worktree_at(path, &worktree_path).unwrap().unwrap();
        assert_eq!(found.branch.as_deref(), Some("rover-task-1-abc"));
    }

    #[test]
    fn test_provision_with_suffix() {
        let temp_dir = create_test_repo();
        let ctx = ctx_for(temp_dir.path());

        let info = provision_task_worktree(&ctx, 7, Some("abc123")).unwrap();

        assert!(!info.reused);
        assert_eq!(info.branch, "rover-task-7-abc123");
        assert_eq!(info.path, ctx.task_workspace_path(7));
        assert_eq!(crate::git::current_branch(&info.path).unwrap(), info.branch);
    }

    #[test]
    fn test_provision_reuses_existing_worktree() {
        let temp_dir = create_test_repo();
        let ctx = ctx_for(temp_dir.path());

        let first = provision_task_worktree(&ctx, 3, None).unwrap();
        let second = provision_task_worktree(&ctx, 3, None).unwrap();

        assert!(second.reused);
        assert_eq!(second.branch, first.branch);
        assert_eq!(second.path, first.path);
    }

    #[test]
    fn test_provision_rejects_taken_suffix() {
        let temp_dir = create_test_repo();
        let ctx = ctx_for(temp_dir.path());
        run_git(&ctx.project_root, &["branch", "rover-task-4-taken"]).unwrap();

        let err = provision_task_worktree(&ctx, 4, Some("taken")).unwrap_err();
        assert!(matches!(err, RoverError::Worktree(_)));
        assert!(!ctx.task_workspace_path(4).exists());
    }

    #[test]
    fn test_provision_rejects_stray_directory() {
        let temp_dir = create_test_repo();
        let ctx = ctx_for(temp_dir.path());
        std::fs::create_dir_all(ctx.task_workspace_path(5)).unwrap();

        let err = provision_task_worktree(&ctx, 5, None).unwrap_err();
        assert!(err.to_string().contains("not a registered worktree"));
    }
}
