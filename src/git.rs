//! Git command runner for rover.
//!
//! Provides a wrapper around git commands with captured stdout/stderr and
//! structured error handling. Git is a synchronous command-line collaborator:
//! every helper here returns plain strings or booleans.

use crate::error::{Result, RoverError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }
}

/// Run a git command with the specified working directory.
///
/// Non-zero exit codes are mapped to `RoverError::Worktree` carrying git's
/// stderr (or stdout when stderr is empty).
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();
    tracing::debug!(cwd = %cwd.display(), "git {}", shell_words::join(args));

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| {
            RoverError::Worktree(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(RoverError::Worktree(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// Not being inside a repository is a user error (exit 1), not a git failure.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let cwd = cwd.as_ref();

    let output = Command::new("git")
        .current_dir(cwd)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| {
            RoverError::UserError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    if !output.status.success() {
        return Err(RoverError::UserError(
            "not inside a git repository. Run this command from within a git repository."
                .to_string(),
        ));
    }

    let git_output = GitOutput::from_output(&output);
    Ok(PathBuf::from(git_output.stdout))
}

/// Get the main worktree path, even when invoked from inside a task worktree.
///
/// The first entry of `git worktree list --porcelain` is always the main one.
pub fn get_main_worktree<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let cwd = cwd.as_ref();
    let output = run_git(cwd, &["worktree", "list", "--porcelain"])?;

    for line in output.stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            return Ok(PathBuf::from(path));
        }
    }

    get_repo_root(cwd)
}

/// Check whether the working directory has any uncommitted changes,
/// untracked files included (agents frequently create new files).
pub fn has_uncommitted_changes<P: AsRef<Path>>(cwd: P) -> Result<bool> {
    let output = run_git(cwd, &["status", "--porcelain"])?;
    Ok(!output.is_empty())
}

/// Stage everything in `cwd` and commit it with `message`.
///
/// Returns `false` without committing when there is nothing to commit.
pub fn commit_all<P: AsRef<Path>>(cwd: P, message: &str) -> Result<bool> {
    let cwd = cwd.as_ref();
    if !has_uncommitted_changes(cwd)? {
        return Ok(false);
    }
    run_git(cwd, &["add", "-A"])?;
    run_git(cwd, &["commit", "-m", message])?;
    Ok(true)
}

/// Get the name of the branch checked out in `cwd`.
pub fn current_branch<P: AsRef<Path>>(cwd: P) -> Result<String> {
    Ok(run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?.stdout)
}

/// Merge `branch` into the branch checked out in `cwd` with a merge commit.
///
/// A conflicting merge is aborted so the project root is left as it was.
pub fn merge_branch<P: AsRef<Path>>(cwd: P, branch: &str, message: &str) -> Result<()> {
    let cwd = cwd.as_ref();
    if let Err(e) = run_git(cwd, &["merge", "--no-ff", "-m", message, branch]) {
        if let Err(abort_err) = run_git(cwd, &["merge", "--abort"]) {
            tracing::warn!("failed to abort merge of '{}': {}", branch, abort_err);
        }
        return Err(e);
    }
    Ok(())
}

/// Push `branch` to `remote`, setting upstream.
pub fn push_branch<P: AsRef<Path>>(cwd: P, remote: &str, branch: &str) -> Result<()> {
    run_git(cwd, &["push", "--set-upstream", remote, branch])?;
    Ok(())
}

/// Short diff summary of the working tree in `cwd` against HEAD.
pub fn diff_stat<P: AsRef<Path>>(cwd: P) -> Result<String> {
    Ok(run_git(cwd, &["diff", "--stat", "HEAD"])?.stdout)
}

/// Add `pattern` to the repository's `info/exclude`, which every worktree
/// shares. Returns whether the file changed.
pub fn ensure_excluded<P: AsRef<Path>>(repo_root: P, pattern: &str) -> Result<bool> {
    let repo_root = repo_root.as_ref();
    let common_dir = PathBuf::from(run_git(repo_root, &["rev-parse", "--git-common-dir"])?.stdout);
    let common_dir = if common_dir.is_absolute() {
        common_dir
    } else {
        repo_root.join(common_dir)
    };
    let exclude = common_dir.join("info").join("exclude");

    let existing = match std::fs::read_to_string(&exclude) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(RoverError::Worktree(format!(
                "failed to read '{}': {}",
                exclude.display(),
                e
            )));
        }
    };
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(false);
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(pattern);
    content.push('\n');
    crate::fs::atomic_write_file(&exclude, &content)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;
    use tempfile::TempDir;

    #[test]
    fn test_run_git_captures_stdout() {
        let temp_dir = create_test_repo();
        let output = run_git(temp_dir.path(), &["rev-parse", "--show-toplevel"]).unwrap();
        assert!(!output.stdout.is_empty());
    }

    #[test]
    fn test_run_git_failure_returns_worktree_error() {
        let temp_dir = create_test_repo();
        let err = run_git(temp_dir.path(), &["checkout", "nonexistent-branch"]).unwrap_err();
        assert!(matches!(err, RoverError::Worktree(_)));
    }

    #[test]
    fn test_get_repo_root_from_subdirectory() {
        let temp_dir = create_test_repo();
        let subdir = temp_dir.path().join("subdir").join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let root = get_repo_root(&subdir).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_get_repo_root_outside_repo_returns_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = get_repo_root(temp_dir.path()).unwrap_err();
        assert!(matches!(err, RoverError::UserError(_)));
        assert!(err.to_string().contains("not inside a git repository"));
    }

    #[test]
    fn test_has_uncommitted_changes_counts_untracked() {
        let temp_dir = create_test_repo();
        assert!(!has_uncommitted_changes(temp_dir.path()).unwrap());

        std::fs::write(temp_dir.path().join("new.txt"), "agent output\n").unwrap();
        assert!(has_uncommitted_changes(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_commit_all_commits_and_reports() {
        let temp_dir = create_test_repo();
        assert!(!commit_all(temp_dir.path(), "nothing").unwrap());

        std::fs::write(temp_dir.path().join("feature.rs"), "fn main() {}\n").unwrap();
        assert!(commit_all(temp_dir.path(), "Add feature").unwrap());
        assert!(!has_uncommitted_changes(temp_dir.path()).unwrap());

        let log = run_git(temp_dir.path(), &["log", "-1", "--format=%s"]).unwrap();
        assert_eq!(log.stdout, "Add feature");
    }

    #[test]
    fn test_merge_branch_creates_merge_commit() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        run_git(path, &["checkout", "-b", "feature"]).unwrap();
        std::fs::write(path.join("feature.txt"), "feature\n").unwrap();
        commit_all(path, "Feature work").unwrap();
        run_git(path, &["checkout", "main"]).unwrap();

        merge_branch(path, "feature", "Merge feature").unwrap();

        assert!(path.join("feature.txt").exists());
        assert_eq!(current_branch(path).unwrap(), "main");
        let parents = run_git(path, &["rev-list", "--parents", "-n", "1", "HEAD"]).unwrap();
        assert_eq!(parents.stdout.split_whitespace().count(), 3);
    }

    #[test]
    fn test_ensure_excluded_hides_rover_dir() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        std::fs::create_dir_all(path.join(".rover/tasks/1")).unwrap();
        std::fs::write(path.join(".rover/tasks/1/description.json"), "{}").unwrap();
        assert!(has_uncommitted_changes(path).unwrap());

        assert!(ensure_excluded(path, "/.rover/").unwrap());
        assert!(!ensure_excluded(path, "/.rover/").unwrap());

        assert!(!has_uncommitted_changes(path).unwrap());
    }
}
