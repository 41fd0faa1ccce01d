//! Project context resolution for rover.
//!
//! Finds the git project root from any working directory (including from
//! inside a task worktree) and derives the on-disk layout:
//!
//! ```text
//! <project>/.rover/
//!   config.yaml
//!   tasks/<id>/
//!     description.json
//!     .lock
//!     workspace/                  (git worktree)
//!     iterations/<n>/
//!       iteration.json  status.json  plan.md  changes.md  summary.md
//!       sandbox/                  (host-side support files mounted into the container)
//! ```

use crate::error::{Result, RoverError};
use crate::git;
use std::env;
use std::path::{Path, PathBuf};

/// Directory under the project root holding all rover state.
pub const ROVER_DIR: &str = ".rover";

/// Resolved paths for a rover project. All paths are absolute.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Absolute path to the main git worktree.
    pub project_root: PathBuf,

    /// `{project_root}/.rover`
    pub rover_dir: PathBuf,

    /// `{project_root}/.rover/tasks`
    pub tasks_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve the project context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            RoverError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the project context from a specific directory.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();
        let toplevel = git::get_repo_root(cwd)?;

        let project_root = match git::get_main_worktree(cwd) {
            Ok(main) if main.exists() => main,
            _ => toplevel,
        };

        Ok(Self::at(project_root))
    }

    /// Build a context for a known project root without consulting git.
    pub fn at(project_root: PathBuf) -> Self {
        let rover_dir = project_root.join(ROVER_DIR);
        let tasks_dir = rover_dir.join("tasks");
        Self {
            project_root,
            rover_dir,
            tasks_dir,
        }
    }

    /// Path to the project configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.rover_dir.join("config.yaml")
    }

    /// Directory holding a project's custom workflow definitions.
    pub fn workflows_dir(&self) -> PathBuf {
        self.rover_dir.join("workflows")
    }

    /// Directory for a single task.
    pub fn task_dir(&self, task_id: u64) -> PathBuf {
        self.tasks_dir.join(task_id.to_string())
    }

    /// Conventional worktree location for a task.
    pub fn task_workspace_path(&self, task_id: u64) -> PathBuf {
        self.task_dir(task_id).join("workspace")
    }

    /// Directory holding a task's iterations.
    pub fn iterations_dir(&self, task_id: u64) -> PathBuf {
        self.task_dir(task_id).join("iterations")
    }

    /// Directory for one iteration of a task.
    pub fn iteration_dir(&self, task_id: u64, number: u32) -> PathBuf {
        self.iterations_dir(task_id).join(number.to_string())
    }

    /// Advisory lock file for a task.
    pub fn task_lock_path(&self, task_id: u64) -> PathBuf {
        self.task_dir(task_id).join(".lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_from_repo_root() {
        let temp_dir = create_test_repo();
        let ctx = ProjectContext::resolve_from(temp_dir.path()).unwrap();

        assert_eq!(
            ctx.project_root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
        assert!(ctx.rover_dir.ends_with(".rover"));
        assert!(ctx.tasks_dir.ends_with(".rover/tasks"));
    }

    #[test]
    fn test_resolve_outside_repo_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = ProjectContext::resolve_from(temp_dir.path()).unwrap_err();
        assert!(matches!(err, RoverError::UserError(_)));
    }

    #[test]
    fn test_resolve_from_task_worktree_returns_main_root() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();
        let worktree = path.join(".rover/tasks/7/workspace");

        let status = Command::new("git")
            .current_dir(path)
            .args(["worktree", "add"])
            .arg(&worktree)
            .args(["-b", "rover-task-7-abc"])
            .status()
            .unwrap();
        assert!(status.success());

        let ctx = ProjectContext::resolve_from(&worktree).unwrap();
        assert_eq!(
            ctx.project_root.canonicalize().unwrap(),
            path.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_layout_paths() {
        let ctx = ProjectContext::at(PathBuf::from("/repo"));
        assert_eq!(
            ctx.task_workspace_path(7),
            PathBuf::from("/repo/.rover/tasks/7/workspace")
        );
        assert_eq!(
            ctx.iteration_dir(7, 2),
            PathBuf::from("/repo/.rover/tasks/7/iterations/2")
        );
        assert_eq!(ctx.config_path(), PathBuf::from("/repo/.rover/config.yaml"));
        assert_eq!(
            ctx.task_lock_path(3),
            PathBuf::from("/repo/.rover/tasks/3/.lock")
        );
    }
}
