//! Git worktree provisioning for rover tasks.
//!
//! Every task gets its own worktree at `.rover/tasks/<id>/workspace` on a
//! dedicated `rover-task-<id>-<suffix>` branch, so the agent's edits never
//! touch the user's checkout:
//!
//! - Naming task branches (caller-supplied or random suffix)
//! - Keeping worktree paths inside the project root
//! - Creating worktrees together with their branch
//! - Removing worktrees and branches, falling back to a filesystem delete
//!
//! Git failures are `RoverError::Worktree` (exit code 3). Cleanup never fails:
//! it reports warnings instead.

mod branch;
mod cleanup;
mod naming;
mod verification;
mod worktree;

pub use branch::{branch_exists, delete_branch};
pub use cleanup::{CleanupReport, cleanup_task_worktree, remove_worktree};
pub use naming::{random_suffix, sanitize_slug, task_branch_name};
pub use verification::ensure_within_project_root;
pub use worktree::{
    ExistingWorktree, WorktreeInfo, create_worktree, find_worktree_at, list_worktrees,
    provision_task_worktree,
};
