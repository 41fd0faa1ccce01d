//! Implementation of the `rover merge` command.
//!
//! 1. Refuse while the task's agent is still running
//! 2. Refuse when the project root has uncommitted changes
//! 3. Commit whatever the agent left uncommitted in the worktree
//! 4. Merge the task branch into the project root's current branch (`--no-ff`)
//! 5. Mark the task MERGED
//!
//! A conflicting merge is aborted and the task keeps its status.

use super::{CommandContext, lock_task, require_worktree};
use crate::cli::MergeArgs;
use crate::error::{Result, RoverError};
use crate::git;
use crate::task::Task;
use serde_json::json;

pub fn cmd_merge(cx: &CommandContext<'_>, args: MergeArgs) -> Result<()> {
    let (_lock, mut task) = lock_task(cx, args.task_id, "merge")?;
    ensure_settled(&task, "merge")?;
    let worktree = require_worktree(&task)?;
    let root = &cx.project.project_root;

    if git::has_uncommitted_changes(root)? {
        return Err(RoverError::UserError(format!(
            "'{}' has uncommitted changes. Commit or stash them before merging.",
            root.display()
        )));
    }

    let message = args.message.unwrap_or_else(|| default_commit_message(&task));
    let committed = git::commit_all(&worktree, &message)?;
    if committed {
        tracing::info!(task_id = task.id(), "committed pending worktree changes");
    }

    let target = git::current_branch(root)?;
    let branch = task.record.branch_name.clone();
    git::merge_branch(
        root,
        &branch,
        &format!("Merge task {}: {}", task.id(), task.record.title),
    )?;
    task.mark_merged()?;

    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "branch": branch,
        "into": target,
        "committed": committed,
        "status": task.record.status,
    });
    cx.out.emit(&doc, || {
        println!("Task {}: merged '{}' into '{}'", task.id(), branch, target);
    })
}

/// Merge and push operate on finished work only.
pub(super) fn ensure_settled(task: &Task, action: &str) -> Result<()> {
    if task.record.status.is_active() {
        return Err(RoverError::UserError(format!(
            "task {} is still {}. Wait for it to finish or run `rover stop {}` before you {}.",
            task.id(),
            task.record.status,
            task.id(),
            action
        )));
    }
    if task.record.branch_name.is_empty() {
        return Err(RoverError::UserError(format!(
            "task {} has no branch to {}",
            task.id(),
            action
        )));
    }
    Ok(())
}

pub(super) fn default_commit_message(task: &Task) -> String {
    format!("rover: task {} - {}", task.id(), task.record.title)
}
