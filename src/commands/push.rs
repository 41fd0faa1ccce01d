//! Implementation of the `rover push` command.

use super::merge::{default_commit_message, ensure_settled};
use super::{CommandContext, lock_task, require_worktree};
use crate::cli::PushArgs;
use crate::error::Result;
use crate::git;
use serde_json::json;

/// Commit pending worktree changes and push the task branch to the
/// configured remote, then mark the task PUSHED.
pub fn cmd_push(cx: &CommandContext<'_>, args: PushArgs) -> Result<()> {
    let (_lock, mut task) = lock_task(cx, args.task_id, "push")?;
    ensure_settled(&task, "push")?;
    let worktree = require_worktree(&task)?;

    let message = args.message.unwrap_or_else(|| default_commit_message(&task));
    let committed = git::commit_all(&worktree, &message)?;

    let remote = &cx.config.git.remote;
    let branch = task.record.branch_name.clone();
    git::push_branch(&worktree, remote, &branch)?;
    task.mark_pushed()?;
    tracing::info!(task_id = task.id(), remote = %remote, branch = %branch, "pushed task branch");

    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "remote": remote,
        "branch": branch,
        "committed": committed,
        "status": task.record.status,
    });
    cx.out.emit(&doc, || {
        println!("Task {}: pushed '{}' to {}", task.id(), branch, remote);
    })
}
