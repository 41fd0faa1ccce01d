//! Implementation of the `rover stop` command.
//!
//! Stops and removes the task's current sandbox. A task that was still
//! running is marked FAILED, since its iteration never finished. With
//! `--remove-all` the worktree and task branch are removed as well; those
//! failures are reported as warnings.

use super::{CommandContext, lock_task};
use crate::cli::StopArgs;
use crate::error::Result;
use crate::git_worktree::cleanup_task_worktree;
use crate::sandbox::sandbox_name;
use serde_json::json;

pub const STOPPED_BY_USER: &str = "stopped by user";

pub fn cmd_stop(cx: &CommandContext<'_>, args: StopArgs) -> Result<()> {
    let (_lock, mut task) = lock_task(cx, args.task_id, "stop")?;
    let backend = cx.backend()?;

    let target = task
        .record
        .container_id
        .clone()
        .unwrap_or_else(|| sandbox_name(task.id(), task.record.iterations));
    let teardown = backend.stop_and_remove(&target);
    task.clear_container()?;

    if task.record.status.is_active() {
        task.record.execution_status = Some("stopped".to_string());
        task.mark_failed(STOPPED_BY_USER)?;
    }

    let mut warnings = Vec::new();
    if args.remove_all {
        let report = cleanup_task_worktree(
            &cx.project.project_root,
            &task.record.branch_name,
            task.worktree(),
        );
        if report.worktree_removed {
            task.record.worktree_path.clear();
        }
        if report.branch_deleted {
            task.record.branch_name.clear();
        }
        task.save()?;
        warnings = report.warnings;
    }

    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "status": task.record.status,
        "sandbox": target,
        "stopped": teardown.stopped,
        "removed": teardown.removed,
        "warnings": warnings,
    });
    cx.out.emit(&doc, || {
        println!("Task {}: sandbox {} stopped", task.id(), target);
        if args.remove_all {
            println!("  Worktree and branch removed");
        }
        for warning in &warnings {
            println!("  warning: {}", warning);
        }
    })
}
