//! Implementation of the `rover delete` command.
//!
//! Deletion always makes forward progress: a missing backend, a sandbox
//! that will not stop, or a worktree git refuses to remove only produce
//! warnings. The task directory is removed last.

use super::{CommandContext, lock_task};
use crate::cli::DeleteArgs;
use crate::error::Result;
use crate::git_worktree::cleanup_task_worktree;
use crate::sandbox::sandbox_name;
use serde_json::json;

pub fn cmd_delete(cx: &CommandContext<'_>, args: DeleteArgs) -> Result<()> {
    let (lock, task) = lock_task(cx, args.task_id, "delete")?;
    let mut warnings = Vec::new();

    let target = task
        .record
        .container_id
        .clone()
        .unwrap_or_else(|| sandbox_name(task.id(), task.record.iterations));
    match cx.backend() {
        Ok(backend) => {
            let report = backend.stop_and_remove(&target);
            if !report.removed {
                warnings.push(format!("sandbox '{}' may still exist", target));
            }
        }
        Err(e) => {
            tracing::warn!(task_id = task.id(), "skipping sandbox teardown: {}", e);
            warnings.push(format!("sandbox not removed: {}", e));
        }
    }

    let report = cleanup_task_worktree(
        &cx.project.project_root,
        &task.record.branch_name,
        task.worktree(),
    );
    warnings.extend(report.warnings);

    cx.store().delete(task.id())?;
    // The lock file went with the task directory.
    lock.release()?;
    tracing::info!(task_id = task.id(), "deleted task");

    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "warnings": warnings,
    });
    cx.out.emit(&doc, || {
        println!("Task {} deleted", task.id());
        for warning in &warnings {
            println!("  warning: {}", warning);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::Project;
    use crate::error::RoverError;
    use crate::output::Output;
    use crate::git_worktree::branch_exists;
    use crate::test_support::{FakeSandbox, SandboxCall};

    #[test]
    fn test_delete_removes_everything() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let branch = task.record.branch_name.clone();
        let worktree = task.worktree().unwrap().to_path_buf();
        let cx = project.cx();

        cmd_delete(&cx, DeleteArgs { task_id: task.id() }).unwrap();

        let removed = SandboxCall::Remove("fake-rover-task-1-1".to_string());
        assert!(project.fake.calls().contains(&removed));
        assert!(!worktree.exists());
        assert!(!branch_exists(project.repo.path(), &branch).unwrap());
        assert!(!cx.project.task_dir(task.id()).exists());
        assert!(matches!(cx.load_task(task.id()), Err(RoverError::NotFound(_))));
    }

    #[test]
    fn test_delete_without_backend() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let fake = FakeSandbox::new().unavailable();
        let cx = CommandContext::for_project(project.cx().project, Output::new(true, 0), &fake).unwrap();

        cmd_delete(&cx, DeleteArgs { task_id: task.id() }).unwrap();

        assert!(!cx.project.task_dir(task.id()).exists());
    }

    #[test]
    fn test_delete_with_worktree_already_gone() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        std::fs::remove_dir_all(task.worktree().unwrap()).unwrap();
        let cx = project.cx();

        cmd_delete(&cx, DeleteArgs { task_id: task.id() }).unwrap();

        assert!(!cx.project.task_dir(task.id()).exists());
    }

    #[test]
    fn test_next_task_id_after_delete() {
        let project = Project::new();
        project.started_task("first");
        let second = project.started_task("second");
        let cx = project.cx();

        cmd_delete(&cx, DeleteArgs { task_id: second.id() }).unwrap();

        assert_eq!(cx.store().next_id().unwrap(), 2);
    }
}
