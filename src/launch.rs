//! Starting the sandbox for a task iteration.
//!
//! This is the one place where records, worktree, spec builder and backend
//! meet: any previous sandbox is torn down, the spec is built (which checks
//! the worktree before the backend is touched), the container is created
//! and started, and the task records what happened.

use crate::error::{Result, RoverError};
use crate::iteration::Iteration;
use crate::sandbox::{ContainerSpecBuilder, SandboxManager};
use crate::task::Task;

/// Outcome of a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub container_id: String,
    pub name: String,
}

/// Tear down the sandbox a task last recorded, if any. Never fails.
pub fn teardown_previous(task: &mut Task, manager: &dyn SandboxManager) {
    let Some(previous) = task.record.container_id.clone() else {
        return;
    };
    let report = manager.stop_and_remove(&previous);
    tracing::info!(
        task_id = task.id(),
        container = %previous,
        stopped = report.stopped,
        removed = report.removed,
        "previous sandbox torn down"
    );
    if let Err(e) = task.clear_container() {
        tracing::warn!(task_id = task.id(), "failed to clear container info: {}", e);
    }
}

/// Run `iteration` of `task` in a new sandbox.
///
/// A failed create or start marks the task FAILED before the error is
/// returned. A container whose start failed is not removed.
pub fn start_iteration(
    task: &mut Task,
    iteration: &Iteration,
    builder: &ContainerSpecBuilder<'_>,
    manager: &dyn SandboxManager,
) -> Result<Launched> {
    if iteration.task_id != task.id() {
        return Err(RoverError::UserError(format!(
            "iteration {} belongs to task {}, not task {}",
            iteration.number,
            iteration.task_id,
            task.id()
        )));
    }

    let spec = builder.build(task, iteration)?;
    teardown_previous(task, manager);

    let container_id = match manager.create_and_start(&spec) {
        Ok(id) => id,
        Err(e) => {
            if let Err(save_err) = task.update_execution_status("failed", Some(&e.to_string())) {
                tracing::warn!(task_id = task.id(), "failed to record failure: {}", save_err);
            }
            return Err(e);
        }
    };

    task.set_container_info(&container_id, "running")?;
    if iteration.number <= 1 {
        task.mark_in_progress()?;
    } else {
        task.mark_iterating()?;
    }

    Ok(Launched {
        container_id,
        name: spec.name,
    })
}
