//! Implementation of the `rover iterate` command.
//!
//! Appends iteration N+1 to a task. The new iteration records the previous
//! one's artifacts, any sandbox still running for the task is torn down and
//! a fresh one is started over the same worktree.

use super::{CommandContext, lock_task, require_worktree, title_from};
use crate::cli::IterateArgs;
use crate::error::{Result, RoverError};
use crate::iteration::IterationStore;
use crate::launch::start_iteration;
use serde_json::json;

pub fn cmd_iterate(cx: &CommandContext<'_>, args: IterateArgs) -> Result<()> {
    let instructions = args.instructions.trim();
    if instructions.is_empty() {
        return Err(RoverError::UserError(
            "iteration instructions cannot be empty".to_string(),
        ));
    }

    let (_lock, mut task) = lock_task(cx, args.task_id, "iterate")?;
    require_worktree(&task)?;
    let backend = cx.backend()?;

    let iterations = IterationStore::new(&cx.project, task.id());
    let latest = iterations.latest_number()?.unwrap_or(0);
    if latest > task.record.iterations {
        tracing::debug!(
            task_id = task.id(),
            recorded = task.record.iterations,
            latest,
            "iteration counter behind iteration directories"
        );
        task.record.iterations = latest;
    }
    let number = task.increment_iteration()?;

    let title = match args.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => title_from(instructions),
    };
    let iteration = iterations.create(number, &title, instructions)?;

    let builder = cx.spec_builder(backend.reader())?;
    let launched = start_iteration(&mut task, &iteration, &builder, backend.manager())?;

    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "iteration": number,
        "title": iteration.title,
        "status": task.record.status,
        "sandbox": launched.name,
    });
    cx.out.emit(&doc, || {
        println!("Task {}: iteration {} started ({})", task.id(), number, iteration.title);
        println!("  Sandbox: {}", launched.name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::Project;
    use crate::locks::acquire_task_lock;
    use crate::sandbox::sandbox_name;
    use crate::task::TaskStatus;
    use crate::test_support::SandboxCall;

    fn args(task_id: u64, instructions: &str) -> IterateArgs {
        IterateArgs {
            task_id,
            instructions: instructions.to_string(),
            title: None,
        }
    }

    #[test]
    fn test_iterate_replaces_previous_sandbox() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let cx = project.cx();

        cmd_iterate(&cx, args(task.id(), "Also return the version")).unwrap();

        let task = cx.load_task(task.id()).unwrap();
        assert_eq!(task.record.iterations, 2);
        assert_eq!(task.record.status, TaskStatus::Iterating);
        assert_eq!(task.record.container_id.as_deref(), Some("fake-rover-task-1-2"));

        let calls = project.fake.calls();
        let first = format!("fake-{}", sandbox_name(1, 1));
        let second = sandbox_name(1, 2);
        assert_eq!(
            calls[2..],
            [
                SandboxCall::Stop(first.clone()),
                SandboxCall::Remove(first),
                SandboxCall::Create(second.clone()),
                SandboxCall::Start(second),
            ]
        );
    }

    #[test]
    fn test_iteration_carries_previous_artifacts() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let cx = project.cx();
        let store = IterationStore::new(&cx.project, task.id());
        std::fs::write(store.iteration_dir(1).join("summary.md"), "Added /health").unwrap();

        cmd_iterate(&cx, args(task.id(), "Also return the version")).unwrap();

        let second = store.load(2).unwrap();
        assert_eq!(second.previous_context.summary.as_deref(), Some("Added /health"));
        assert_eq!(second.previous_context.iteration_number, Some(1));

        let spec = project.fake.specs().pop().unwrap();
        assert!(spec.args.contains(&"--pre-context-file".to_string()));
    }

    #[test]
    fn test_counter_catches_up_with_directories() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let cx = project.cx();
        let store = IterationStore::new(&cx.project, task.id());
        store.create(2, "out of band", "made by hand").unwrap();

        cmd_iterate(&cx, args(task.id(), "Next")).unwrap();

        assert_eq!(cx.load_task(task.id()).unwrap().record.iterations, 3);
        assert_eq!(store.latest_number().unwrap(), Some(3));
    }

    #[test]
    fn test_locked_task_is_rejected() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let cx = project.cx();
        let _held = acquire_task_lock(&cx.project, task.id(), "merge").unwrap();

        let err = cmd_iterate(&cx, args(task.id(), "Next")).unwrap_err();
        assert!(matches!(err, RoverError::Lock(_)));
    }

    #[test]
    fn test_missing_worktree_is_reported() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let cx = project.cx();
        std::fs::remove_dir_all(task.worktree().unwrap()).unwrap();

        let err = cmd_iterate(&cx, args(task.id(), "Next")).unwrap_err();
        assert!(matches!(err, RoverError::Worktree(_)));
        assert_eq!(cx.load_task(task.id()).unwrap().record.iterations, 1);
    }
}
