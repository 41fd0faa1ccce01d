//! Implementation of the `rover interactive` command.
//!
//! Runs the agent for the task's current iteration attached to the
//! terminal, with the same mounts and identity as a background run. The
//! task lock is held while the spec is built and released before attaching,
//! so other commands keep working during a long session.

use super::{CommandContext, lock_task, require_worktree};
use crate::cli::InteractiveArgs;
use crate::error::Result;
use crate::iteration::IterationStore;

pub fn cmd_interactive(cx: &CommandContext<'_>, args: InteractiveArgs) -> Result<i32> {
    let (lock, task) = lock_task(cx, args.task_id, "interactive")?;
    require_worktree(&task)?;
    let backend = cx.backend()?;

    if task.record.status.is_active() {
        tracing::warn!(
            task_id = task.id(),
            "task {} still has a running sandbox; both will write to the same worktree",
            task.id()
        );
    }

    let iteration = IterationStore::new(&cx.project, task.id()).load(task.record.iterations)?;
    let spec = cx.spec_builder(backend.reader())?.build(&task, &iteration)?;
    lock.release()?;

    let prompt = args.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty());
    backend.run_interactive(&spec, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::Project;
    use crate::error::RoverError;
    use crate::sandbox::sandbox_name;
    use crate::test_support::SandboxCall;

    #[test]
    fn test_interactive_runs_current_iteration() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        let cx = project.cx();

        let code = cmd_interactive(
            &cx,
            InteractiveArgs {
                task_id: task.id(),
                prompt: Some("start with the tests".to_string()),
            },
        )
        .unwrap();

        assert_eq!(code, 0);
        assert_eq!(
            project.fake.calls().last(),
            Some(&SandboxCall::RunInteractive(
                sandbox_name(task.id(), 1),
                Some("start with the tests".to_string())
            ))
        );
        assert!(!cx.project.task_lock_path(task.id()).exists());
    }

    #[test]
    fn test_blank_prompt_is_dropped() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");

        cmd_interactive(
            &project.cx(),
            InteractiveArgs {
                task_id: task.id(),
                prompt: Some("  ".to_string()),
            },
        )
        .unwrap();

        assert_eq!(
            project.fake.calls().last(),
            Some(&SandboxCall::RunInteractive(sandbox_name(task.id(), 1), None))
        );
    }

    #[test]
    fn test_missing_worktree_never_reaches_backend() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");
        std::fs::remove_dir_all(task.worktree().unwrap()).unwrap();
        let before = project.fake.calls().len();

        let err = cmd_interactive(
            &project.cx(),
            InteractiveArgs {
                task_id: task.id(),
                prompt: None,
            },
        )
        .unwrap_err();

        assert!(matches!(err, RoverError::Worktree(_)));
        assert_eq!(project.fake.calls().len(), before);
    }
}
