//! Implementation of the `rover task` command.
//!
//! 1. Open the container backend, so a host without one fails before any state is written
//! 2. Validate the description and workflow
//! 3. Create the task record and claim its lock
//! 4. Provision the worktree and task branch
//! 5. Record iteration 1 and start its sandbox

use super::{CommandContext, title_from};
use crate::cli::TaskArgs;
use crate::error::{Result, RoverError};
use crate::git;
use crate::git_worktree::provision_task_worktree;
use crate::iteration::IterationStore;
use crate::launch::start_iteration;
use crate::locks::acquire_task_lock;
use crate::sandbox::builder::check_workflow;
use serde_json::json;

pub fn cmd_task(cx: &CommandContext<'_>, args: TaskArgs) -> Result<()> {
    let backend = cx.backend()?;

    let description = args.description.trim();
    if description.is_empty() {
        return Err(RoverError::UserError(
            "task description cannot be empty".to_string(),
        ));
    }
    let title = match args.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => title_from(description),
    };
    let workflow = args.workflow.unwrap_or_else(|| cx.config.workflow.clone());
    check_workflow(&cx.project, &workflow)?;

    if git::ensure_excluded(&cx.project.project_root, "/.rover/")? {
        tracing::debug!("added /.rover/ to the repository's info/exclude");
    }

    let mut task = cx.store().create(&title, description, &workflow)?;
    task.record.agent = Some(args.agent.unwrap_or(cx.config.agent));
    task.record.agent_image = args.image.filter(|image| !image.trim().is_empty());
    task.save()?;

    let _lock = acquire_task_lock(&cx.project, task.id(), "task")?;

    let worktree = match provision_task_worktree(&cx.project, task.id(), None) {
        Ok(worktree) => worktree,
        Err(e) => {
            if let Err(save_err) = task.mark_failed(&e.to_string()) {
                tracing::warn!(task_id = task.id(), "failed to record failure: {}", save_err);
            }
            return Err(e);
        }
    };
    task.set_workspace(&worktree.path, &worktree.branch)?;

    let iteration = IterationStore::new(&cx.project, task.id()).create(1, &title, description)?;
    let builder = cx.spec_builder(backend.reader())?;
    let launched = start_iteration(&mut task, &iteration, &builder, backend.manager())?;

    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "title": task.record.title,
        "status": task.record.status,
        "agent": task.record.agent,
        "workflow": task.record.workflow_name,
        "branch": task.record.branch_name,
        "worktree": task.record.worktree_path,
        "iteration": iteration.number,
        "sandbox": launched.name,
    });
    cx.out.emit(&doc, || {
        println!("Task {} created: {}", task.id(), task.record.title);
        println!("  Branch:   {}", task.record.branch_name);
        println!("  Worktree: {}", task.record.worktree_path);
        println!("  Sandbox:  {} ({})", launched.name, backend.backend());
        println!();
        println!("Follow progress with `rover logs {} --follow`.", task.id());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::commands::fixture::Project;
    use crate::sandbox::sandbox_name;
    use crate::task::TaskStatus;
    use crate::test_support::{FakeSandbox, SandboxCall};

    fn args(description: &str) -> TaskArgs {
        TaskArgs {
            description: description.to_string(),
            title: None,
            agent: None,
            workflow: None,
            image: None,
        }
    }

    #[test]
    fn test_task_creates_worktree_iteration_and_sandbox() {
        let project = Project::new();
        let cx = project.cx();

        cmd_task(&cx, args("Add a health endpoint\n\nReturn 200 on /health")).unwrap();

        let task = cx.load_task(1).unwrap();
        assert_eq!(task.record.title, "Add a health endpoint");
        assert_eq!(task.record.status, TaskStatus::InProgress);
        assert_eq!(task.record.agent, Some(AgentKind::Claude));
        assert_eq!(task.record.container_id.as_deref(), Some("fake-rover-task-1-1"));
        assert!(task.record.branch_name.starts_with("rover-task-1-"));
        assert!(task.worktree().unwrap().is_dir());

        let iteration = IterationStore::new(&cx.project, 1).load(1).unwrap();
        assert_eq!(iteration.title, "Add a health endpoint");

        let name = sandbox_name(1, 1);
        assert_eq!(
            project.fake.calls(),
            vec![SandboxCall::Create(name.clone()), SandboxCall::Start(name)]
        );
    }

    #[test]
    fn test_rover_dir_does_not_dirty_the_project() {
        let project = Project::new();
        cmd_task(&project.cx(), args("Tidy up")).unwrap();

        assert!(!git::has_uncommitted_changes(project.repo.path()).unwrap());
    }

    #[test]
    fn test_explicit_options_are_recorded() {
        let project = Project::new();
        let cx = project.cx();

        cmd_task(
            &cx,
            TaskArgs {
                description: "Port the build to meson".to_string(),
                title: Some("Meson".to_string()),
                agent: Some(AgentKind::Codex),
                workflow: Some("swe".to_string()),
                image: Some("registry.local/agent:dev".to_string()),
            },
        )
        .unwrap();

        let task = cx.load_task(1).unwrap();
        assert_eq!(task.record.title, "Meson");
        assert_eq!(task.record.agent, Some(AgentKind::Codex));
        assert_eq!(task.record.agent_image.as_deref(), Some("registry.local/agent:dev"));
        assert_eq!(project.fake.specs()[0].image, "registry.local/agent:dev");
    }

    #[test]
    fn test_empty_description_is_rejected() {
        let project = Project::new();
        let err = cmd_task(&project.cx(), args("   ")).unwrap_err();

        assert!(matches!(err, RoverError::UserError(_)));
        assert!(project.cx().store().list().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_workflow_writes_nothing() {
        let project = Project::new();
        let mut task_args = args("Do things");
        task_args.workflow = Some("nonexistent".to_string());

        let err = cmd_task(&project.cx(), task_args).unwrap_err();

        assert!(matches!(err, RoverError::UserError(_)));
        assert!(project.cx().store().list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_backend_writes_nothing() {
        let project = Project::with_fake(FakeSandbox::new().unavailable());
        let err = cmd_task(&project.cx(), args("Do things")).unwrap_err();

        assert!(matches!(err, RoverError::BackendUnavailable(_)));
        assert!(project.cx().store().list().unwrap().is_empty());
    }

    #[test]
    fn test_failed_start_marks_task_failed() {
        let project = Project::with_fake(FakeSandbox::new().failing_start());
        let cx = project.cx();

        let err = cmd_task(&cx, args("Do things")).unwrap_err();

        assert!(matches!(err, RoverError::ContainerOperation(_)));
        let task = cx.load_task(1).unwrap();
        assert_eq!(task.record.status, TaskStatus::Failed);
        assert!(task.record.error.unwrap().contains("fake start failure"));
        assert!(!cx.project.task_lock_path(1).exists());
    }

    #[test]
    fn test_ids_are_sequential() {
        let project = Project::new();
        let cx = project.cx();
        cmd_task(&cx, args("first")).unwrap();
        cmd_task(&cx, args("second")).unwrap();

        let ids: Vec<u64> = cx.store().list().unwrap().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
