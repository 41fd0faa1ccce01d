//! Implementation of the `rover logs` command.

use super::CommandContext;
use crate::cli::LogsArgs;
use crate::error::{Result, RoverError};
use crate::sandbox::{interrupt, sandbox_name};
use serde_json::json;

/// Print the logs of a task's sandbox, or stream them with `--follow`
/// until the sandbox exits or the user interrupts.
pub fn cmd_logs(cx: &CommandContext<'_>, args: LogsArgs) -> Result<()> {
    if args.follow && cx.out.json {
        return Err(RoverError::UserError(
            "--follow cannot be combined with --json".to_string(),
        ));
    }

    let task = cx.load_task(args.task_id)?;
    let number = args.iteration.unwrap_or(task.record.iterations);
    if number == 0 || number > task.record.iterations {
        return Err(RoverError::UserError(format!(
            "task {} has no iteration {}",
            task.id(),
            number
        )));
    }
    let name = sandbox_name(task.id(), number);
    let backend = cx.backend()?;

    if args.follow {
        for line in backend.follow_logs(&name)? {
            if interrupt::interrupted() {
                break;
            }
            println!("{}", line);
        }
        return Ok(());
    }

    let logs = backend.logs(&name)?;
    let doc = json!({
        "success": true,
        "taskId": task.id(),
        "iteration": number,
        "sandbox": name,
        "logs": logs,
    });
    cx.out.emit(&doc, || print!("{}", logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::Project;
    use crate::output::Output;
    use crate::test_support::{FakeSandbox, SandboxCall};

    fn args(task_id: u64, iteration: Option<u32>, follow: bool) -> LogsArgs {
        LogsArgs {
            task_id,
            iteration,
            follow,
        }
    }

    #[test]
    fn test_logs_of_latest_iteration() {
        let project = Project::with_fake(FakeSandbox::new().with_logs(&["installing", "done"]));
        let task = project.started_task("Add a health endpoint");

        cmd_logs(&project.cx(), args(task.id(), None, false)).unwrap();

        assert_eq!(
            project.fake.calls().last(),
            Some(&SandboxCall::Logs(sandbox_name(task.id(), 1)))
        );
    }

    #[test]
    fn test_follow_streams_until_exhausted() {
        let project = Project::with_fake(FakeSandbox::new().with_logs(&["a", "b"]));
        let task = project.started_task("Add a health endpoint");
        let mut cx = project.cx();
        cx.out = Output::new(false, 0);

        cmd_logs(&cx, args(task.id(), Some(1), true)).unwrap();

        assert_eq!(
            project.fake.calls().last(),
            Some(&SandboxCall::FollowLogs(sandbox_name(task.id(), 1)))
        );
    }

    #[test]
    fn test_follow_is_rejected_in_json_mode() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");

        let err = cmd_logs(&project.cx(), args(task.id(), None, true)).unwrap_err();
        assert!(matches!(err, RoverError::UserError(_)));
    }

    #[test]
    fn test_unknown_iteration() {
        let project = Project::new();
        let task = project.started_task("Add a health endpoint");

        let err = cmd_logs(&project.cx(), args(task.id(), Some(3), false)).unwrap_err();
        assert!(matches!(err, RoverError::UserError(_)));
    }
}
