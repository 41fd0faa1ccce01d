//! Implementation of the `rover inspect` command.

use super::CommandContext;
use crate::cli::InspectArgs;
use crate::error::{Result, RoverError};
use crate::git;
use crate::iteration::{IterationStore, StatusRead, read_status};
use crate::locks::read_task_lock;
use serde_json::{Value, json};

/// Show the task record, one iteration, its reported status and which
/// artifacts the agent has written so far.
pub fn cmd_inspect(cx: &CommandContext<'_>, args: InspectArgs) -> Result<()> {
    let task = cx.load_task(args.task_id)?;
    let number = args.iteration.unwrap_or(task.record.iterations);
    if number == 0 || number > task.record.iterations {
        return Err(RoverError::UserError(format!(
            "task {} has iterations 1..={}, not {}",
            task.id(),
            task.record.iterations,
            number
        )));
    }

    let store = IterationStore::new(&cx.project, task.id());
    let iteration = store.load(number)?;
    let artifacts = store.read_artifacts(number)?;
    let status = read_status(store.status_path(number));

    let diff = task.worktree().filter(|w| w.is_dir()).and_then(|worktree| {
        git::diff_stat(worktree)
            .map_err(|e| tracing::warn!(task_id = task.id(), "diff unavailable: {}", e))
            .ok()
    });
    let lock = read_task_lock(&cx.project, task.id());

    let status_doc = match &status {
        StatusRead::Ready(status) => serde_json::to_value(status)
            .map_err(|e| RoverError::Save(format!("status: {}", e)))?,
        StatusRead::NotReady(reason) => json!({ "notReady": reason }),
        StatusRead::Missing => Value::Null,
    };
    let doc = json!({
        "success": true,
        "task": task.record,
        "iteration": iteration,
        "status": status_doc,
        "artifacts": {
            "plan": artifacts.plan.is_some(),
            "changes": artifacts.changes.is_some(),
            "summary": artifacts.summary.is_some(),
        },
        "diffStat": diff,
        "lock": lock,
    });

    cx.out.emit(&doc, || {
        let r = &task.record;
        println!("Task {}: {}", r.id, r.title);
        println!("  Status:    {}", r.status);
        if let Some(agent) = r.agent {
            println!("  Agent:     {}", agent);
        }
        println!("  Workflow:  {}", r.workflow_name);
        println!("  Branch:    {}", r.branch_name);
        println!("  Worktree:  {}", r.worktree_path);
        if let Some(container) = &r.container_id {
            println!("  Sandbox:   {}", container);
        }
        if let Some(error) = &r.error {
            println!("  Error:     {}", error);
        }
        if let Some(lock) = &lock {
            println!("  Locked:    by {} ({}, {} ago)", lock.owner, lock.action, lock.age_string());
        }

        println!();
        println!("Iteration {}/{}: {}", number, r.iterations, iteration.title);
        match &status {
            StatusRead::Ready(s) => {
                println!("  Progress:  {}% {} ({})", s.progress, s.status, s.current_step);
                if let Some(error) = &s.error {
                    println!("  Error:     {}", error);
                }
            }
            StatusRead::NotReady(_) => println!("  Progress:  (status being written)"),
            StatusRead::Missing => println!("  Progress:  (no status reported yet)"),
        }
        let present: Vec<&str> = [
            ("plan.md", artifacts.plan.is_some()),
            ("changes.md", artifacts.changes.is_some()),
            ("summary.md", artifacts.summary.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();
        if present.is_empty() {
            println!("  Artifacts: none");
        } else {
            println!("  Artifacts: {}", present.join(", "));
        }
        if let Some(summary) = &artifacts.summary {
            println!();
            println!("{}", summary.trim_end());
        }
        if let Some(diff) = diff.as_deref().filter(|d| !d.is_empty()) {
            println!();
            println!("{}", diff);
        }
    })
}
