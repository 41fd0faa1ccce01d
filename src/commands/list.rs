//! Implementation of the `rover list` command.
//!
//! Shows every task with its status and the progress its latest iteration
//! reported. Status reports for active tasks are synced back into the task
//! record, except for tasks another rover process is holding.

use super::CommandContext;
use crate::error::Result;
use crate::iteration::{IterationStatus, IterationStore, StatusRead, read_status};
use crate::locks::acquire_task_lock;
use crate::task::Task;
use serde::Serialize;

/// One row of `rover list`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRow {
    id: u64,
    title: String,
    status: String,
    agent: Option<String>,
    iteration: u32,
    progress: Option<u8>,
    current_step: Option<String>,
    branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn cmd_list(cx: &CommandContext<'_>) -> Result<()> {
    let mut rows = Vec::new();
    for mut task in cx.store().list()? {
        let status = latest_status(cx, &task);
        if let Some(status) = &status {
            sync(cx, &mut task, status);
        }
        rows.push(TaskRow {
            id: task.id(),
            title: task.record.title.clone(),
            status: task.record.status.to_string(),
            agent: task.record.agent.map(|a| a.to_string()),
            iteration: task.record.iterations,
            progress: status.as_ref().map(|s| s.progress),
            current_step: status
                .as_ref()
                .map(|s| s.current_step.clone())
                .filter(|s| !s.is_empty()),
            branch: task.record.branch_name.clone(),
            error: task.record.error.clone(),
        });
    }

    let doc = serde_json::json!({ "success": true, "tasks": rows });
    cx.out.emit(&doc, || print_table(&rows))
}

fn latest_status(cx: &CommandContext<'_>, task: &Task) -> Option<IterationStatus> {
    let path = IterationStore::new(&cx.project, task.id()).status_path(task.record.iterations);
    match read_status(&path) {
        StatusRead::Ready(status) => Some(status),
        StatusRead::NotReady(reason) => {
            tracing::debug!(task_id = task.id(), "status not ready: {}", reason);
            None
        }
        StatusRead::Missing => None,
    }
}

fn sync(cx: &CommandContext<'_>, task: &mut Task, status: &IterationStatus) {
    if !task.record.status.is_active() {
        return;
    }
    let Ok(_lock) = acquire_task_lock(&cx.project, task.id(), "list") else {
        tracing::debug!(task_id = task.id(), "task busy, not syncing status");
        return;
    };
    // Reload under the lock; the record may have moved on since listing.
    let mut current = match cx.load_task(task.id()) {
        Ok(current) => current,
        Err(e) => {
            tracing::warn!(task_id = task.id(), "failed to reload task: {}", e);
            return;
        }
    };
    // A status read for iteration N says nothing about N+1.
    if current.record.iterations != task.record.iterations {
        tracing::debug!(
            task_id = task.id(),
            read = task.record.iterations,
            now = current.record.iterations,
            "task moved to a new iteration, not syncing status"
        );
        *task = current;
        return;
    }
    match current.sync_with_status(status) {
        Ok(true) => {
            tracing::info!(task_id = task.id(), status = %current.record.status, "synced task status");
            *task = current;
        }
        Ok(false) => {}
        Err(e) => tracing::warn!(task_id = task.id(), "failed to sync status: {}", e),
    }
}

fn print_table(rows: &[TaskRow]) {
    if rows.is_empty() {
        println!("No tasks. Create one with `rover task \"<description>\"`.");
        return;
    }

    println!(
        "{:>4}  {:<12}  {:>4}  {:>8}  {:<20}  TITLE",
        "ID", "STATUS", "ITER", "PROGRESS", "STEP"
    );
    for row in rows {
        let progress = row
            .progress
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string());
        let step = row.current_step.as_deref().unwrap_or("-");
        println!(
            "{:>4}  {:<12}  {:>4}  {:>8}  {:<20}  {}",
            row.id,
            row.status,
            row.iteration,
            progress,
            truncate(step, 20),
            row.title
        );
        if let Some(error) = &row.error {
            println!("      error: {}", error);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('~');
        out
    }
}
