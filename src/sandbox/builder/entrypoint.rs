//! Files the entrypoint reads: the script itself, the workflow definition
//! and the inputs document.
//!
//! The script is a fixed asset. Nothing task-specific is ever interpolated
//! into it; per-run data reaches the runtime only through mounted JSON files
//! and argv flags.

use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use crate::task::{DEFAULT_WORKFLOW, Task};
use crate::iteration::Iteration;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ENTRYPOINT_FILE: &str = "entrypoint.sh";
pub const WORKFLOW_FILE: &str = "workflow.yml";
pub const INPUTS_FILE: &str = "inputs.json";

pub const ENTRYPOINT_SCRIPT: &str = r#"#!/bin/sh
set -eu

if [ -f /init-script.sh ]; then
  echo "rover: running init script" >&2
  sh /init-script.sh
fi

case "${1:-}" in
  session)
    shift
    exec rover-agent session "$@"
    ;;
  *)
    exec rover-agent run /workflow.yml "$@"
    ;;
esac
"#;

/// Workflow used when the project does not define `swe` itself.
pub const BUILTIN_SWE_WORKFLOW: &str = r#"version: "1.0"
name: swe
description: Plan, implement and summarize a software engineering task.
inputs:
  - name: description
    type: string
    required: true
outputs:
  - name: plan
    type: file
    filename: plan.md
  - name: changes
    type: file
    filename: changes.md
  - name: summary
    type: file
    filename: summary.md
steps:
  - id: plan
    name: Planning
    prompt: Analyze the task and write an implementation plan to plan.md.
  - id: implement
    name: Implementing
    prompt: Implement the plan and describe the changes in changes.md.
  - id: summarize
    name: Summarizing
    prompt: Summarize the work in summary.md.
"#;

/// Per-run data handed to the agent runtime as `/inputs.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInputs {
    pub task_id: u64,
    pub title: String,
    pub description: String,
    pub iteration: u32,
    pub iteration_title: String,
    pub iteration_description: String,
    pub workflow: String,
}

impl RunInputs {
    pub fn new(task: &Task, iteration: &Iteration) -> Self {
        Self {
            task_id: task.id(),
            title: task.record.title.clone(),
            description: task.record.description.clone(),
            iteration: iteration.number,
            iteration_title: iteration.title.clone(),
            iteration_description: iteration.description.clone(),
            workflow: task.record.workflow_name.clone(),
        }
    }
}

/// Write the entrypoint script (mode 0755) into `sandbox_dir`.
pub fn write_entrypoint(sandbox_dir: &Path) -> Result<PathBuf> {
    let path = sandbox_dir.join(ENTRYPOINT_FILE);
    crate::fs::atomic_write_file(&path, ENTRYPOINT_SCRIPT)?;
    make_executable(&path)?;
    Ok(path)
}

/// Locate the workflow definition for `name`.
///
/// A project file `.rover/workflows/<name>.yml` wins. Otherwise `swe` falls
/// back to the built-in definition, written into `sandbox_dir`.
pub fn resolve_workflow(ctx: &ProjectContext, name: &str, sandbox_dir: &Path) -> Result<PathBuf> {
    let custom = ctx.workflows_dir().join(format!("{}.yml", name));
    if custom.is_file() {
        return Ok(custom);
    }
    if name == DEFAULT_WORKFLOW {
        let path = sandbox_dir.join(WORKFLOW_FILE);
        crate::fs::atomic_write_file(&path, BUILTIN_SWE_WORKFLOW)?;
        return Ok(path);
    }
    Err(unknown_workflow(ctx, name))
}

fn unknown_workflow(ctx: &ProjectContext, name: &str) -> RoverError {
    RoverError::UserError(format!(
        "unknown workflow '{}'. Add {} or use '{}'",
        name,
        ctx.workflows_dir().join(format!("{}.yml", name)).display(),
        DEFAULT_WORKFLOW
    ))
}

/// Fail early when `name` names no workflow.
pub fn check_workflow(ctx: &ProjectContext, name: &str) -> Result<()> {
    if name == DEFAULT_WORKFLOW || ctx.workflows_dir().join(format!("{}.yml", name)).is_file() {
        return Ok(());
    }
    Err(unknown_workflow(ctx, name))
}

pub fn write_inputs(sandbox_dir: &Path, inputs: &RunInputs) -> Result<PathBuf> {
    let path = sandbox_dir.join(INPUTS_FILE);
    crate::fs::atomic_write_json(&path, inputs)?;
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        RoverError::Save(format!("'{}': failed to set permissions: {}", path.display(), e))
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
