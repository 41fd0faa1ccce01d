//! Implementation of the `rover shell` command.

use super::{CommandContext, require_worktree};
use crate::cli::ShellArgs;
use crate::error::Result;
use crate::git_worktree::ensure_within_project_root;
use crate::sandbox::ShellRequest;
use crate::sandbox::builder::host_identity;

/// Open `/bin/sh` in a throwaway container with the task's worktree mounted
/// at `/workspace`. Returns the shell's exit code.
pub fn cmd_shell(cx: &CommandContext<'_>, args: ShellArgs) -> Result<i32> {
    let task = cx.load_task(args.task_id)?;
    let worktree = ensure_within_project_root(&cx.project.project_root, &require_worktree(&task)?)?;
    let backend = cx.backend()?;
    let image = cx.spec_builder(backend.reader())?.resolve_image(&task).image;

    let request = ShellRequest {
        task_id: task.id(),
        image,
        user: host_identity(),
        worktree,
    };
    tracing::info!(task_id = task.id(), image = %request.image, "opening shell");
    backend.open_shell_at_worktree(&request)
}
