//! Command implementations for rover.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and the `CommandContext` every command runs against:
//! the resolved project, its configuration, the output mode and a way to
//! reach the container backend.

mod delete;
mod inspect;
mod interactive;
mod iterate;
mod list;
mod logs;
mod merge;
mod push;
mod shell;
mod stop;
mod task;

use crate::cli::Command;
use crate::config::{ProjectConfig, SandboxConfig};
use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use crate::exit_codes;
use crate::locks::{LockGuard, acquire_task_lock};
use crate::output::Output;
use crate::sandbox::{self, Backend, ContainerSpecBuilder, ImageFileReader};
use crate::task::{Task, TaskStore};
use std::path::PathBuf;

/// Opens the container backend for a project.
pub trait BackendSource {
    fn open(&self, config: &SandboxConfig) -> Result<Box<dyn Backend>>;
}

/// Detects Docker or Podman on the host.
pub struct DetectedBackend;

impl BackendSource for DetectedBackend {
    fn open(&self, config: &SandboxConfig) -> Result<Box<dyn Backend>> {
        sandbox::open_manager(config)
    }
}

/// Everything a command needs.
pub struct CommandContext<'a> {
    pub project: ProjectContext,
    pub config: ProjectConfig,
    pub out: Output,
    backends: &'a dyn BackendSource,
    /// Credentials home for sandboxes; `None` means the host's, with the
    /// environment's image override and keychain lookups.
    sandbox_home: Option<PathBuf>,
}

impl<'a> CommandContext<'a> {
    /// Resolve the project from the current directory and load its config.
    pub fn resolve(out: Output, backends: &'a dyn BackendSource) -> Result<Self> {
        let project = ProjectContext::resolve()?;
        Self::for_project(project, out, backends)
    }

    pub fn for_project(
        project: ProjectContext,
        out: Output,
        backends: &'a dyn BackendSource,
    ) -> Result<Self> {
        let config = ProjectConfig::load_for(&project)?;
        Ok(Self {
            project,
            config,
            out,
            backends,
            sandbox_home: None,
        })
    }

    /// Use `home` for credential lookups and ignore host-level overrides.
    pub fn with_sandbox_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.sandbox_home = Some(home.into());
        self
    }

    pub fn store(&self) -> TaskStore {
        TaskStore::new(&self.project)
    }

    pub fn load_task(&self, id: u64) -> Result<Task> {
        self.store().load(id)
    }

    pub fn backend(&self) -> Result<Box<dyn Backend>> {
        self.backends.open(&self.config.sandbox)
    }

    pub fn spec_builder<'b>(&'b self, reader: &'b dyn ImageFileReader) -> Result<ContainerSpecBuilder<'b>> {
        let builder = match &self.sandbox_home {
            Some(home) => ContainerSpecBuilder::with_home(&self.project, &self.config, reader, home),
            None => ContainerSpecBuilder::new(&self.project, &self.config, reader)?,
        };
        Ok(builder.verbose(self.out.verbose))
    }
}

/// Load task `id` under its lock.
///
/// The task is looked up before locking, so a mistyped id does not leave a
/// lock directory behind.
pub(crate) fn lock_task(cx: &CommandContext<'_>, id: u64, action: &str) -> Result<(LockGuard, Task)> {
    cx.load_task(id)?;
    let lock = acquire_task_lock(&cx.project, id, action)?;
    let task = cx.load_task(id)?;
    Ok((lock, task))
}

/// The worktree a task's commands operate on, which must exist on disk.
pub(crate) fn require_worktree(task: &Task) -> Result<PathBuf> {
    let path = task.worktree().ok_or_else(|| {
        RoverError::UserError(format!(
            "task {} has no workspace. Create a new task with `rover task`",
            task.id()
        ))
    })?;
    if !path.is_dir() {
        return Err(RoverError::Worktree(format!(
            "workspace '{}' for task {} is missing",
            path.display(),
            task.id()
        )));
    }
    Ok(path.to_path_buf())
}

/// First line of `text`, shortened for use as a title.
pub(crate) fn title_from(text: &str) -> String {
    const MAX: usize = 72;
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if line.chars().count() <= MAX {
        return line.to_string();
    }
    let mut title: String = line.chars().take(MAX - 3).collect();
    title.push_str("...");
    title
}

/// Dispatch a command to its implementation and return the exit code.
///
/// Commands that attach to a container return its exit code; all others
/// return success or an error.
pub fn dispatch(command: Command, out: Output) -> Result<i32> {
    let backends = DetectedBackend;
    let cx = CommandContext::resolve(out, &backends)?;
    run(&cx, command)
}

pub(crate) fn run(cx: &CommandContext<'_>, command: Command) -> Result<i32> {
    let done = |result: Result<()>| result.map(|()| exit_codes::SUCCESS);
    match command {
        Command::Task(args) => done(task::cmd_task(cx, args)),
        Command::Iterate(args) => done(iterate::cmd_iterate(cx, args)),
        Command::List => done(list::cmd_list(cx)),
        Command::Inspect(args) => done(inspect::cmd_inspect(cx, args)),
        Command::Logs(args) => done(logs::cmd_logs(cx, args)),
        Command::Stop(args) => done(stop::cmd_stop(cx, args)),
        Command::Delete(args) => done(delete::cmd_delete(cx, args)),
        Command::Shell(args) => shell::cmd_shell(cx, args),
        Command::Interactive(args) => interactive::cmd_interactive(cx, args),
        Command::Merge(args) => done(merge::cmd_merge(cx, args)),
        Command::Push(args) => done(push::cmd_push(cx, args)),
    }
}
