//! Container sandboxes.
//!
//! A sandbox is one container running the agent runtime for one task
//! iteration. This module holds the backend-neutral pieces:
//!
//! - `spec`: the `ContainerSpec` descriptor
//! - `builder`: computing a spec from a task iteration
//! - `SandboxManager`: the lifecycle interface
//! - `container`: Docker and Podman implementations over a shared CLI runner
//!
//! Sandboxes are never persisted. Their names are derived from the task id
//! and iteration number, so a handle can be rebuilt from the records alone.

use crate::error::Result;
use std::fmt;

pub mod builder;
mod container;
mod detect;
mod dialect;
pub mod interrupt;
mod logs;
mod runner;
mod spec;

pub use builder::{ContainerSpecBuilder, ImageFileReader};
pub use container::{ContainerSandbox, DockerSandbox, PodmanSandbox};
pub use detect::{Backend, DetectOptions, detect_backend, open_manager};
pub use dialect::{Dialect, Docker, Podman};
pub use logs::LogStream;
pub use runner::{BackendCli, CommandOutput};
pub use spec::{ContainerSpec, EnvVar, HostIdentity, Mount, MountAccess};

/// Container path of the task worktree.
pub const WORKSPACE_MOUNT: &str = "/workspace";

/// Container path of the iteration directory.
pub const OUTPUT_MOUNT: &str = "/output";

/// Container path of the status file the runtime writes.
pub const STATUS_FILE_PATH: &str = "/output/status.json";

const NAME_PREFIX: &str = "rover-task";
const SHELL_PREFIX: &str = "rover-shell";

/// Container runtime flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Docker,
    Podman,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Docker => "docker",
            BackendKind::Podman => "podman",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the sandbox for `iteration` of task `task_id`.
pub fn sandbox_name(task_id: u64, iteration: u32) -> String {
    format!("{}-{}-{}", NAME_PREFIX, task_id, iteration)
}

/// A fresh, collision-free name for an interactive run of `base`.
pub fn interactive_name(base: &str) -> String {
    format!("{}-{}", base, crate::git_worktree::random_suffix())
}

/// A fresh name for a debugging shell on task `task_id`.
pub fn shell_name(task_id: u64) -> String {
    format!("{}-{}-{}", SHELL_PREFIX, task_id, crate::git_worktree::random_suffix())
}

/// A disposable debugging shell over an existing task worktree.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellRequest {
    pub task_id: u64,
    pub image: String,
    pub user: HostIdentity,
    pub worktree: std::path::PathBuf,
}

/// What `stop_and_remove` managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub stopped: bool,
    pub removed: bool,
}

/// Lifecycle of a sandbox: `absent -> created -> running -> stopped -> absent`.
///
/// `run_interactive` and `open_shell_at_worktree` run outside that machine:
/// each creates, attaches to, and removes its own container in one call.
pub trait SandboxManager {
    fn backend(&self) -> BackendKind;

    /// Whether the runtime answering this backend's CLI really is that backend.
    fn is_backend_available(&self) -> bool;

    /// Create the container; returns the backend's container id.
    fn create(&self, spec: &ContainerSpec) -> Result<String>;

    fn start(&self, name: &str) -> Result<()>;

    fn stop(&self, name: &str) -> Result<()>;

    fn remove(&self, name: &str) -> Result<()>;

    /// Everything the container has printed so far.
    fn logs(&self, name: &str) -> Result<String>;

    /// Lines as the container prints them, until it exits or the stream is dropped.
    fn follow_logs(&self, name: &str) -> Result<LogStream>;

    /// Run `spec` attached to the terminal and return its exit code.
    fn run_interactive(&self, spec: &ContainerSpec, initial_prompt: Option<&str>) -> Result<i32>;

    /// Start a throwaway shell mounted over the task worktree.
    fn open_shell_at_worktree(&self, request: &ShellRequest) -> Result<i32>;

    /// `create` then `start`.
    ///
    /// A container whose `start` fails is left in place; callers tear it
    /// down with `stop_and_remove` when they retry.
    fn create_and_start(&self, spec: &ContainerSpec) -> Result<String> {
        let id = self.create(spec)?;
        self.start(&spec.name)?;
        tracing::info!(backend = %self.backend(), name = %spec.name, "sandbox started");
        Ok(id)
    }

    /// `stop` then `remove`, whatever `stop` did. Never fails.
    fn stop_and_remove(&self, name: &str) -> TeardownReport {
        let stopped = match self.stop(name) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(name, "failed to stop sandbox: {}", e);
                false
            }
        };
        let removed = match self.remove(name) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(name, "failed to remove sandbox: {}", e);
                false
            }
        };
        TeardownReport { stopped, removed }
    }
}

/// Entrypoint arguments for an interactive session of a task run.
pub fn interactive_args(run_args: &[String], initial_prompt: Option<&str>) -> Vec<String> {
    let mut args = Vec::with_capacity(run_args.len() + 3);
    args.push("session".to_string());
    args.extend_from_slice(run_args);
    if let Some(prompt) = initial_prompt {
        args.push("--initial-prompt".to_string());
        args.push(prompt.to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeSandbox, SandboxCall};

    #[test]
    fn test_sandbox_name() {
        assert_eq!(sandbox_name(7, 2), "rover-task-7-2");
    }

    #[test]
    fn test_interactive_names_are_fresh() {
        let a = interactive_name(&sandbox_name(7, 2));
        let b = interactive_name(&sandbox_name(7, 2));
        assert!(a.starts_with("rover-task-7-2-"));
        assert_ne!(a, b);
        assert_ne!(shell_name(7), shell_name(7));
        assert!(shell_name(7).starts_with("rover-shell-7-"));
    }

    #[test]
    fn test_stop_and_remove_removes_after_failed_stop() {
        let fake = FakeSandbox::new().failing_stop();

        let report = fake.stop_and_remove("rover-task-7-2");

        assert_eq!(
            report,
            TeardownReport {
                stopped: false,
                removed: true
            }
        );
        assert_eq!(
            fake.calls(),
            vec![
                SandboxCall::Stop("rover-task-7-2".to_string()),
                SandboxCall::Remove("rover-task-7-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_stop_and_remove_tolerates_both_failing() {
        let fake = FakeSandbox::new().failing_stop().failing_remove();
        assert_eq!(fake.stop_and_remove("x"), TeardownReport::default());
        assert_eq!(fake.calls().len(), 2);
    }

    #[test]
    fn test_create_failure_skips_start() {
        let fake = FakeSandbox::new().failing_create();
        let spec = FakeSandbox::spec("rover-task-1-1");

        assert!(fake.create_and_start(&spec).is_err());
        assert_eq!(fake.calls(), vec![SandboxCall::Create("rover-task-1-1".to_string())]);
    }

    #[test]
    fn test_start_failure_leaves_container() {
        let fake = FakeSandbox::new().failing_start();
        let spec = FakeSandbox::spec("rover-task-1-1");

        assert!(fake.create_and_start(&spec).is_err());
        assert_eq!(
            fake.calls(),
            vec![
                SandboxCall::Create("rover-task-1-1".to_string()),
                SandboxCall::Start("rover-task-1-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_interactive_args() {
        let run = vec!["--task-id".to_string(), "7".to_string()];
        assert_eq!(
            interactive_args(&run, Some("fix the test")),
            vec!["session", "--task-id", "7", "--initial-prompt", "fix the test"]
        );
        assert_eq!(interactive_args(&run, None), vec!["session", "--task-id", "7"]);
    }
}
