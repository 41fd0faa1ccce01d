//! Docker and Podman sandboxes.
//!
//! Both are the same `ContainerSandbox` driving a different CLI through a
//! different `Dialect`.

use super::builder::ImageFileReader;
use super::dialect::{self, Dialect, Docker, Podman};
use super::{
    BackendCli, BackendKind, ContainerSpec, LogStream, SandboxManager, ShellRequest,
    interactive_args, interactive_name, shell_name,
};
use crate::error::{Result, RoverError};
use std::marker::PhantomData;
use std::time::Duration;

pub type DockerSandbox = ContainerSandbox<Docker>;
pub type PodmanSandbox = ContainerSandbox<Podman>;

/// Seconds a container gets to exit on `stop` before it is killed.
const STOP_GRACE_SECONDS: u32 = 10;

pub struct ContainerSandbox<D: Dialect> {
    cli: BackendCli,
    detect_timeout: Duration,
    dialect: PhantomData<D>,
}

impl<D: Dialect> ContainerSandbox<D> {
    /// A sandbox driving `program`, usually `docker` or `podman`.
    pub fn new(program: &str, command_timeout: Duration, detect_timeout: Duration) -> Self {
        Self {
            cli: BackendCli::new(program, command_timeout),
            detect_timeout,
            dialect: PhantomData,
        }
    }

    /// The parsed `info` document, if the CLI answers with one.
    pub(super) fn info(&self) -> Option<serde_json::Value> {
        let output = self
            .cli
            .with_timeout(self.detect_timeout)
            .run(&dialect::info_args())
            .ok()?;
        if !output.success() {
            tracing::debug!(program = self.cli.program(), "info failed: {}", output.stderr.trim());
            return None;
        }
        serde_json::from_str(output.stdout.trim()).ok()
    }

    /// Run a cleanup command, treating an already-absent container as done.
    ///
    /// Cleanup still has to reach the runtime after Ctrl+C, so it ignores
    /// the interrupt flag.
    fn run_cleanup(&self, action: &str, args: Vec<String>) -> Result<()> {
        let output = self.cli.run_uninterruptible(&args)?;
        if output.success() || dialect::is_absent_container(&output.stderr) {
            return Ok(());
        }
        Err(RoverError::ContainerOperation(format!(
            "{} failed ({} exited with {:?}): {}",
            action,
            self.cli.program(),
            output.code,
            output.stderr.trim()
        )))
    }
}

impl<D: Dialect> SandboxManager for ContainerSandbox<D> {
    fn backend(&self) -> BackendKind {
        D::KIND
    }

    fn is_backend_available(&self) -> bool {
        match self.info() {
            Some(info) => {
                let genuine = D::is_genuine(&info);
                if !genuine {
                    tracing::debug!(
                        program = self.cli.program(),
                        "'{}' answers but is not {}",
                        self.cli.program(),
                        D::KIND
                    );
                }
                genuine
            }
            None => false,
        }
    }

    fn create(&self, spec: &ContainerSpec) -> Result<String> {
        let id = self
            .cli
            .run_checked(&format!("create sandbox '{}'", spec.name), &dialect::create_args::<D>(spec))?;
        tracing::debug!(name = %spec.name, id = %id, "sandbox created");
        Ok(id)
    }

    fn start(&self, name: &str) -> Result<()> {
        self.cli
            .run_checked(&format!("start sandbox '{}'", name), &["start".to_string(), name.to_string()])
            .map(|_| ())
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.run_cleanup(
            &format!("stop sandbox '{}'", name),
            vec![
                "stop".to_string(),
                "-t".to_string(),
                STOP_GRACE_SECONDS.to_string(),
                name.to_string(),
            ],
        )
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.run_cleanup(
            &format!("remove sandbox '{}'", name),
            vec!["rm".to_string(), "-f".to_string(), name.to_string()],
        )
    }

    fn logs(&self, name: &str) -> Result<String> {
        let output = self.cli.run(&["logs".to_string(), name.to_string()])?;
        if !output.success() {
            return Err(RoverError::ContainerOperation(format!(
                "logs for sandbox '{}' failed: {}",
                name,
                output.stderr.trim()
            )));
        }
        // Container stderr arrives on our stderr; keep both.
        let mut logs = output.stdout;
        logs.push_str(&output.stderr);
        Ok(logs)
    }

    fn follow_logs(&self, name: &str) -> Result<LogStream> {
        let child = self.cli.spawn_piped(&[
            "logs".to_string(),
            "--follow".to_string(),
            name.to_string(),
        ])?;
        Ok(LogStream::from_child(child))
    }

    fn run_interactive(&self, spec: &ContainerSpec, initial_prompt: Option<&str>) -> Result<i32> {
        let name = interactive_name(&spec.name);
        let args = interactive_args(&spec.args, initial_prompt);
        let run_args = dialect::interactive_run_args::<D>(&name, spec, &args);
        tracing::info!(backend = %D::KIND, name = %name, "starting interactive sandbox");

        self.cli.run_attached(&run_args, || {
            eprintln!("Interrupted, stopping '{}'...", name);
            if let Err(e) = self.stop(&name) {
                tracing::warn!(name = %name, "failed to stop interactive sandbox: {}", e);
            }
        })
    }

    fn open_shell_at_worktree(&self, request: &ShellRequest) -> Result<i32> {
        let name = shell_name(request.task_id);
        let args =
            dialect::shell_args::<D>(&name, &request.image, request.user, &request.worktree);
        self.cli.run_attached(&args, || {
            if let Err(e) = self.stop(&name) {
                tracing::warn!(name = %name, "failed to stop shell: {}", e);
            }
        })
    }
}

impl<D: Dialect> ImageFileReader for ContainerSandbox<D> {
    fn read_image_file(&self, image: &str, path: &str) -> Result<String> {
        let output = self.cli.run(&dialect::read_file_args(image, path))?;
        if !output.success() {
            return Err(RoverError::ContainerOperation(format!(
                "reading {} from '{}' failed: {}",
                path,
                image,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}
