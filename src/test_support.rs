//! Shared test fixtures: scratch git repositories, a working-directory guard,
//! and a recording fake container backend.

use crate::commands::BackendSource;
use crate::config::SandboxConfig;
use crate::error::{Result, RoverError};
use crate::sandbox::{
    Backend, BackendKind, ContainerSpec, HostIdentity, ImageFileReader, LogStream,
    SandboxManager, ShellRequest,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    // Ensure the repo uses a deterministic default branch name across environments.
    // This sets HEAD to an unborn `main` branch before the first commit.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    // Configure git user for commits
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);

    // Create initial commit (required for worktree creation)
    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    temp_dir
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }
}

/// A backend call the fake recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SandboxCall {
    Create(String),
    Start(String),
    Stop(String),
    Remove(String),
    Logs(String),
    FollowLogs(String),
    RunInteractive(String, Option<String>),
    OpenShell(u64),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<SandboxCall>,
    specs: Vec<ContainerSpec>,
    shells: Vec<ShellRequest>,
    logs: Vec<String>,
    fail_create: bool,
    fail_start: bool,
    fail_stop: bool,
    fail_remove: bool,
    unavailable: bool,
}

/// A `SandboxManager` that records calls instead of running containers.
///
/// Clones share their state, so a clone handed to code under test can be
/// inspected afterwards.
#[derive(Clone, Default)]
pub(crate) struct FakeSandbox {
    state: Rc<RefCell<FakeState>>,
}

impl FakeSandbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_create(self) -> Self {
        self.state.borrow_mut().fail_create = true;
        self
    }

    pub(crate) fn failing_start(self) -> Self {
        self.state.borrow_mut().fail_start = true;
        self
    }

    pub(crate) fn failing_stop(self) -> Self {
        self.state.borrow_mut().fail_stop = true;
        self
    }

    pub(crate) fn failing_remove(self) -> Self {
        self.state.borrow_mut().fail_remove = true;
        self
    }

    /// Make `BackendSource::open` fail as if no runtime were installed.
    pub(crate) fn unavailable(self) -> Self {
        self.state.borrow_mut().unavailable = true;
        self
    }

    pub(crate) fn with_logs(self, lines: &[&str]) -> Self {
        self.state.borrow_mut().logs = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub(crate) fn calls(&self) -> Vec<SandboxCall> {
        self.state.borrow().calls.clone()
    }

    /// Specs passed to `create` and `run_interactive`, in call order.
    pub(crate) fn specs(&self) -> Vec<ContainerSpec> {
        self.state.borrow().specs.clone()
    }

    pub(crate) fn shells(&self) -> Vec<ShellRequest> {
        self.state.borrow().shells.clone()
    }

    /// A minimal spec named `name`.
    pub(crate) fn spec(name: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: "rover-test-image".to_string(),
            user: HostIdentity::FALLBACK,
            mounts: Vec::new(),
            env: Vec::new(),
            workdir: "/workspace".to_string(),
            entrypoint: "/entrypoint.sh".to_string(),
            args: Vec::new(),
        }
    }

    fn record(&self, call: SandboxCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn fail_if(flag: bool, what: &str) -> Result<()> {
        if flag {
            Err(RoverError::ContainerOperation(format!("fake {} failure", what)))
        } else {
            Ok(())
        }
    }
}

impl SandboxManager for FakeSandbox {
    fn backend(&self) -> BackendKind {
        BackendKind::Docker
    }

    fn is_backend_available(&self) -> bool {
        !self.state.borrow().unavailable
    }

    fn create(&self, spec: &ContainerSpec) -> Result<String> {
        self.record(SandboxCall::Create(spec.name.clone()));
        self.state.borrow_mut().specs.push(spec.clone());
        Self::fail_if(self.state.borrow().fail_create, "create")?;
        Ok(format!("fake-{}", spec.name))
    }

    fn start(&self, name: &str) -> Result<()> {
        self.record(SandboxCall::Start(name.to_string()));
        Self::fail_if(self.state.borrow().fail_start, "start")
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.record(SandboxCall::Stop(name.to_string()));
        Self::fail_if(self.state.borrow().fail_stop, "stop")
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.record(SandboxCall::Remove(name.to_string()));
        Self::fail_if(self.state.borrow().fail_remove, "remove")
    }

    fn logs(&self, name: &str) -> Result<String> {
        self.record(SandboxCall::Logs(name.to_string()));
        let logs = self.state.borrow().logs.clone();
        Ok(logs.iter().map(|l| format!("{}\n", l)).collect())
    }

    fn follow_logs(&self, name: &str) -> Result<LogStream> {
        self.record(SandboxCall::FollowLogs(name.to_string()));
        Ok(LogStream::from_lines(self.state.borrow().logs.clone()))
    }

    fn run_interactive(&self, spec: &ContainerSpec, initial_prompt: Option<&str>) -> Result<i32> {
        self.record(SandboxCall::RunInteractive(
            spec.name.clone(),
            initial_prompt.map(str::to_string),
        ));
        self.state.borrow_mut().specs.push(spec.clone());
        Ok(0)
    }

    fn open_shell_at_worktree(&self, request: &ShellRequest) -> Result<i32> {
        self.record(SandboxCall::OpenShell(request.task_id));
        self.state.borrow_mut().shells.push(request.clone());
        Ok(0)
    }
}

impl ImageFileReader for FakeSandbox {
    fn read_image_file(&self, _image: &str, path: &str) -> Result<String> {
        match path {
            "/etc/passwd" => Ok("root:x:0:0:root:/root:/bin/sh\n".to_string()),
            "/etc/group" => Ok("root:x:0:\n".to_string()),
            other => Err(RoverError::ContainerOperation(format!("no {} in fake image", other))),
        }
    }
}

impl BackendSource for FakeSandbox {
    fn open(&self, _config: &SandboxConfig) -> Result<Box<dyn Backend>> {
        if self.state.borrow().unavailable {
            return Err(RoverError::BackendUnavailable("fake backend is off".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}
