//! Invoking the container runtime CLI.
//!
//! Every backend call goes through `BackendCli`, which bounds it with a
//! timeout and watches the interrupt flag. A timed-out or interrupted call
//! kills the child process and fails with `ContainerOperation`. Cleanup
//! calls made after Ctrl+C use `run_uninterruptible`, which only honours the
//! timeout.

use super::interrupt;
use crate::error::{Result, RoverError};
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished backend command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancel,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Exited(Option<i32>),
    TimedOut,
    Interrupted,
}

/// A container runtime binary plus the timeout applied to its calls.
#[derive(Debug, Clone)]
pub struct BackendCli {
    program: String,
    timeout: Duration,
}

impl BackendCli {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            program: self.program.clone(),
            timeout,
        }
    }

    /// Run to completion and capture output, whatever the exit status.
    pub fn run(&self, args: &[String]) -> Result<CommandOutput> {
        self.run_with(args, Interrupt::Cancel)
    }

    /// Like `run`, but a pending Ctrl+C does not cancel the call.
    pub fn run_uninterruptible(&self, args: &[String]) -> Result<CommandOutput> {
        self.run_with(args, Interrupt::Ignore)
    }

    fn run_with(&self, args: &[String], interrupt: Interrupt) -> Result<CommandOutput> {
        let mut child = self.spawn(args, Stdio::null(), Stdio::piped(), Stdio::piped())?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = wait_for(&mut child, Some(self.timeout), interrupt)?;
        let stdout = join(stdout);
        let stderr = join(stderr);

        match outcome {
            WaitOutcome::Exited(code) => Ok(CommandOutput {
                stdout,
                stderr,
                code,
            }),
            WaitOutcome::TimedOut => Err(RoverError::ContainerOperation(format!(
                "`{}` timed out after {}s",
                self.display(args),
                self.timeout.as_secs()
            ))),
            WaitOutcome::Interrupted => Err(RoverError::ContainerOperation(format!(
                "`{}` interrupted",
                self.display(args)
            ))),
        }
    }

    /// Run and require success; returns trimmed stdout.
    pub fn run_checked(&self, action: &str, args: &[String]) -> Result<String> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(RoverError::ContainerOperation(format!(
                "{} failed ({} exited with {:?}): {}",
                action,
                self.program,
                output.code,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Spawn with stdout and stderr piped, for the caller to stream.
    pub fn spawn_piped(&self, args: &[String]) -> Result<Child> {
        self.spawn(args, Stdio::null(), Stdio::piped(), Stdio::piped())
    }

    /// Run attached to the terminal with no timeout.
    ///
    /// When Ctrl+C is pressed `on_interrupt` runs before the child is reaped,
    /// and the result is `INTERRUPTED_EXIT_CODE`.
    pub fn run_attached(&self, args: &[String], on_interrupt: impl FnOnce()) -> Result<i32> {
        let mut child = self.spawn(args, Stdio::inherit(), Stdio::inherit(), Stdio::inherit())?;
        match wait_for(&mut child, None, Interrupt::Cancel)? {
            WaitOutcome::Exited(code) => Ok(code.unwrap_or(interrupt::INTERRUPTED_EXIT_CODE)),
            WaitOutcome::Interrupted => {
                on_interrupt();
                let _ = child.wait();
                Ok(interrupt::INTERRUPTED_EXIT_CODE)
            }
            WaitOutcome::TimedOut => Ok(interrupt::INTERRUPTED_EXIT_CODE),
        }
    }

    fn spawn(&self, args: &[String], stdin: Stdio, stdout: Stdio, stderr: Stdio) -> Result<Child> {
        tracing::debug!("running: {}", self.display(args));
        Command::new(&self.program)
            .args(args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    RoverError::BackendUnavailable(format!("'{}' is not installed", self.program))
                } else {
                    RoverError::ContainerOperation(format!(
                        "failed to run '{}': {}",
                        self.program, e
                    ))
                }
            })
    }

    fn display(&self, args: &[String]) -> String {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(self.program.as_str());
        words.extend(args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

fn wait_for(
    child: &mut Child,
    timeout: Option<Duration>,
    on_interrupt: Interrupt,
) -> Result<WaitOutcome> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(WaitOutcome::Exited(status.code())),
            Ok(None) => {
                if on_interrupt == Interrupt::Cancel && interrupt::interrupted() {
                    kill(child);
                    return Ok(WaitOutcome::Interrupted);
                }
                if let Some(timeout) = timeout
                    && start.elapsed() >= timeout
                {
                    kill(child);
                    return Ok(WaitOutcome::TimedOut);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(RoverError::ContainerOperation(format!(
                    "failed to check process status: {}",
                    e
                )));
            }
        }
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
