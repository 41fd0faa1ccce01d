//! CLI argument parsing for rover.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::agent::AgentKind;
use clap::{ArgAction, Parser, Subcommand};

/// Rover: run AI coding agents in sandboxed containers, one git worktree per task.
///
/// Each task gets its own branch and worktree under `.rover/tasks/<id>/`.
/// Every run of the agent is an iteration; later iterations see the plan,
/// changes and summary of earlier ones.
#[derive(Parser, Debug)]
#[command(name = "rover")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print a single JSON document instead of human-readable output.
    #[arg(long, global = true)]
    pub json: bool,

    /// More diagnostics on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for rover.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a task and start its agent.
    ///
    /// Provisions a worktree and branch, records iteration 1 and starts a
    /// sandbox running the agent against it.
    Task(TaskArgs),

    /// Add an iteration to a task and run the agent again.
    ///
    /// The new iteration carries forward the previous one's artifacts.
    Iterate(IterateArgs),

    /// List tasks with their status and progress.
    #[command(alias = "ls")]
    List,

    /// Show a task in detail.
    Inspect(InspectArgs),

    /// Show the logs of a task's sandbox.
    Logs(LogsArgs),

    /// Stop a task's sandbox.
    Stop(StopArgs),

    /// Delete a task, its sandbox, worktree and branch.
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Open a shell in a throwaway container over a task's worktree.
    Shell(ShellArgs),

    /// Run the agent for a task interactively in the terminal.
    Interactive(InteractiveArgs),

    /// Merge a task's branch into the current branch.
    Merge(MergeArgs),

    /// Push a task's branch to the configured remote.
    Push(PushArgs),
}

/// Arguments for the `task` command.
#[derive(Parser, Debug)]
pub struct TaskArgs {
    /// What the agent should do.
    pub description: String,

    /// Short title (defaults to the first line of the description).
    #[arg(short, long)]
    pub title: Option<String>,

    /// Agent to run (claude, codex, gemini, qwen).
    #[arg(short, long)]
    pub agent: Option<AgentKind>,

    /// Workflow to run.
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Agent image for this task.
    #[arg(long)]
    pub image: Option<String>,
}

/// Arguments for the `iterate` command.
#[derive(Parser, Debug)]
pub struct IterateArgs {
    /// Task ID.
    pub task_id: u64,

    /// Instructions for the new iteration.
    pub instructions: String,

    /// Short title for the iteration.
    #[arg(short, long)]
    pub title: Option<String>,
}

/// Arguments for the `inspect` command.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Task ID.
    pub task_id: u64,

    /// Iteration to show (defaults to the latest).
    #[arg(short, long)]
    pub iteration: Option<u32>,
}

/// Arguments for the `logs` command.
#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Task ID.
    pub task_id: u64,

    /// Iteration whose sandbox to read (defaults to the latest).
    #[arg(short, long)]
    pub iteration: Option<u32>,

    /// Keep printing new lines until the sandbox exits.
    #[arg(short, long)]
    pub follow: bool,
}

/// Arguments for the `stop` command.
#[derive(Parser, Debug)]
pub struct StopArgs {
    /// Task ID.
    pub task_id: u64,

    /// Also remove the task's worktree and branch.
    #[arg(long)]
    pub remove_all: bool,
}

/// Arguments for the `delete` command.
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Task ID.
    pub task_id: u64,
}

/// Arguments for the `shell` command.
#[derive(Parser, Debug)]
pub struct ShellArgs {
    /// Task ID.
    pub task_id: u64,
}

/// Arguments for the `interactive` command.
#[derive(Parser, Debug)]
pub struct InteractiveArgs {
    /// Task ID.
    pub task_id: u64,

    /// First message for the agent.
    pub prompt: Option<String>,
}

/// Arguments for the `merge` command.
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Task ID.
    pub task_id: u64,

    /// Commit message for pending worktree changes.
    #[arg(short, long)]
    pub message: Option<String>,
}

/// Arguments for the `push` command.
#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Task ID.
    pub task_id: u64,

    /// Commit message for pending worktree changes.
    #[arg(short, long)]
    pub message: Option<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_task_minimal() {
        let cli = Cli::try_parse_from(["rover", "task", "Fix the login form"]).unwrap();
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        if let Command::Task(args) = cli.command {
            assert_eq!(args.description, "Fix the login form");
            assert!(args.title.is_none());
            assert!(args.agent.is_none());
            assert!(args.workflow.is_none());
        } else {
            panic!("Expected Task command");
        }
    }

    #[test]
    fn parse_task_full() {
        let cli = Cli::try_parse_from([
            "rover", "task", "Fix it", "--title", "Login", "--agent", "codex", "--workflow",
            "swe", "--image", "my/agent:1",
        ])
        .unwrap();
        if let Command::Task(args) = cli.command {
            assert_eq!(args.title.as_deref(), Some("Login"));
            assert_eq!(args.agent, Some(AgentKind::Codex));
            assert_eq!(args.workflow.as_deref(), Some("swe"));
            assert_eq!(args.image.as_deref(), Some("my/agent:1"));
        } else {
            panic!("Expected Task command");
        }
    }

    #[test]
    fn parse_task_rejects_unknown_agent() {
        assert!(Cli::try_parse_from(["rover", "task", "x", "--agent", "copilot"]).is_err());
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rover", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_iterate() {
        let cli = Cli::try_parse_from(["rover", "iterate", "7", "Handle plus signs"]).unwrap();
        if let Command::Iterate(args) = cli.command {
            assert_eq!(args.task_id, 7);
            assert_eq!(args.instructions, "Handle plus signs");
        } else {
            panic!("Expected Iterate command");
        }
    }

    #[test]
    fn parse_logs_follow() {
        let cli = Cli::try_parse_from(["rover", "logs", "7", "-f", "--iteration", "2"]).unwrap();
        if let Command::Logs(args) = cli.command {
            assert!(args.follow);
            assert_eq!(args.iteration, Some(2));
        } else {
            panic!("Expected Logs command");
        }
    }

    #[test]
    fn parse_stop_remove_all() {
        let cli = Cli::try_parse_from(["rover", "stop", "7", "--remove-all"]).unwrap();
        if let Command::Stop(args) = cli.command {
            assert!(args.remove_all);
        } else {
            panic!("Expected Stop command");
        }
    }

    #[test]
    fn parse_interactive_prompt() {
        let cli = Cli::try_parse_from(["rover", "interactive", "7", "look at the tests"]).unwrap();
        if let Command::Interactive(args) = cli.command {
            assert_eq!(args.prompt.as_deref(), Some("look at the tests"));
        } else {
            panic!("Expected Interactive command");
        }
    }

    #[test]
    fn parse_aliases() {
        assert!(matches!(
            Cli::try_parse_from(["rover", "ls"]).unwrap().command,
            Command::List
        ));
        assert!(matches!(
            Cli::try_parse_from(["rover", "rm", "3"]).unwrap().command,
            Command::Delete(_)
        ));
    }

    #[test]
    fn parse_task_id_must_be_numeric() {
        assert!(Cli::try_parse_from(["rover", "inspect", "TASK-001"]).is_err());
    }
}
