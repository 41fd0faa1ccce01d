//! Rover: run AI coding agents in sandboxed containers, one git worktree per task.
//!
//! This is the main entry point for the `rover` CLI. It parses arguments,
//! sets up logging, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod agent;
mod cli;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod git_worktree;
pub mod iteration;
mod launch;
pub mod locks;
mod logging;
mod output;
pub mod sandbox;
pub mod task;

#[cfg(test)]
mod test_support;

use cli::Cli;
use output::Output;
use sandbox::interrupt;
use std::process::ExitCode;

fn main() -> ExitCode {
    interrupt::install();
    let cli = Cli::parse_args();
    logging::init(cli.verbose);
    let out = Output::new(cli.json, cli.verbose);

    let code = match commands::dispatch(cli.command, out) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!("command failed: {:?}", err);
            out.error(&err);
            err.exit_code()
        }
    };

    if interrupt::interrupted() && code == exit_codes::SUCCESS {
        return ExitCode::from(interrupt::INTERRUPTED_EXIT_CODE as u8);
    }
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
