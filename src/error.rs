//! Error types for the rover CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for rover operations.
///
/// Each variant maps to a specific exit code. Load, save and validation
/// failures are fatal to the invoking command; cleanup paths log and continue
/// instead of returning these.
#[derive(Error, Debug)]
pub enum RoverError {
    /// A task or iteration record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A record parsed but does not satisfy the current schema after migration.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A record could not be read or is not well-formed JSON/YAML.
    #[error("Failed to load {0}")]
    Load(String),

    /// A record could not be serialized or written.
    #[error("Failed to save {0}")]
    Save(String),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Git or worktree operation failed.
    #[error("Git operation failed: {0}")]
    Worktree(String),

    /// No usable container runtime (missing binary, daemon down, or an impostor CLI).
    #[error("Container backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A container create/start/stop/remove/logs call failed.
    #[error("Container operation failed: {0}")]
    ContainerOperation(String),

    /// Advisory task lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    Lock(String),
}

impl RoverError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RoverError::NotFound(_) | RoverError::UserError(_) => exit_codes::USER_ERROR,
            RoverError::Validation(_) | RoverError::Load(_) | RoverError::Save(_) => {
                exit_codes::RECORD_FAILURE
            }
            RoverError::Worktree(_) => exit_codes::GIT_FAILURE,
            RoverError::Lock(_) => exit_codes::LOCK_FAILURE,
            RoverError::BackendUnavailable(_) | RoverError::ContainerOperation(_) => {
                exit_codes::BACKEND_FAILURE
            }
        }
    }
}

/// Result type alias for rover operations.
pub type Result<T> = std::result::Result<T, RoverError>;
