//! Exit code constants for the rover CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state, missing task)
//! - 2: Record failure (load/save/validation of task or iteration files)
//! - 3: Git or worktree operation failure
//! - 4: Advisory lock held by another invocation
//! - 5: Container backend failure (unavailable runtime or failed operation)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid state, or unknown task.
pub const USER_ERROR: i32 = 1;

/// Task/iteration record could not be loaded, saved, or validated.
pub const RECORD_FAILURE: i32 = 2;

/// Git operation failure: worktree add/remove, branch, merge, push.
pub const GIT_FAILURE: i32 = 3;

/// Lock acquisition failure: the task is locked by another invocation.
pub const LOCK_FAILURE: i32 = 4;

/// Container runtime missing, misidentified, or a lifecycle call failed.
pub const BACKEND_FAILURE: i32 = 5;
