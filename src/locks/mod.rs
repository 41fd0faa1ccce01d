//! Advisory per-task locks.
//!
//! Commands that mutate a task (`task`, `iterate`, `stop`, `delete`, `merge`,
//! `push`) hold `.rover/tasks/<id>/.lock` for their duration; `interactive`
//! holds it until the sandbox spec is built. `list` takes it only to write a
//! status report back and skips tasks that are busy. Other read-only
//! commands never take it.
//!
//! The lock file is created with **create_new** semantics (exclusive create)
//! and holds JSON metadata:
//! - `owner`: `user@HOST`
//! - `pid`: process id of the holder
//! - `created_at`: RFC3339 timestamp
//! - `action`: the command holding the lock
//!
//! The lock is released when its `LockGuard` is dropped. A failed release is
//! logged as a warning.

mod guard;
mod metadata;
mod operations;

#[cfg(test)]
mod tests;

pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use operations::{acquire_task_lock, read_task_lock};
