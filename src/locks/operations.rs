//! Lock acquisition.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Create `lock_path` exclusively and write `metadata` into it.
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            RoverError::Lock(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                busy_error(lock_path, metadata.task_id)
            } else {
                RoverError::Lock(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        RoverError::Lock(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        RoverError::Lock(format!("failed to sync lock file: {}", e))
    })?;

    tracing::debug!(lock = %lock_path.display(), action = %metadata.action, "acquired lock");
    Ok(LockGuard::new(lock_path.to_path_buf()))
}

/// Describe who holds an existing lock.
fn busy_error(lock_path: &Path, task_id: u64) -> RoverError {
    let Ok(holder) = LockMetadata::from_file(lock_path) else {
        return RoverError::Lock(format!(
            "task {} is busy in another rover process\nLock: {}",
            task_id,
            lock_path.display()
        ));
    };
    let hint = if holder.holder_gone() {
        "The holding process has exited; delete the lock file and retry."
    } else {
        "Wait for it to finish, or delete the lock file if that process is gone."
    };
    RoverError::Lock(format!(
        "task {} is busy: {}\nLock: {}\n\n{}",
        task_id,
        holder,
        lock_path.display(),
        hint
    ))
}

/// Acquire the advisory lock for task `task_id`.
pub fn acquire_task_lock(ctx: &ProjectContext, task_id: u64, action: &str) -> Result<LockGuard> {
    let metadata = LockMetadata::new(task_id, action);
    acquire_lock(&ctx.task_lock_path(task_id), &metadata)
}

/// Metadata of the current holder of task `task_id`'s lock, if it is held.
pub fn read_task_lock(ctx: &ProjectContext, task_id: u64) -> Option<LockMetadata> {
    let path = ctx.task_lock_path(task_id);
    if !path.exists() {
        return None;
    }
    LockMetadata::from_file(&path).ok()
}
