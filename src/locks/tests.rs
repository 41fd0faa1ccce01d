//! Tests for task locks.

use super::*;
use crate::context::ProjectContext;
use crate::error::RoverError;
use chrono::{Duration, Utc};
use tempfile::TempDir;

fn ctx() -> (TempDir, ProjectContext) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = ProjectContext::at(temp_dir.path().to_path_buf());
    (temp_dir, ctx)
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::new(3, "iterate");

    assert!(meta.owner.contains('@'));
    assert_eq!(meta.pid, Some(std::process::id()));
    assert_eq!(meta.action, "iterate");
    assert_eq!(meta.task_id, 3);
    assert!(!meta.holder_gone());
    assert!(meta.age().num_minutes() < 1);
}

#[test]
fn test_age_string() {
    let mut meta = LockMetadata::new(3, "stop");
    meta.created_at = Utc::now() - Duration::minutes(125);
    assert_eq!(meta.age_string(), "2h 5m");

    meta.created_at = Utc::now() - Duration::hours(28);
    assert_eq!(meta.age_string(), "1d 4h");
}

#[test]
fn test_acquire_writes_metadata_and_releases_on_drop() {
    let (_temp, ctx) = ctx();

    {
        let guard = acquire_task_lock(&ctx, 7, "iterate").unwrap();
        assert_eq!(guard.path(), ctx.task_lock_path(7));

        let holder = read_task_lock(&ctx, 7).unwrap();
        assert_eq!(holder.action, "iterate");
    }

    assert!(!ctx.task_lock_path(7).exists());
    assert!(read_task_lock(&ctx, 7).is_none());
}

#[test]
fn test_second_acquire_fails_with_lock_error() {
    let (_temp, ctx) = ctx();
    let _guard = acquire_task_lock(&ctx, 3, "merge").unwrap();

    let err = acquire_task_lock(&ctx, 3, "push").unwrap_err();
    assert!(matches!(err, RoverError::Lock(_)));
    let msg = err.to_string();
    assert!(msg.contains("merge"));
    assert!(msg.contains("delete the lock file"));
}

#[test]
fn test_locks_are_per_task() {
    let (_temp, ctx) = ctx();
    let _a = acquire_task_lock(&ctx, 1, "stop").unwrap();
    let _b = acquire_task_lock(&ctx, 2, "stop").unwrap();
}

#[test]
fn test_release_tolerates_deleted_task_dir() {
    let (_temp, ctx) = ctx();
    let guard = acquire_task_lock(&ctx, 4, "delete").unwrap();
    std::fs::remove_dir_all(ctx.task_dir(4)).unwrap();

    guard.release().unwrap();
}

#[cfg(unix)]
#[test]
fn test_exited_holder_is_reported() {
    let (_temp, ctx) = ctx();
    let mut child = std::process::Command::new("true").spawn().unwrap();
    child.wait().unwrap();

    let mut holder = LockMetadata::new(5, "iterate");
    holder.pid = Some(child.id());
    std::fs::create_dir_all(ctx.task_dir(5)).unwrap();
    std::fs::write(ctx.task_lock_path(5), holder.to_json().unwrap()).unwrap();

    let err = acquire_task_lock(&ctx, 5, "stop").unwrap_err();
    assert!(err.to_string().contains("has exited"));
}
