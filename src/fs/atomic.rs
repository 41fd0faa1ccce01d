//! Atomic filesystem operations for rover.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! On POSIX `rename()` replaces the destination atomically as long as source
//! and destination share a filesystem, which is why the temp file lives next
//! to the target. On crash a `.{filename}.{suffix}.tmp` file may remain.
//!
//! `atomic_write_private` creates the temp file owner-only (0600 on unix), so
//! secrets are never readable by other users, not even before the rename.

use crate::error::{Result, RoverError};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    write_via_temp(path.as_ref(), content, Access::Default)
}

/// Atomically write a string readable only by the current user.
pub fn atomic_write_private<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    write_via_temp(path.as_ref(), content.as_bytes(), Access::OwnerOnly)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Default,
    OwnerOnly,
}

fn write_via_temp(path: &Path, content: &[u8], access: Access) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            RoverError::Save(format!(
                "parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content, access)?;
    atomic_replace(&temp_path, path)?;

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Serialize `value` as pretty JSON (with a trailing newline) and write it atomically.
pub fn atomic_write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(value).map_err(|e| {
        RoverError::Save(format!("'{}': failed to serialize JSON: {}", path.display(), e))
    })?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

/// Generate a temporary file path in the same directory as the target.
///
/// The random suffix keeps two writers of the same record from clobbering
/// each other's temp file; the last rename still wins.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            RoverError::Save(format!("'{}': invalid file path", target.display()))
        })?;

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    Ok(parent.join(format!(".{}.{}.tmp", filename, &suffix[..8])))
}

fn create_temp(path: &Path, access: Access) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    if access == Access::OwnerOnly {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = access;
    options.open(path)
}

fn write_and_sync(path: &Path, content: &[u8], access: Access) -> Result<()> {
    let mut file = create_temp(path, access).map_err(|e| {
        RoverError::Save(format!(
            "temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        RoverError::Save(format!("temporary file '{}': {}", path.display(), e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        RoverError::Save(format!(
            "temporary file '{}': failed to sync to disk: {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        RoverError::Save(format!("'{}': atomic replace failed: {}", target.display(), e))
    })?;

    // Persist the directory entry as well.
    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
