//! What a lock file says about its holder.

use crate::error::{Result, RoverError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    #[serde(default)]
    pub task_id: u64,

    /// `user@HOST`
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,

    /// Command holding the lock (iterate/stop/merge/...).
    pub action: String,
}

impl LockMetadata {
    /// Metadata for the current process taking task `task_id`'s lock.
    pub fn new(task_id: u64, action: &str) -> Self {
        Self {
            task_id,
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RoverError::Lock(format!("failed to read lock '{}': {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| RoverError::Lock(format!("failed to parse lock '{}': {}", path.display(), e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RoverError::Lock(format!("failed to serialize lock metadata: {}", e)))
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Age as `3m`, `2h 5m` or `1d 4h`.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let (days, hours, minutes) = (age.num_days(), age.num_hours(), age.num_minutes());
        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Whether the holder is a process on this host that has exited.
    ///
    /// Locks from other hosts, or without a pid, are never reported stale.
    pub fn holder_gone(&self) -> bool {
        let Some(pid) = self.pid else {
            return false;
        };
        if self.owner != owner_string() {
            return false;
        }
        !process_exists(pid)
    }
}

impl fmt::Display for LockMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` by {}", self.action, self.owner)?;
        if let Some(pid) = self.pid {
            write!(f, " (pid {})", pid)?;
        }
        write!(f, ", {} ago", self.age_string())
    }
}

#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs the permission and existence checks only.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_exists(_pid: u32) -> bool {
    true
}

fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}@{}", user, host)
}
