//! Task records for rover.
//!
//! A task is persisted as `.rover/tasks/<id>/description.json`. The document
//! is versioned: on load, older documents are migrated to the current schema
//! before being deserialized and validated.
//!
//! # Task File Format
//!
//! ```text
//! {
//!   "version": "1.1",
//!   "id": 7,
//!   "uuid": "5a0f...",
//!   "title": "Add retry to the HTTP client",
//!   "description": "...",
//!   "status": "IN_PROGRESS",
//!   "createdAt": "2026-10-19T10:00:00Z",
//!   "iterations": 1,
//!   "workflowName": "swe",
//!   "worktreePath": "/repo/.rover/tasks/7/workspace",
//!   "branchName": "rover-task-7-k3j9x2"
//! }
//! ```
//!
//! No file locking happens here: a single writer per task directory is
//! assumed, and callers that mutate take the advisory lock in `crate::locks`.

use crate::agent::AgentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod io;
mod migrate;
mod mutations;
mod store;

pub use migrate::{is_newer_version, migrate_task_document};
pub use store::TaskStore;

/// Current schema version written to `description.json`.
pub const CURRENT_TASK_VERSION: &str = "1.1";

/// Name of the task record file inside a task directory.
pub const TASK_FILE_NAME: &str = "description.json";

/// Workflow used when neither the caller nor the project picks one.
pub const DEFAULT_WORKFLOW: &str = "swe";

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    New,
    InProgress,
    Iterating,
    Completed,
    Failed,
    Merged,
    Pushed,
}

impl TaskStatus {
    /// Whether a sandbox is expected to be running for this task.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Iterating)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "NEW",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Iterating => "ITERATING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Merged => "MERGED",
            TaskStatus::Pushed => "PUSHED",
        }
    }

    /// Parse current and legacy spellings (`in-progress`, `running`, `done`, ...).
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "NEW" | "PENDING" => Some(TaskStatus::New),
            "IN_PROGRESS" | "RUNNING" | "STARTED" => Some(TaskStatus::InProgress),
            "ITERATING" => Some(TaskStatus::Iterating),
            "COMPLETED" | "DONE" => Some(TaskStatus::Completed),
            "FAILED" | "ERROR" => Some(TaskStatus::Failed),
            "MERGED" => Some(TaskStatus::Merged),
            "PUSHED" => Some(TaskStatus::Pushed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted fields of a task.
///
/// Unknown fields are kept in `extra` so a newer rover's additions survive a
/// round trip through an older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Schema version of this document.
    pub version: String,

    /// Positive integer id, stable once assigned.
    pub id: u64,

    pub uuid: Uuid,

    pub title: String,

    pub description: String,

    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_iteration_at: Option<DateTime<Utc>>,

    /// Number of the current (latest) iteration, starting at 1.
    pub iterations: u32,

    pub workflow_name: String,

    /// Absolute path of the task's git worktree; empty until provisioned.
    #[serde(default)]
    pub worktree_path: String,

    #[serde(default)]
    pub branch_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,

    /// Image pinned for this task (overrides the project image).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TaskRecord {
    /// A fresh record in `NEW` status at iteration 1.
    pub fn new(id: u64, title: &str, description: &str, workflow_name: &str) -> Self {
        Self {
            version: CURRENT_TASK_VERSION.to_string(),
            id,
            uuid: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::New,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failed_at: None,
            last_iteration_at: None,
            iterations: 1,
            workflow_name: workflow_name.to_string(),
            worktree_path: String::new(),
            branch_name: String::new(),
            agent: None,
            agent_image: None,
            container_id: None,
            execution_status: None,
            error: None,
            extra: BTreeMap::new(),
        }
    }
}

/// A task record bound to the file it was loaded from.
///
/// Mutators change the in-memory record and then persist it with `save()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    path: PathBuf,
    pub record: TaskRecord,
}

impl Task {
    pub(crate) fn from_parts(path: PathBuf, record: TaskRecord) -> Self {
        Self { path, record }
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Path of `description.json`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The task directory (`.rover/tasks/<id>`).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Worktree path, if one has been provisioned.
    pub fn worktree(&self) -> Option<&Path> {
        if self.record.worktree_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.record.worktree_path))
        }
    }
}
