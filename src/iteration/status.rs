//! The file-based status channel.
//!
//! The in-container runtime overwrites `status.json` in the iteration output
//! directory; the host only ever reads it. Producers are not guaranteed to
//! write atomically, so a file that fails to parse means "not ready yet",
//! never a hard error.
//!
//! Like the task and iteration records the document is versioned. Older
//! runtimes wrote snake_case keys and no `version`; those are migrated on read.

use crate::error::{Result, RoverError};
use crate::task::is_newer_version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

pub const STATUS_FILE_NAME: &str = "status.json";

/// Current schema version of `status.json`.
pub const CURRENT_STATUS_VERSION: &str = "1.0";

const LEGACY_KEYS: &[(&str, &str)] = &[
    ("task_id", "taskId"),
    ("current_step", "currentStep"),
    ("started_at", "startedAt"),
    ("updated_at", "updatedAt"),
    ("completed_at", "completedAt"),
];

/// Phase reported by the agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPhase {
    Initializing,
    Installing,
    Running,
    Completed,
    Failed,
}

impl ExecutionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionPhase::Completed | ExecutionPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::Initializing => "initializing",
            ExecutionPhase::Installing => "installing",
            ExecutionPhase::Running => "running",
            ExecutionPhase::Completed => "completed",
            ExecutionPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of `status.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationStatus {
    pub version: String,

    #[serde(deserialize_with = "string_or_number")]
    pub task_id: String,

    pub status: ExecutionPhase,

    #[serde(default)]
    pub current_step: String,

    /// Percentage, rounded and clamped to 0..=100 on read.
    #[serde(default, deserialize_with = "percent")]
    pub progress: u8,

    pub started_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IterationStatus {
    pub fn new(task_id: &str, status: ExecutionPhase, current_step: &str, progress: u8) -> Self {
        let now = Utc::now();
        Self {
            version: CURRENT_STATUS_VERSION.to_string(),
            task_id: task_id.to_string(),
            status,
            current_step: current_step.to_string(),
            progress: progress.min(100),
            started_at: now,
            updated_at: now,
            completed_at: status.is_terminal().then_some(now),
            error: None,
        }
    }
}

/// Outcome of polling a status file.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusRead {
    /// No status file has been written yet.
    Missing,
    /// A file exists but is unreadable or partially written.
    NotReady(String),
    Ready(IterationStatus),
}

impl StatusRead {
    pub fn ready(self) -> Option<IterationStatus> {
        match self {
            StatusRead::Ready(status) => Some(status),
            _ => None,
        }
    }
}

/// Read `status.json` without ever failing.
pub fn read_status<P: AsRef<Path>>(path: P) -> StatusRead {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StatusRead::Missing,
        Err(e) => return StatusRead::NotReady(format!("unreadable: {}", e)),
    };
    if content.trim().is_empty() {
        return StatusRead::NotReady("empty".to_string());
    }
    match parse_status(&content) {
        Ok(status) => StatusRead::Ready(status),
        Err(e) => {
            tracing::debug!(path = %path.display(), "status not ready: {}", e);
            StatusRead::NotReady(e)
        }
    }
}

fn parse_status(content: &str) -> std::result::Result<IterationStatus, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let value = migrate_status_document(value).map_err(|e| e.to_string())?;
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Bring a status document to `CURRENT_STATUS_VERSION`.
///
/// Documents from a newer runtime are rejected rather than guessed at.
pub fn migrate_status_document(value: Value) -> Result<Value> {
    let Value::Object(mut obj) = value else {
        return Err(RoverError::Validation(
            "status document must be a JSON object".to_string(),
        ));
    };

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if version == CURRENT_STATUS_VERSION {
        return Ok(Value::Object(obj));
    }
    if is_newer_version(&version, CURRENT_STATUS_VERSION) {
        return Err(RoverError::Validation(format!(
            "status version {} is newer than supported {}",
            version, CURRENT_STATUS_VERSION
        )));
    }

    rename_legacy_keys(&mut obj);
    obj.insert(
        "version".to_string(),
        Value::String(CURRENT_STATUS_VERSION.to_string()),
    );
    Ok(Value::Object(obj))
}

fn rename_legacy_keys(obj: &mut Map<String, Value>) {
    for (old, new) in LEGACY_KEYS {
        if let Some(value) = obj.remove(*old)
            && !obj.contains_key(*new)
        {
            obj.insert((*new).to_string(), value);
        }
    }
}

/// Write a status document atomically (producer side).
pub fn publish_status<P: AsRef<Path>>(path: P, status: &IterationStatus) -> Result<()> {
    if status.version == CURRENT_STATUS_VERSION {
        return crate::fs::atomic_write_json(path, status);
    }
    let mut status = status.clone();
    status.version = CURRENT_STATUS_VERSION.to_string();
    crate::fs::atomic_write_json(path, &status)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Any JSON number (or null) as a whole percentage.
fn percent<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if value.is_nan() {
        return Ok(0);
    }
    if !(0.0..=100.0).contains(&value) {
        tracing::debug!(progress = value, "clamping out-of-range progress");
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}
