//! Schema migration for task documents.
//!
//! Migration works on the raw JSON value so documents that would not
//! deserialize into the current `TaskRecord` (renamed keys, lowercase status,
//! missing uuid) can still be brought forward.

use super::{CURRENT_TASK_VERSION, DEFAULT_WORKFLOW, TaskStatus};
use crate::error::{Result, RoverError};
use chrono::Utc;
use serde_json::{Map, Value};

/// Keys written in snake_case by pre-1.1 documents.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("created_at", "createdAt"),
    ("started_at", "startedAt"),
    ("completed_at", "completedAt"),
    ("failed_at", "failedAt"),
    ("last_iteration_at", "lastIterationAt"),
    ("workflow_name", "workflowName"),
    ("worktree_path", "worktreePath"),
    ("branch_name", "branchName"),
    ("container_id", "containerId"),
    ("execution_status", "executionStatus"),
    ("agent_image", "agentImage"),
];

/// Bring a task document to `CURRENT_TASK_VERSION`.
///
/// Documents already at the current version are returned untouched; ones
/// written by a newer rover are rejected. The result still has to pass
/// deserialization and `validate` before use.
pub fn migrate_task_document(value: Value) -> Result<Value> {
    let Value::Object(mut obj) = value else {
        return Err(RoverError::Validation(
            "task document must be a JSON object".to_string(),
        ));
    };

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if version == CURRENT_TASK_VERSION {
        return Ok(Value::Object(obj));
    }
    if is_newer_version(&version, CURRENT_TASK_VERSION) {
        return Err(RoverError::Validation(format!(
            "task version {} is newer than supported {}; upgrade rover",
            version, CURRENT_TASK_VERSION
        )));
    }

    tracing::debug!(
        from = if version.is_empty() { "<none>" } else { version.as_str() },
        to = CURRENT_TASK_VERSION,
        "migrating task document"
    );

    rename_legacy_keys(&mut obj);

    if let Some(Value::String(status)) = obj.get("status")
        && let Some(parsed) = TaskStatus::parse_lenient(status)
    {
        obj.insert("status".to_string(), Value::String(parsed.as_str().to_string()));
    }
    if !obj.contains_key("status") {
        obj.insert("status".to_string(), Value::String("NEW".to_string()));
    }

    if !obj.get("uuid").is_some_and(Value::is_string) {
        obj.insert(
            "uuid".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }

    let iterations_valid = obj
        .get("iterations")
        .and_then(Value::as_u64)
        .is_some_and(|n| n >= 1);
    if !iterations_valid {
        obj.insert("iterations".to_string(), Value::from(1));
    }

    if !obj.get("workflowName").is_some_and(Value::is_string) {
        obj.insert(
            "workflowName".to_string(),
            Value::String(DEFAULT_WORKFLOW.to_string()),
        );
    }

    if !obj.contains_key("createdAt") {
        obj.insert("createdAt".to_string(), Value::String(Utc::now().to_rfc3339()));
    }

    for key in ["worktreePath", "branchName", "description"] {
        if !obj.get(key).is_some_and(Value::is_string) {
            obj.insert(key.to_string(), Value::String(String::new()));
        }
    }

    obj.insert(
        "version".to_string(),
        Value::String(CURRENT_TASK_VERSION.to_string()),
    );

    Ok(Value::Object(obj))
}

/// Whether dotted `version` is strictly newer than `current`.
///
/// Empty or unparsable versions count as older.
pub fn is_newer_version(version: &str, current: &str) -> bool {
    fn parts(v: &str) -> Option<Vec<u64>> {
        v.trim().split('.').map(|p| p.parse().ok()).collect()
    }
    match (parts(version), parts(current)) {
        (Some(v), Some(c)) => v > c,
        _ => false,
    }
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
