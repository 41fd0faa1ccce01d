//! Loading, validating and saving task records.

use super::{Task, TaskRecord, migrate_task_document};
use crate::error::{Result, RoverError};
use std::path::Path;

impl TaskRecord {
    /// Check invariants that the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(RoverError::Validation(
                "task id must be a positive integer".to_string(),
            ));
        }
        if self.iterations == 0 {
            return Err(RoverError::Validation(format!(
                "task {}: iterations must be at least 1",
                self.id
            )));
        }
        if self.workflow_name.trim().is_empty() {
            return Err(RoverError::Validation(format!(
                "task {}: workflowName must not be empty",
                self.id
            )));
        }
        if !self.worktree_path.is_empty() && !Path::new(&self.worktree_path).is_absolute() {
            return Err(RoverError::Validation(format!(
                "task {}: worktreePath '{}' must be absolute",
                self.id, self.worktree_path
            )));
        }
        Ok(())
    }
}

impl Task {
    /// Load a task record from `path`.
    ///
    /// A missing file is `NotFound`; unreadable or malformed JSON is `Load`;
    /// a document that migrates but still does not fit the schema is
    /// `Validation`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RoverError::NotFound(format!(
                "task record '{}' does not exist",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            RoverError::Load(format!("task record '{}': {}", path.display(), e))
        })?;
        let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            RoverError::Load(format!(
                "task record '{}': malformed JSON: {}",
                path.display(),
                e
            ))
        })?;

        let migrated = migrate_task_document(raw)?;
        let record: TaskRecord = serde_json::from_value(migrated).map_err(|e| {
            RoverError::Validation(format!("task record '{}': {}", path.display(), e))
        })?;
        record.validate()?;

        Ok(Task::from_parts(path.to_path_buf(), record))
    }

    /// Atomically write the full record back to its file.
    pub fn save(&self) -> Result<()> {
        self.record.validate()?;
        crate::fs::atomic_write_json(&self.path, &self.record)
    }
}
