//! Lifecycle mutators. Each one updates the in-memory record and then saves.

use super::{Task, TaskStatus};
use crate::error::Result;
use crate::iteration::{ExecutionPhase, IterationStatus};
use chrono::Utc;
use std::path::Path;

impl Task {
    /// Record the provisioned worktree and its branch.
    pub fn set_workspace(&mut self, worktree_path: &Path, branch_name: &str) -> Result<()> {
        self.record.worktree_path = worktree_path.to_string_lossy().into_owned();
        self.record.branch_name = branch_name.to_string();
        self.save()
    }

    /// Record the sandbox backing the current iteration.
    pub fn set_container_info(&mut self, container_id: &str, execution_status: &str) -> Result<()> {
        self.record.container_id = Some(container_id.to_string());
        self.record.execution_status = Some(execution_status.to_string());
        self.save()
    }

    /// Forget the sandbox after it was torn down.
    pub fn clear_container(&mut self) -> Result<()> {
        self.record.container_id = None;
        self.save()
    }

    pub fn mark_in_progress(&mut self) -> Result<()> {
        self.record.status = TaskStatus::InProgress;
        if self.record.started_at.is_none() {
            self.record.started_at = Some(Utc::now());
        }
        self.record.error = None;
        self.save()
    }

    pub fn mark_iterating(&mut self) -> Result<()> {
        self.record.status = TaskStatus::Iterating;
        self.record.last_iteration_at = Some(Utc::now());
        self.record.error = None;
        self.save()
    }

    /// Bump the iteration counter and return the new iteration number.
    pub fn increment_iteration(&mut self) -> Result<u32> {
        self.record.iterations += 1;
        self.record.last_iteration_at = Some(Utc::now());
        self.save()?;
        Ok(self.record.iterations)
    }

    /// Store the latest execution status reported for the sandbox.
    ///
    /// `completed` and `failed` are terminal and move the task status along.
    pub fn update_execution_status(&mut self, status: &str, error: Option<&str>) -> Result<()> {
        self.record.execution_status = Some(status.to_string());
        match status {
            "completed" => self.mark_completed(),
            "failed" => self.mark_failed(error.unwrap_or("execution failed")),
            _ => self.save(),
        }
    }

    pub fn mark_completed(&mut self) -> Result<()> {
        self.record.status = TaskStatus::Completed;
        self.record.completed_at = Some(Utc::now());
        self.record.error = None;
        self.save()
    }

    pub fn mark_failed(&mut self, error: &str) -> Result<()> {
        self.record.status = TaskStatus::Failed;
        self.record.failed_at = Some(Utc::now());
        self.record.error = Some(error.to_string());
        self.save()
    }

    pub fn mark_merged(&mut self) -> Result<()> {
        self.record.status = TaskStatus::Merged;
        self.save()
    }

    pub fn mark_pushed(&mut self) -> Result<()> {
        self.record.status = TaskStatus::Pushed;
        self.save()
    }

    /// Apply a terminal status report from the current iteration.
    ///
    /// Only active tasks are touched, so a merged task is never dragged back
    /// to `COMPLETED` by an old status file. Returns whether anything changed.
    pub fn sync_with_status(&mut self, status: &IterationStatus) -> Result<bool> {
        if !self.record.status.is_active() {
            return Ok(false);
        }
        match status.status {
            ExecutionPhase::Completed => {
                self.update_execution_status("completed", None)?;
                Ok(true)
            }
            ExecutionPhase::Failed => {
                let error = status.error.as_deref().unwrap_or("agent run failed");
                self.update_execution_status("failed", Some(error))?;
                Ok(true)
            }
            _ => {
                let phase = status.status.as_str();
                if self.record.execution_status.as_deref() == Some(phase) {
                    return Ok(false);
                }
                self.update_execution_status(phase, None)?;
                Ok(true)
            }
        }
    }
}
