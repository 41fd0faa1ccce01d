//! Iteration records for rover tasks.
//!
//! Each run of a task's agent is one iteration, stored under
//! `.rover/tasks/<id>/iterations/<n>/`. The iteration directory doubles as the
//! sandbox's output mount: the in-container runtime writes `status.json` and
//! the markdown artifacts there.

use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

mod status;

pub use status::{
    ExecutionPhase, IterationStatus, STATUS_FILE_NAME, StatusRead, publish_status, read_status,
};

/// Current schema version written to `iteration.json`.
pub const CURRENT_ITERATION_VERSION: &str = "1.0";

pub const ITERATION_FILE_NAME: &str = "iteration.json";

pub const PLAN_FILE: &str = "plan.md";
pub const CHANGES_FILE: &str = "changes.md";
pub const SUMMARY_FILE: &str = "summary.md";

/// Artifacts carried forward from the previous iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_number: Option<u32>,
}

/// Metadata for one iteration. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub version: String,
    pub task_id: u64,
    pub number: u32,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub previous_context: PreviousContext,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Markdown outputs the agent runtime leaves in an iteration directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationArtifacts {
    pub plan: Option<String>,
    pub changes: Option<String>,
    pub summary: Option<String>,
}

impl IterationArtifacts {
    pub fn is_empty(&self) -> bool {
        self.plan.is_none() && self.changes.is_none() && self.summary.is_none()
    }
}

/// One prior iteration, summarized for the next run's agent runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreContext {
    pub iteration_number: u32,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Access to the iterations of one task.
#[derive(Debug, Clone)]
pub struct IterationStore {
    task_id: u64,
    dir: PathBuf,
}

impl IterationStore {
    pub fn new(ctx: &ProjectContext, task_id: u64) -> Self {
        Self {
            task_id,
            dir: ctx.iterations_dir(task_id),
        }
    }

    pub fn iteration_dir(&self, number: u32) -> PathBuf {
        self.dir.join(number.to_string())
    }

    pub fn status_path(&self, number: u32) -> PathBuf {
        self.iteration_dir(number).join(STATUS_FILE_NAME)
    }

    /// Record iteration `number`, carrying forward iteration `number - 1`'s artifacts.
    ///
    /// `number` must be greater than every existing iteration.
    pub fn create(&self, number: u32, title: &str, description: &str) -> Result<Iteration> {
        if number == 0 {
            return Err(RoverError::Validation(
                "iteration numbers start at 1".to_string(),
            ));
        }
        if let Some(latest) = self.latest_number()?
            && number <= latest
        {
            return Err(RoverError::UserError(format!(
                "task {}: iteration {} already exists (latest is {})",
                self.task_id, number, latest
            )));
        }

        let previous_context = if number > 1 && self.iteration_dir(number - 1).is_dir() {
            let artifacts = self.read_artifacts(number - 1)?;
            PreviousContext {
                plan: artifacts.plan,
                changes: artifacts.changes,
                summary: artifacts.summary,
                iteration_number: Some(number - 1),
            }
        } else {
            PreviousContext::default()
        };

        let dir = self.iteration_dir(number);
        fs::create_dir_all(&self.dir).map_err(|e| {
            RoverError::Save(format!("iterations directory '{}': {}", self.dir.display(), e))
        })?;
        fs::create_dir(&dir).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                RoverError::UserError(format!(
                    "task {}: iteration {} already exists",
                    self.task_id, number
                ))
            } else {
                RoverError::Save(format!("iteration directory '{}': {}", dir.display(), e))
            }
        })?;

        let iteration = Iteration {
            version: CURRENT_ITERATION_VERSION.to_string(),
            task_id: self.task_id,
            number,
            title: title.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            previous_context,
            extra: BTreeMap::new(),
        };
        crate::fs::atomic_write_json(dir.join(ITERATION_FILE_NAME), &iteration)?;
        tracing::info!(task_id = self.task_id, iteration = number, "recorded iteration");

        Ok(iteration)
    }

    /// Load iteration `number`, migrating older documents.
    pub fn load(&self, number: u32) -> Result<Iteration> {
        let path = self.iteration_dir(number).join(ITERATION_FILE_NAME);
        if !path.exists() {
            return Err(RoverError::NotFound(format!(
                "iteration {} of task {} not found",
                number, self.task_id
            )));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| RoverError::Load(format!("iteration '{}': {}", path.display(), e)))?;
        let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            RoverError::Load(format!("iteration '{}': malformed JSON: {}", path.display(), e))
        })?;

        let migrated = migrate_iteration_document(raw, self.task_id, number)?;
        let iteration: Iteration = serde_json::from_value(migrated).map_err(|e| {
            RoverError::Validation(format!("iteration '{}': {}", path.display(), e))
        })?;
        if iteration.number != number {
            return Err(RoverError::Validation(format!(
                "iteration '{}': number {} does not match its directory",
                path.display(),
                iteration.number
            )));
        }
        Ok(iteration)
    }

    /// Existing iteration numbers, ascending.
    pub fn list_numbers(&self) -> Result<Vec<u32>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RoverError::Load(format!(
                    "iterations directory '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };
        let mut numbers: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    pub fn latest_number(&self) -> Result<Option<u32>> {
        Ok(self.list_numbers()?.last().copied())
    }

    /// The highest-numbered iteration, if any.
    pub fn latest(&self) -> Result<Option<Iteration>> {
        match self.latest_number()? {
            Some(number) => self.load(number).map(Some),
            None => Ok(None),
        }
    }

    /// Read whichever markdown artifacts exist for iteration `number`.
    pub fn read_artifacts(&self, number: u32) -> Result<IterationArtifacts> {
        let dir = self.iteration_dir(number);
        Ok(IterationArtifacts {
            plan: read_optional(&dir.join(PLAN_FILE))?,
            changes: read_optional(&dir.join(CHANGES_FILE))?,
            summary: read_optional(&dir.join(SUMMARY_FILE))?,
        })
    }

    /// Summaries of every iteration before `current`, oldest first.
    pub fn pre_contexts(&self, current: u32) -> Result<Vec<PreContext>> {
        let mut contexts = Vec::new();
        for number in self.list_numbers()?.into_iter().filter(|n| *n < current) {
            let iteration = match self.load(number) {
                Ok(iteration) => iteration,
                Err(e) => {
                    tracing::warn!(
                        task_id = self.task_id,
                        iteration = number,
                        "skipping pre-context: {}",
                        e
                    );
                    continue;
                }
            };
            let artifacts = self.read_artifacts(number)?;
            contexts.push(PreContext {
                iteration_number: number,
                title: iteration.title,
                description: iteration.description,
                plan: artifacts.plan,
                changes: artifacts.changes,
                summary: artifacts.summary,
            });
        }
        Ok(contexts)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RoverError::Load(format!("'{}': {}", path.display(), e))),
    }
}

/// Fill fields that documents without a `version` did not write.
fn migrate_iteration_document(
    value: serde_json::Value,
    task_id: u64,
    number: u32,
) -> Result<serde_json::Value> {
    let serde_json::Value::Object(mut obj) = value else {
        return Err(RoverError::Validation(
            "iteration document must be a JSON object".to_string(),
        ));
    };
    if obj.get("version").and_then(|v| v.as_str()) == Some(CURRENT_ITERATION_VERSION) {
        return Ok(serde_json::Value::Object(obj));
    }

    obj.entry("taskId").or_insert_with(|| task_id.into());
    obj.entry("number").or_insert_with(|| number.into());
    obj.entry("title").or_insert_with(|| "".into());
    obj.entry("description").or_insert_with(|| "".into());
    obj.entry("createdAt")
        .or_insert_with(|| Utc::now().to_rfc3339().into());
    obj.entry("previousContext")
        .or_insert_with(|| serde_json::json!({}));
    obj.insert("version".to_string(), CURRENT_ITERATION_VERSION.into());

    Ok(serde_json::Value::Object(obj))
}
