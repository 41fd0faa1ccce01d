//! Task directory management: id allocation, lookup, listing and deletion.

use super::{TASK_FILE_NAME, Task, TaskRecord};
use crate::context::ProjectContext;
use crate::error::{Result, RoverError};
use std::fs;
use std::io::ErrorKind;

/// Attempts at claiming a fresh task id before giving up.
const MAX_ID_ATTEMPTS: u32 = 16;

/// Access to the task records under `.rover/tasks`.
#[derive(Debug, Clone)]
pub struct TaskStore {
    ctx: ProjectContext,
}

impl TaskStore {
    pub fn new(ctx: &ProjectContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Highest existing numeric task directory plus one.
    pub fn next_id(&self) -> Result<u64> {
        Ok(self.existing_ids()?.last().copied().unwrap_or(0) + 1)
    }

    /// Create and persist a new task in `NEW` status.
    ///
    /// The id is claimed by creating its directory exclusively, so two
    /// concurrent creators never share an id.
    pub fn create(&self, title: &str, description: &str, workflow_name: &str) -> Result<Task> {
        fs::create_dir_all(&self.ctx.tasks_dir).map_err(|e| {
            RoverError::Save(format!(
                "tasks directory '{}': {}",
                self.ctx.tasks_dir.display(),
                e
            ))
        })?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.next_id()?;
            let dir = self.ctx.task_dir(id);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    let record = TaskRecord::new(id, title, description, workflow_name);
                    let task = Task::from_parts(dir.join(TASK_FILE_NAME), record);
                    task.save()?;
                    tracing::info!(task_id = id, "created task");
                    return Ok(task);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(task_id = id, "task id claimed concurrently, retrying");
                    continue;
                }
                Err(e) => {
                    return Err(RoverError::Save(format!(
                        "task directory '{}': {}",
                        dir.display(),
                        e
                    )));
                }
            }
        }

        Err(RoverError::Save(format!(
            "task: could not allocate an id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    /// Load task `id`.
    pub fn load(&self, id: u64) -> Result<Task> {
        let path = self.ctx.task_dir(id).join(TASK_FILE_NAME);
        Task::load(&path).map_err(|e| match e {
            RoverError::NotFound(_) => RoverError::NotFound(format!(
                "task {} not found. Run `rover list` to see existing tasks.",
                id
            )),
            other => other,
        })
    }

    /// All loadable tasks sorted by id. Unloadable records are skipped with a warning.
    pub fn list(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for id in self.existing_ids()? {
            match self.load(id) {
                Ok(task) => tasks.push(task),
                Err(e) => tracing::warn!(task_id = id, "skipping task: {}", e),
            }
        }
        Ok(tasks)
    }

    /// Remove the task directory and everything in it.
    pub fn delete(&self, id: u64) -> Result<()> {
        let dir = self.ctx.task_dir(id);
        if !dir.exists() {
            return Err(RoverError::NotFound(format!("task {} not found", id)));
        }
        fs::remove_dir_all(&dir).map_err(|e| {
            RoverError::Save(format!("task directory '{}' removal: {}", dir.display(), e))
        })
    }

    fn existing_ids(&self) -> Result<Vec<u64>> {
        let entries = match fs::read_dir(&self.ctx.tasks_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RoverError::Load(format!(
                    "tasks directory '{}': {}",
                    self.ctx.tasks_dir.display(),
                    e
                )));
            }
        };

        let mut ids: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u64>().ok())
            .filter(|id| *id > 0)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
