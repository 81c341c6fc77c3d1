// Task collection mirrored to a key-value blob

use crate::blob::BlobStore;
use crate::error::TaskError;
use crate::filter::Filter;
use crate::models::{Stats, Task, TaskFields};
use eyre::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Default storage slot, shared with the browser version of the tracker
pub const DEFAULT_STORAGE_KEY: &str = "universityTasks";

/// Answers the "are you sure?" prompt before a delete
pub trait Confirm {
    fn confirm(&mut self, task: &Task) -> bool;
}

impl<F: FnMut(&Task) -> bool> Confirm for F {
    fn confirm(&mut self, task: &Task) -> bool {
        self(task)
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    NotFound,
}

/// Ordered task collection, newest first, persisted after every mutation
pub struct TaskStore<B: BlobStore> {
    blob: B,
    key: String,
    tasks: Vec<Task>,
    filter: Filter,
}

impl<B: BlobStore> TaskStore<B> {
    /// Load the collection stored under `key`
    ///
    /// A missing or unreadable blob yields an empty collection. Only a
    /// failure of the backend itself is returned as an error.
    pub fn open(blob: B, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        crate::blob::validate_key(&key)?;

        let raw = blob.get(&key).context("Failed to read task blob")?;
        let tasks = match raw {
            Some(raw) => decode_tasks(&key, &raw),
            None => {
                debug!(key, "No stored tasks, starting empty");
                Vec::new()
            }
        };

        info!(key, count = tasks.len(), "Loaded tasks");

        Ok(Self {
            blob,
            key,
            tasks,
            filter: Filter::default(),
        })
    }

    /// Storage slot this store writes to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full collection in display order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task from form input and return its id
    pub fn create(&mut self, fields: TaskFields) -> Result<String> {
        let task = Task::new(fields)?;
        let id = task.id.clone();

        self.tasks.insert(0, task);
        self.save()?;

        info!(id, "Created task");
        Ok(id)
    }

    /// Pre-filled form input for editing an existing task
    ///
    /// The task stays in the store until `update` succeeds.
    pub fn edit(&self, id: &str) -> Result<TaskFields> {
        self.get(id)
            .map(Task::to_fields)
            .ok_or_else(|| TaskError::NotFound(id.to_string()).into())
    }

    /// Replace a task with one recreated from `fields`
    ///
    /// The replacement gets a fresh id and timestamp, starts pending and
    /// moves to the front. Nothing changes if the id is unknown or the
    /// fields fail validation.
    pub fn update(&mut self, id: &str, fields: TaskFields) -> Result<String> {
        let index = self.position(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let replacement = Task::new(fields)?;
        let new_id = replacement.id.clone();

        self.tasks.remove(index);
        self.tasks.insert(0, replacement);
        self.save()?;

        info!(old_id = id, new_id, "Updated task");
        Ok(new_id)
    }

    /// Flip the completed flag; `None` if the id is unknown
    pub fn toggle_complete(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "Toggle ignored, no such task");
            return Ok(None);
        };

        task.completed = !task.completed;
        let completed = task.completed;
        self.save()?;

        debug!(id, completed, "Toggled task");
        Ok(Some(completed))
    }

    /// Remove a task once `confirm` agrees
    pub fn delete(&mut self, id: &str, confirm: &mut impl Confirm) -> Result<DeleteOutcome> {
        let Some(index) = self.position(id) else {
            debug!(id, "Delete ignored, no such task");
            return Ok(DeleteOutcome::NotFound);
        };

        if !confirm.confirm(&self.tasks[index]) {
            debug!(id, "Delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        self.tasks.remove(index);
        self.save()?;

        info!(id, "Deleted task");
        Ok(DeleteOutcome::Deleted)
    }

    /// Merge tasks from an exported blob, skipping known ids and blank titles
    ///
    /// The merged collection is reordered newest first by `created_at`.
    /// Returns the number of tasks added.
    pub fn import(&mut self, incoming: Vec<Task>) -> Result<usize> {
        let mut seen: HashSet<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let mut added = 0;

        for task in incoming {
            if task.title.trim().is_empty() {
                warn!(id = task.id, "Skipping imported task without a title");
                continue;
            }
            if !seen.insert(task.id.clone()) {
                debug!(id = task.id, "Skipping imported task with known id");
                continue;
            }
            self.tasks.push(task);
            added += 1;
        }

        if added > 0 {
            self.tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            self.save()?;
        }

        info!(added, "Imported tasks");
        Ok(added)
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Change the active view; the collection is untouched
    pub fn set_filter(&mut self, filter: Filter) {
        debug!(%filter, "Filter changed");
        self.filter = filter;
    }

    /// Tasks matching `filter`, in collection order
    pub fn list(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    /// Tasks matching the active filter
    pub fn visible(&self) -> Vec<&Task> {
        self.list(self.filter)
    }

    /// Counts over the whole collection, independent of the filter
    pub fn stats(&self) -> Stats {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Stats {
            total,
            completed,
            pending: total - completed,
        }
    }

    /// Serialized collection, as written to the blob
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.tasks).context("Failed to serialize tasks")
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn save(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.tasks).context("Failed to serialize tasks")?;
        self.blob.set(&self.key, &json).context("Failed to write task blob")?;
        debug!(key = self.key, count = self.tasks.len(), "Saved tasks");
        Ok(())
    }
}

/// Decode a stored blob record by record
///
/// Records that fail to parse, have a blank title or repeat an id are
/// dropped one at a time; the rest of the collection survives.
fn decode_tasks(key: &str, raw: &str) -> Vec<Task> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(key, error = ?e, "Stored tasks are not a JSON array, starting empty");
            return Vec::new();
        }
    };

    let parsed = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<Task>(value) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(key, index, error = ?e, "Failed to parse stored task, skipping");
                None
            }
        });

    let mut seen = HashSet::new();
    parsed
        .filter(|task| {
            if task.title.trim().is_empty() {
                warn!(key, id = task.id, "Dropping stored task without a title");
                return false;
            }
            if !seen.insert(task.id.clone()) {
                warn!(key, id = task.id, "Dropping stored task with duplicate id");
                return false;
            }
            true
        })
        .collect()
}
