// Data models for assignment tracking

use crate::error::TaskError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored when a task is created without a subject
pub const NO_SUBJECT: &str = "No subject";

/// Stored when a task is created without a description
pub const NO_DESCRIPTION: &str = "No description";

/// Input format for due dates
pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// A single assignment entry
///
/// Field names serialize in camelCase so a blob exported from the browser
/// version of the tracker loads unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build a new pending task from form input
    ///
    /// Fails with `TaskError::Validation` when the title is blank. Blank
    /// subject and description fall back to their placeholders.
    pub fn new(fields: TaskFields) -> Result<Self, TaskError> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("title is required".to_string()));
        }

        Ok(Self {
            id: new_task_id(),
            title: title.to_string(),
            subject: or_placeholder(&fields.subject, NO_SUBJECT),
            due_date: fields.due_date,
            priority: fields.priority,
            description: or_placeholder(&fields.description, NO_DESCRIPTION),
            completed: false,
            created_at: Utc::now(),
        })
    }

    /// Form state pre-filled from this task
    pub fn to_fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            subject: self.subject.clone(),
            due_date: self.due_date,
            priority: self.priority,
            description: self.description.clone(),
        }
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// Time-ordered unique id for a new task
pub fn new_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Display label used by the renderer
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(TaskError::InvalidPriority(s.to_string())),
        }
    }
}

/// Form input for creating or editing a task
///
/// Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub subject: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub description: String,
}

impl TaskFields {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Parse a `YYYY-MM-DD` due date; blank input means no date
pub fn parse_due_date(input: &str) -> Result<Option<NaiveDate>, TaskError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, DATE_INPUT_FORMAT)
        .map(Some)
        .map_err(|_| TaskError::InvalidDate(input.to_string()))
}

/// Summary counts over the whole collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}
