// Text rendering of tasks, counts and filter toggles

use crate::filter::Filter;
use crate::models::{Priority, Stats, Task};
use colored::{Color, Colorize};
use std::fmt::Write;

/// Shown instead of a due date when a task has none
pub const NO_DATE: &str = "No date";

/// Shown instead of a list when the active filter matches nothing
pub const EMPTY_STATE: &str = "No tasks here yet. Add one to get started.";

/// A per-task control, routed back to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Toggle(String),
    Edit(String),
    Delete(String),
}

impl Action {
    /// The three controls offered for a task
    pub fn controls(task: &Task) -> [Action; 3] {
        [
            Action::Toggle(task.id.clone()),
            Action::Edit(task.id.clone()),
            Action::Delete(task.id.clone()),
        ]
    }

    /// Parse `toggle <id>`, `edit <id>` or `delete <id>`
    pub fn parse(verb: &str, id: &str) -> Option<Action> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        match verb {
            "toggle" | "complete" | "reopen" => Some(Action::Toggle(id.to_string())),
            "edit" => Some(Action::Edit(id.to_string())),
            "delete" | "rm" => Some(Action::Delete(id.to_string())),
            _ => None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Action::Toggle(id) | Action::Edit(id) | Action::Delete(id) => id,
        }
    }

    /// Button label; the toggle reads differently once a task is done
    pub fn label(&self, task: &Task) -> &'static str {
        match self {
            Action::Toggle(_) if task.completed => "reopen",
            Action::Toggle(_) => "complete",
            Action::Edit(_) => "edit",
            Action::Delete(_) => "delete",
        }
    }
}

/// Renders snapshots of the store as terminal text
#[derive(Debug, Clone)]
pub struct Renderer {
    date_format: String,
    color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new("%d/%m/%Y", true)
    }
}

impl Renderer {
    pub fn new(date_format: impl Into<String>, color: bool) -> Self {
        Self {
            date_format: date_format.into(),
            color,
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_due_date(&self, task: &Task) -> String {
        match task.due_date {
            Some(date) => date.format(&self.date_format).to_string(),
            None => NO_DATE.to_string(),
        }
    }

    pub fn priority_badge(&self, priority: Priority) -> String {
        let color = match priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        self.paint(&format!("[{}]", priority.label()), color)
    }

    pub fn status(&self, task: &Task) -> String {
        if task.completed {
            self.paint("Completed", Color::Green)
        } else {
            self.paint("Pending", Color::Yellow)
        }
    }

    /// One task, several lines, no trailing newline
    pub fn render_task(&self, task: &Task) -> String {
        let title = if task.completed && self.color {
            task.title.as_str().strikethrough().to_string()
        } else {
            self.bold(&task.title)
        };

        let controls = Action::controls(task)
            .iter()
            .map(|action| action.label(task))
            .collect::<Vec<_>>()
            .join(" | ");

        let mut out = String::new();
        let _ = writeln!(out, "{} {}  {}", self.priority_badge(task.priority), title, self.status(task));
        let _ = writeln!(out, "    {}", task.subject);
        let _ = writeln!(out, "    {}", task.description);
        let _ = writeln!(out, "    Due: {}", self.format_due_date(task));
        let _ = write!(out, "    {}  {}", self.paint(&task.id, Color::BrightBlack), controls);
        out
    }

    /// All given tasks, or the empty-state line
    pub fn render_list(&self, tasks: &[&Task]) -> String {
        if tasks.is_empty() {
            return self.paint(EMPTY_STATE, Color::BrightBlack);
        }

        tasks
            .iter()
            .map(|task| self.render_task(task))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn render_stats(&self, stats: &Stats) -> String {
        format!(
            "Total: {}  Completed: {}  Pending: {}",
            self.bold(&stats.total.to_string()),
            self.paint(&stats.completed.to_string(), Color::Green),
            self.paint(&stats.pending.to_string(), Color::Yellow),
        )
    }

    /// Filter toggles with the active one bracketed
    pub fn render_filter_bar(&self, active: Filter) -> String {
        Filter::ALL
            .iter()
            .map(|filter| {
                if *filter == active {
                    self.bold(&format!("[{}]", filter.label()))
                } else {
                    format!(" {} ", filter.label())
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
