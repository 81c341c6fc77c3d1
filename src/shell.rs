// Interactive shell: the form, filter toggles and per-task buttons

use crate::blob::BlobStore;
use crate::error::TaskError;
use crate::filter::Filter;
use crate::models::{Priority, Task, TaskFields, parse_due_date};
use crate::render::{Action, Renderer};
use crate::store::{DeleteOutcome, TaskStore};
use eyre::Result;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  add                 fill in the form and create a task
  edit <id>           change a task (fields are pre-filled)
  toggle <id>         mark a task completed or pending
  delete <id>         remove a task after confirmation
  filter <value>      show all, completed or pending tasks
  list                show the tasks for the active filter
  stats               show total, completed and pending counts
  help                show this help
  quit                leave the shell";

/// Line-oriented event loop over a task store
pub struct Shell<B: BlobStore, R: BufRead, W: Write> {
    store: TaskStore<B>,
    renderer: Renderer,
    input: R,
    output: W,
}

impl<B: BlobStore, R: BufRead, W: Write> Shell<B, R, W> {
    pub fn new(store: TaskStore<B>, renderer: Renderer, input: R, output: W) -> Self {
        Self {
            store,
            renderer,
            input,
            output,
        }
    }

    pub fn into_parts(self) -> (TaskStore<B>, W) {
        (self.store, self.output)
    }

    /// Run until `quit` or end of input
    ///
    /// Input mistakes are reported and the loop continues; storage failures
    /// end it.
    pub fn run(&mut self) -> Result<()> {
        self.render_view()?;

        loop {
            let Some(line) = self.prompt_line("> ")? else {
                break;
            };

            match self.execute(&line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => match e.downcast_ref::<TaskError>() {
                    Some(err) => writeln!(self.output, "Error: {}", err)?,
                    None => return Err(e),
                },
            }
        }

        writeln!(self.output, "Bye.")?;
        Ok(())
    }

    /// Handle one command line; `false` ends the session
    pub fn execute(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        debug!(verb, arg, "Shell command");

        match verb {
            "" => {}
            "quit" | "exit" | "q" => return Ok(false),
            "help" | "?" => writeln!(self.output, "{}", HELP)?,
            "list" | "ls" => self.render_view()?,
            "stats" => writeln!(self.output, "{}", self.renderer.render_stats(&self.store.stats()))?,
            "filter" => {
                let filter: Filter = arg.parse()?;
                self.store.set_filter(filter);
                self.render_view()?;
            }
            "add" | "new" => self.add()?,
            _ => match Action::parse(verb, arg) {
                Some(action) => self.dispatch(action)?,
                None if arg.is_empty() && Action::parse(verb, "_").is_some() => {
                    writeln!(self.output, "Usage: {} <id>", verb)?
                }
                None => writeln!(self.output, "Unknown command: {} (type 'help')", verb)?,
            },
        }

        Ok(true)
    }

    /// Route a per-task control to the store
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Toggle(id) => match self.store.toggle_complete(&id)? {
                Some(_) => self.render_view()?,
                None => writeln!(self.output, "No task with id {}", id)?,
            },
            Action::Edit(id) => self.edit(&id)?,
            Action::Delete(id) => {
                let Self { store, input, output, .. } = self;
                let mut confirm = |task: &Task| confirm_delete(&mut *input, &mut *output, task);
                let outcome = store.delete(&id, &mut confirm)?;

                match outcome {
                    DeleteOutcome::Deleted => self.render_view()?,
                    DeleteOutcome::Declined => writeln!(self.output, "Kept.")?,
                    DeleteOutcome::NotFound => writeln!(self.output, "No task with id {}", id)?,
                }
            }
        }
        Ok(())
    }

    fn add(&mut self) -> Result<()> {
        let Some(fields) = self.read_form(TaskFields::default())? else {
            writeln!(self.output, "Cancelled.")?;
            return Ok(());
        };

        self.store.create(fields)?;
        self.render_view()
    }

    fn edit(&mut self, id: &str) -> Result<()> {
        let prefilled = self.store.edit(id)?;
        let Some(fields) = self.read_form(prefilled)? else {
            writeln!(self.output, "Cancelled, task unchanged.")?;
            return Ok(());
        };

        self.store.update(id, fields)?;
        self.render_view()
    }

    /// Prompt for each field; an empty answer keeps the shown default
    ///
    /// Returns `None` if input ends before the form is complete.
    fn read_form(&mut self, defaults: TaskFields) -> Result<Option<TaskFields>> {
        let Some(title) = self.prompt_field("Title", &defaults.title)? else {
            return Ok(None);
        };
        let Some(subject) = self.prompt_field("Subject", &defaults.subject)? else {
            return Ok(None);
        };

        let due_default = defaults.due_date.map(|d| d.to_string()).unwrap_or_default();
        let Some(due) = self.prompt_field("Due date (YYYY-MM-DD, '-' for none)", &due_default)? else {
            return Ok(None);
        };
        let due_date = if due == "-" { None } else { parse_due_date(&due)? };

        let Some(priority) = self.prompt_field("Priority (high/medium/low)", &defaults.priority.to_string())? else {
            return Ok(None);
        };
        let priority: Priority = priority.parse()?;

        let Some(description) = self.prompt_field("Description", &defaults.description)? else {
            return Ok(None);
        };

        Ok(Some(TaskFields {
            title,
            subject,
            due_date,
            priority,
            description,
        }))
    }

    fn prompt_field(&mut self, label: &str, default: &str) -> Result<Option<String>> {
        let prompt = if default.is_empty() {
            format!("{}: ", label)
        } else {
            format!("{} [{}]: ", label, default)
        };

        Ok(self.prompt_line(&prompt)?.map(|answer| {
            if answer.trim().is_empty() {
                default.to_string()
            } else {
                answer.trim().to_string()
            }
        }))
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        read_line(&mut self.input)
    }

    fn render_view(&mut self) -> Result<()> {
        let visible = self.store.visible();
        writeln!(self.output, "{}", self.renderer.render_filter_bar(self.store.filter()))?;
        writeln!(self.output, "{}", self.renderer.render_list(&visible))?;
        writeln!(self.output, "{}", self.renderer.render_stats(&self.store.stats()))?;
        Ok(())
    }
}

/// Read one line without its newline; `None` at end of input
pub fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Ask whether to delete `task`; only an explicit yes counts
pub fn ask_confirm(input: &mut impl BufRead, output: &mut impl Write, task: &Task) -> Result<bool> {
    write!(output, "Delete \"{}\"? [y/N] ", task.title)?;
    output.flush()?;

    let answer = read_line(input)?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// `ask_confirm` for the delete path: a failed prompt keeps the task
pub fn confirm_delete(input: &mut impl BufRead, output: &mut impl Write, task: &Task) -> bool {
    match ask_confirm(input, output, task) {
        Ok(confirmed) => confirmed,
        Err(e) => {
            warn!(id = task.id, error = ?e, "Delete confirmation failed, keeping task");
            false
        }
    }
}
