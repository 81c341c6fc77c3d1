use clap::{Args, Parser, Subcommand};
use eyre::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{Level, warn};
use unitasks::models::parse_due_date;
use unitasks::shell::{self, Shell};
use unitasks::{Backend, Config, DeleteOutcome, Filter, Priority, Renderer, Task, TaskFields, TaskStore};

#[derive(Parser)]
#[command(name = "unitasks")]
#[command(about = "Track university assignments: add, edit, complete, filter and delete tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: <config dir>/unitasks/unitasks.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the task store
    #[arg(short, long, global = true)]
    store_path: Option<PathBuf>,

    /// Storage backend: sqlite or json
    #[arg(short, long, global = true)]
    backend: Option<Backend>,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add(AddArgs),

    /// List tasks, then the summary counts
    List {
        /// all, completed or pending
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// Show total, completed and pending counts
    Stats,

    /// Mark a task completed, or pending again
    Toggle { id: String },

    /// Change a task; omitted fields keep their current values
    Edit(EditArgs),

    /// Delete a task
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the stored task list as JSON
    Export,

    /// Merge tasks from an exported JSON file
    Import { file: PathBuf },

    /// Interactive session
    Shell,
}

#[derive(Args)]
struct AddArgs {
    #[arg(short, long)]
    title: String,

    #[arg(long)]
    subject: Option<String>,

    /// Due date, YYYY-MM-DD
    #[arg(short, long)]
    due: Option<String>,

    #[arg(short, long, default_value = "medium")]
    priority: Priority,

    #[arg(short = 'D', long)]
    description: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    id: String,

    #[arg(short, long)]
    title: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    /// Due date, YYYY-MM-DD
    #[arg(short, long, conflicts_with = "no_due")]
    due: Option<String>,

    /// Remove the due date
    #[arg(long)]
    no_due: bool,

    #[arg(short, long)]
    priority: Option<Priority>,

    #[arg(short = 'D', long)]
    description: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.store_path {
        config.store_path = path.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.no_color {
        config.color = false;
    }

    // Setup tracing
    let level = match cli.verbose {
        0 => config.level()?,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let renderer = Renderer::new(config.date_format.clone(), config.color);
    let mut store = TaskStore::open(config.open_blob_store()?, config.storage_key.clone())?;

    match cli.command {
        Commands::Add(args) => {
            let fields = TaskFields {
                title: args.title,
                subject: args.subject.unwrap_or_default(),
                due_date: parse_due_date(args.due.as_deref().unwrap_or_default())?,
                priority: args.priority,
                description: args.description.unwrap_or_default(),
            };
            let id = store.create(fields)?;
            if let Some(task) = store.get(&id) {
                println!("{}", renderer.render_task(task));
            }
        }
        Commands::List { filter } => {
            store.set_filter(filter);
            println!("{}", renderer.render_list(&store.visible()));
            println!();
            println!("{}", renderer.render_stats(&store.stats()));
        }
        Commands::Stats => {
            println!("{}", renderer.render_stats(&store.stats()));
        }
        Commands::Toggle { id } => match store.toggle_complete(&id)? {
            Some(_) => {
                if let Some(task) = store.get(&id) {
                    println!("{}", renderer.render_task(task));
                }
            }
            None => println!("No task with id {}", id),
        },
        Commands::Edit(args) => {
            let mut fields = store.edit(&args.id)?;
            apply_edits(&mut fields, &args)?;

            let new_id = store.update(&args.id, fields)?;
            if let Some(task) = store.get(&new_id) {
                println!("{}", renderer.render_task(task));
            }
        }
        Commands::Delete { id, yes } => {
            let mut confirm = |task: &Task| yes || confirm_on_stdin(task);
            match store.delete(&id, &mut confirm)? {
                DeleteOutcome::Deleted => println!("Deleted {}", id),
                DeleteOutcome::Declined => println!("Kept {}", id),
                DeleteOutcome::NotFound => println!("No task with id {}", id),
            }
        }
        Commands::Export => {
            println!("{}", store.export()?);
        }
        Commands::Import { file } => {
            let raw = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let tasks: Vec<Task> =
                serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", file.display()))?;
            let added = store.import(tasks)?;
            println!("Imported {} task(s)", added);
        }
        Commands::Shell => {
            let stdin = io::stdin();
            let mut shell = Shell::new(store, renderer, stdin.lock(), io::stdout());
            shell.run()?;
        }
    }

    Ok(())
}

/// Overlay the flags given to `edit` on the pre-filled form
fn apply_edits(fields: &mut TaskFields, args: &EditArgs) -> Result<()> {
    if let Some(title) = &args.title {
        fields.title = title.clone();
    }
    if let Some(subject) = &args.subject {
        fields.subject = subject.clone();
    }
    if let Some(due) = &args.due {
        fields.due_date = parse_due_date(due)?;
    }
    if args.no_due {
        fields.due_date = None;
    }
    if let Some(priority) = args.priority {
        fields.priority = priority;
    }
    if let Some(description) = &args.description {
        fields.description = description.clone();
    }
    Ok(())
}

fn confirm_on_stdin(task: &Task) -> bool {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let confirmed = shell::confirm_delete(&mut stdin.lock(), &mut stdout, task);
    if let Err(e) = stdout.flush() {
        warn!(error = ?e, "Failed to flush stdout");
    }
    confirmed
}
