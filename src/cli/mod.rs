//! Command-line interface for devtasks
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands lives in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::manager::TaskManager;
use crate::output::OutputOptions;

mod checklist;
mod init;
mod task;

/// devtasks - task tracking for a project directory
///
/// Keeps a single JSON task document under `.devtasks/` and exposes it
/// through subcommands and a stdio tool server.
#[derive(Parser, Debug)]
#[command(name = "devtasks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the project root (defaults to current directory)
    #[arg(long, global = true, env = "DEVTASKS_PROJECT")]
    pub project: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the task store in the project
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Reinitialize an existing store, discarding its tasks
        #[arg(long)]
        force: bool,
    },

    /// List tasks
    List {
        /// Filter by status (repeatable; any match)
        #[arg(long = "status")]
        status: Vec<String>,

        /// Filter by priority: high, medium, low
        #[arg(long)]
        priority: Option<String>,
    },

    /// Show a task, or a subtask by dotted id (e.g. 3.2)
    Show {
        /// Task or subtask id
        id: String,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: high, medium, low
        #[arg(short, long)]
        priority: Option<String>,

        /// Initial status (defaults to pending)
        #[arg(long)]
        status: Option<String>,

        /// Id of a task this one depends on (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,

        /// Implementation notes
        #[arg(long)]
        details: Option<String>,

        /// How the work will be verified
        #[arg(long)]
        test_strategy: Option<String>,
    },

    /// Update fields of a task
    Update {
        /// Task id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<String>,

        /// New status
        #[arg(long)]
        status: Option<String>,

        /// Replace dependencies with these ids (repeatable)
        #[arg(long = "depends-on", conflicts_with = "clear_deps")]
        depends_on: Vec<String>,

        /// Remove all dependencies
        #[arg(long)]
        clear_deps: bool,

        /// New implementation notes
        #[arg(long)]
        details: Option<String>,

        /// New test strategy
        #[arg(long)]
        test_strategy: Option<String>,
    },

    /// Delete a task and drop it from other tasks' dependencies
    Rm {
        /// Task id
        id: String,
    },

    /// Set the status of a task or subtask
    Status {
        /// Task or subtask id
        id: String,

        /// New status: pending, in-progress, done, blocked, deferred
        status: String,
    },

    /// Append a subtask to a task
    Subtask {
        /// Parent task id
        task_id: String,

        /// Subtask title
        title: String,

        /// Subtask description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show the task to work on next
    Next,

    /// Show task counts and completion
    Stats,

    /// Render the task list as a Markdown checklist
    Checklist {
        /// Output path relative to the project root (overrides config)
        #[arg(short, long)]
        output: Option<String>,

        /// Print the checklist instead of writing it
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
    },

    /// Pull task titles out of bullet and numbered lines
    Extract {
        /// Read text from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Create a task for every extracted title
        #[arg(long)]
        create: bool,

        /// Priority for created tasks
        #[arg(short, long, requires = "create")]
        priority: Option<String>,
    },

    /// Serve the task tools over stdio (JSON-RPC, one message per line)
    Mcp,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let project = resolve_project(self.project)?;

        match self.command {
            Commands::Init { name, force } => init::run(init::InitOptions {
                project,
                name,
                force,
                output,
            }),
            Commands::List { status, priority } => task::run_list(task::ListOptions {
                project,
                status,
                priority,
                output,
            }),
            Commands::Show { id } => task::run_show(task::ShowOptions {
                project,
                id,
                output,
            }),
            Commands::Add {
                title,
                description,
                priority,
                status,
                depends_on,
                details,
                test_strategy,
            } => task::run_add(task::AddOptions {
                project,
                title,
                description,
                priority,
                status,
                depends_on,
                details,
                test_strategy,
                output,
            }),
            Commands::Update {
                id,
                title,
                description,
                priority,
                status,
                depends_on,
                clear_deps,
                details,
                test_strategy,
            } => task::run_update(task::UpdateOptions {
                project,
                id,
                title,
                description,
                priority,
                status,
                depends_on,
                clear_deps,
                details,
                test_strategy,
                output,
            }),
            Commands::Rm { id } => task::run_rm(task::RmOptions {
                project,
                id,
                output,
            }),
            Commands::Status { id, status } => task::run_status(task::StatusOptions {
                project,
                id,
                status,
                output,
            }),
            Commands::Subtask {
                task_id,
                title,
                description,
            } => task::run_subtask(task::SubtaskOptions {
                project,
                task_id,
                title,
                description,
                output,
            }),
            Commands::Next => task::run_next(project, output),
            Commands::Stats => task::run_stats(project, output),
            Commands::Checklist { output: path, stdout } => {
                checklist::run_checklist(checklist::ChecklistOptions {
                    project,
                    path,
                    stdout,
                    output,
                })
            }
            Commands::Extract {
                file,
                create,
                priority,
            } => checklist::run_extract(checklist::ExtractOptions {
                project,
                file,
                create,
                priority,
                output,
            }),
            Commands::Mcp => {
                let stdin = std::io::stdin();
                let stdout = std::io::stdout();
                crate::mcp::serve(stdin.lock(), stdout.lock())
            }
        }
    }
}

fn resolve_project(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?),
    }
}

/// Manager for the project, failing early when it has no task store
pub(crate) fn initialized_manager(project: &std::path::Path) -> Result<TaskManager> {
    let manager = TaskManager::for_project(project);
    if !manager.is_initialized() {
        return Err(crate::error::Error::NotInitialized(project.to_path_buf()));
    }
    Ok(manager)
}
