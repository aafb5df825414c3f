use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard::board::{Month, Permission, Priority, Role, TaskKind, TaskScope};
use taskboard::logging::init_logging;

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Task pipeline board: stage transitions and ordering")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Scope and filter flags shared by `board`.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Only tasks of this project
    #[arg(long)]
    pub project: Option<i64>,

    /// low, medium, high, critical
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Only tasks assigned to this user
    #[arg(long)]
    pub assignee: Option<i64>,

    /// Only tasks due in this month (YYYY-MM)
    #[arg(long)]
    pub month: Option<Month>,

    /// Case-insensitive title search
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub hide_subtasks: bool,

    /// Visible task types (comma-separated: task,subtask,extra_task)
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<TaskKind>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the configured pipeline stages
    Stages,
    /// Fetch tasks and print them grouped by stage
    Board {
        /// Task collection, e.g. project:1, company:2, employee:3
        #[arg(long)]
        scope: Option<TaskScope>,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Move a task to a stage position, as a drag and drop would
    Move {
        task_id: i64,

        /// Target stage key
        #[arg(long)]
        to: String,

        /// Target position within the stage (0 = top)
        #[arg(long, default_value = "0")]
        position: usize,

        #[arg(long)]
        scope: Option<TaskScope>,

        /// Id of the acting user
        #[arg(long, env = "TASKBOARD_ACTOR_ID")]
        actor_id: i64,

        /// elevated or standard
        #[arg(long, default_value = "standard")]
        role: Role,

        /// Extra capability, e.g. tasks:edit (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<Permission>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default taskboard.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Stages => cmd::cmd_stages(&project_dir)?,
        Commands::Board { scope, filters } => {
            cmd::cmd_board(&project_dir, *scope, filters).await?
        }
        Commands::Move {
            task_id,
            to,
            position,
            scope,
            actor_id,
            role,
            permissions,
        } => {
            cmd::cmd_move(
                &project_dir,
                cmd::MoveArgs {
                    task_id: *task_id,
                    to: to.clone(),
                    position: *position,
                    scope: *scope,
                    actor_id: *actor_id,
                    role: *role,
                    permissions: permissions.clone(),
                },
            )
            .await?
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
