//! `cadence`: administrative CLI for the task control plane.

use anyhow::Result;
use cadence_core::{CadenceConfig, WorkspacePaths};
use cadence_tasks::DEFAULT_TAIL_LINES;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to cadence.toml (default: ~/.cadence/cadence.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Admin bearer token for commands that change state (default: $CADENCE_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage task records
    #[command(subcommand)]
    Tasks(TaskCommands),

    /// Send control messages to the running scheduler
    #[command(subcommand)]
    Bus(BusCommands),

    /// Manage the admin account
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand)]
pub(crate) enum TaskCommands {
    /// List every task
    List,

    /// Show one task in full
    Show { name: String },

    /// Return every queued task to runnable (repair after an unclean stop)
    ResetQueued,

    /// Switch a task off
    Disable { name: String },

    /// Switch a disabled task back on
    Enable { name: String },

    /// Print the tail of a task's log
    Logs {
        name: String,

        /// Number of lines from the end of the log
        #[arg(short = 'n', long, default_value_t = DEFAULT_TAIL_LINES)]
        lines: usize,
    },

    /// Delete a task with its compiled artifact and log
    Delete { task_id: String },

    /// Compile a task from its source directory and record it
    Build {
        /// Task name; read from ./task.toml or TASK_NAME when omitted
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Run every N units
        #[arg(long, conflicts_with_all = ["on", "at"])]
        every: Option<i64>,

        #[arg(long, value_enum, default_value_t = UnitArg::Seconds)]
        unit: UnitArg,

        /// Run weekly on this day
        #[arg(long, value_enum, requires = "at")]
        on: Option<DayArg>,

        /// Time of day for --on, 24-hour HH:MM (UTC)
        #[arg(long, requires = "on")]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum BusCommands {
    /// Stop the current run of a task
    Stop { task_id: String },
    /// Disable a task
    Disable { task_id: String },
    /// Delete a task
    Delete { task_id: String },
}

#[derive(Subcommand)]
pub(crate) enum UserCommands {
    /// Print the bearer token for a user
    Token {
        #[arg(long, default_value = "admin")]
        name: String,
        #[arg(long)]
        password: String,
    },

    /// Change the user name and/or password (a new password rotates the token)
    Update {
        #[arg(long, default_value = "admin")]
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        new_name: Option<String>,
        #[arg(long)]
        new_password: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum UnitArg {
    Seconds,
    Minutes,
    Hours,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DayArg {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // load config: explicit path > CADENCE_CONFIG env > ~/.cadence/cadence.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("CADENCE_CONFIG").ok());
    let (config, config_err) = match CadenceConfig::load(config_path.as_deref()) {
        Ok(c) => (c, None),
        Err(e) => (CadenceConfig::default(), Some(e)),
    };
    let paths = WorkspacePaths::from_config(&config.workspace);

    let log_file = logging::init(&paths, &config.logging.filter);
    if let Some(e) = config_err {
        warn!("Config load failed ({}), using defaults", e);
    }
    info!(log = ?log_file, db = %config.database.path, "cadence starting");

    let ctx = commands::Context::new(config, paths, cli.token);
    match cli.command {
        Commands::Tasks(cmd) => commands::tasks::execute(&ctx, cmd).await,
        Commands::Bus(cmd) => commands::bus::execute(&ctx, cmd).await,
        Commands::User(cmd) => commands::user::execute(&ctx, cmd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn build_flags_parse() {
        let cli = Cli::parse_from([
            "cadence", "tasks", "build", "--name", "report", "--on", "friday", "--at", "17:00",
        ]);
        match cli.command {
            Commands::Tasks(TaskCommands::Build {
                name,
                on,
                at,
                every,
                ..
            }) => {
                assert_eq!(name.as_deref(), Some("report"));
                assert_eq!(on, Some(DayArg::Friday));
                assert_eq!(at.as_deref(), Some("17:00"));
                assert_eq!(every, None);
            }
            _ => panic!("expected tasks build"),
        }
    }

    #[test]
    fn logs_defaults_to_the_last_hundred_lines() {
        let cli = Cli::parse_from(["cadence", "tasks", "logs", "report"]);
        match cli.command {
            Commands::Tasks(TaskCommands::Logs { name, lines }) => {
                assert_eq!(name, "report");
                assert_eq!(lines, 100);
            }
            _ => panic!("expected tasks logs"),
        }
        let cli = Cli::parse_from(["cadence", "tasks", "logs", "report", "-n", "5"]);
        assert!(matches!(
            cli.command,
            Commands::Tasks(TaskCommands::Logs { lines: 5, .. })
        ));
    }

    #[test]
    fn every_conflicts_with_on() {
        assert!(Cli::try_parse_from([
            "cadence", "tasks", "build", "--every", "5", "--on", "monday", "--at", "01:00",
        ])
        .is_err());
    }
}
