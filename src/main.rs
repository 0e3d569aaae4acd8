//! # dayplan
//!
//! A terminal planner that spreads your backlog across the days ahead.
//! Every task has a due date and an hour estimate; `dayplan` fills each day's
//! free hours with the earliest-due work, splits large tasks over several
//! days, keeps fixed events out of the way, and tells you when a deadline
//! cannot be met.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! dayplan
//! # or explicitly
//! dayplan ui
//! ```
//!
//! **Keys**
//! *   `q`: Quit
//! *   `v`: Cycle Schedule / Tasks / Cards views
//! *   `b`: Rebuild the schedule
//! *   `a`: Add a task (Tasks view)
//! *   `d`: Delete the selected task or card
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! # Tasks
//! dayplan task add "Write report" --hours 6 --due fri
//! dayplan task edit 3 --due 2025-12-01
//! dayplan task show 3 4
//! dayplan task rm 5 6
//! dayplan task list --all
//!
//! # Labels and fixed events
//! dayplan card add School --color blue
//! dayplan event add Standup --start 9am --end 9:30am --days mon,tue,wed,thu,fri
//! dayplan event add Dentist --start 14:00 --end 16:00 --date 2025-11-20
//!
//! # Plan
//! dayplan build
//! dayplan sched
//! dayplan report
//!
//! # Backups and settings
//! dayplan export backup.json
//! dayplan import backup.json
//! dayplan config
//! ```
//!
//! Set `RUST_LOG=dayplan=debug` to see what a build is doing.
//!
//! ## Configuration
//!
//! `~/.config/dayplan/config.toml` (override with `DAYPLAN_CONFIG`):
//!
//! ```toml
//! max_days = 14
//! archive_days = 30
//!
//! [hours]
//! monday = 6
//! saturday = 2
//! ```
//!
//! ## Data Storage
//!
//! State is saved to `~/.local/share/dayplan/plan.json` on Linux. You can
//! override this by setting the `DAYPLAN_DB` environment variable.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dayplan::commands::*;
use dayplan::tui::run_tui;

#[derive(Parser)]
#[command(name = "dayplan")]
#[command(about = "Spread due-dated tasks across the days ahead", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage cards (labels)
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Manage fixed events
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Show or override the hours available on one date
    Hours {
        /// Date (YYYY-MM-DD, tmrw, fri, ...)
        date: String,
        /// Hours available that day
        hours: Option<f64>,
        /// Remove the override
        #[arg(long)]
        clear: bool,
    },
    /// Rebuild the schedule
    Build,
    /// Show the schedule day by day
    Sched,
    /// List every scheduled subtask
    Subtask,
    /// Summarise backlog, archive and schedule totals
    Report,
    /// Replace the database with a previously exported file
    Import {
        file: PathBuf,
    },
    /// Write the database to a file
    Export {
        file: PathBuf,
    },
    /// Show the configuration in effect
    Config,
    /// Reset the database (delete all tasks, cards and events)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a new task
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Estimated effort in hours, e.g. 1.5
        #[arg(short = 'H', long)]
        hours: f64,
        /// Due date: YYYY-MM-DD, eod, tmrw, eow or a weekday
        #[arg(short, long)]
        due: String,
        /// Card id
        #[arg(short, long)]
        card: Option<u32>,
    },
    /// Edit a task
    Edit {
        id: u32,
        /// New task name
        #[arg(short, long)]
        name: Option<String>,
        /// New estimate
        #[arg(short = 'H', long)]
        hours: Option<f64>,
        /// New due date
        #[arg(short, long)]
        due: Option<String>,
        /// New card id
        #[arg(short, long, conflicts_with = "no_card")]
        card: Option<u32>,
        /// Remove the card
        #[arg(long)]
        no_card: bool,
    },
    /// Show task details
    Show {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// Remove one or more tasks
    Rm {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// List tasks, earliest due first
    List {
        /// Include archived tasks
        #[arg(short, long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Add a new card
    Add {
        name: String,
        /// RED, ORANGE, YELLOW, GREEN, BLUE, INDIGO, VIOLET, BLACK, LIGHT_CORAL, LIGHT_GREEN, LIGHT_BLUE
        #[arg(short, long, default_value = "BLUE")]
        color: String,
    },
    /// Edit a card
    Edit {
        id: u32,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Show card details
    Show {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// Remove one or more cards
    Rm {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// List cards
    List,
}

#[derive(Subcommand)]
enum EventCommands {
    /// Add a fixed event
    Add {
        name: String,
        /// Start time (HH:MM, 9am, 9:30pm)
        #[arg(short, long)]
        start: String,
        /// End time
        #[arg(short, long)]
        end: String,
        /// Date of a one-off event (default: today)
        #[arg(long, conflicts_with = "days")]
        date: Option<String>,
        /// Weekdays of a recurring event, e.g. mon,wed,fri
        #[arg(long)]
        days: Option<String>,
        #[arg(short, long, default_value = "BLACK")]
        color: String,
    },
    /// Show event details
    Show {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// Remove one or more events
    Rm {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// List events
    List,
}

fn run(command: Option<Commands>) -> dayplan::Result<()> {
    match command {
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add { name, hours, due, card } => cmd_task_add(name, hours, due, card, false),
            TaskCommands::Edit { id, name, hours, due, card, no_card } => cmd_task_edit(id, name, hours, due, card, no_card, false),
            TaskCommands::Show { ids } => cmd_task_show(ids),
            TaskCommands::Rm { ids } => cmd_task_remove(ids, false),
            TaskCommands::List { all } => cmd_task_list(all),
        },
        Some(Commands::Card { command }) => match command {
            CardCommands::Add { name, color } => cmd_card_add(name, color, false),
            CardCommands::Edit { id, name, color } => cmd_card_edit(id, name, color, false),
            CardCommands::Show { ids } => cmd_card_show(ids),
            CardCommands::Rm { ids } => cmd_card_remove(ids, false),
            CardCommands::List => cmd_card_list(),
        },
        Some(Commands::Event { command }) => match command {
            EventCommands::Add { name, start, end, date, days, color } => cmd_event_add(name, color, start, end, date, days, false),
            EventCommands::Show { ids } => cmd_event_show(ids),
            EventCommands::Rm { ids } => cmd_event_remove(ids, false),
            EventCommands::List => cmd_event_list(),
        },
        Some(Commands::Hours { date, hours, clear }) => cmd_hours(date, hours, clear, false),
        Some(Commands::Build) => cmd_build(false),
        Some(Commands::Sched) => cmd_sched(),
        Some(Commands::Subtask) => cmd_subtask(),
        Some(Commands::Report) => cmd_report(),
        Some(Commands::Import { file }) => cmd_import(&file, false),
        Some(Commands::Export { file }) => cmd_export(&file, false),
        Some(Commands::Config) => cmd_config(),
        Some(Commands::Reset { force }) => cmd_reset(force),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return Ok(());
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "dayplan", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Ui) | None => run_tui(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stderr output would draw over the TUI
    let default_filter = match cli.command {
        Some(Commands::Ui) | None => "off",
        _ => "dayplan=warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
