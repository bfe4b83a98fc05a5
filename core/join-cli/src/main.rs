//! bambinos-join: join a Bambinos class from the terminal.
//!
//! ## Subcommands
//!
//! - `join`: request to join, keep checking until the class opens, print the URL
//! - `check`: ask once, no polling
//! - `config`: print the effective configuration

mod check;
mod join;
mod logging;
mod output;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const MAX_DURATION_MINS: u64 = 24 * 60;
const MAX_GIVE_UP_MINS: u64 = 7 * 24 * 60;

#[derive(Parser)]
#[command(name = "bambinos-join")]
#[command(about = "Join a scheduled Bambinos class")]
#[command(version)]
struct Cli {
    /// Path to join.toml (defaults to ~/.bambinos/join.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a class to open and print its join URL
    Join {
        /// Booking identifier of the scheduled class
        #[arg(value_name = "SESSION_ID")]
        session_id: String,

        /// Scheduled start (RFC 3339), used to warn about early or late joins
        #[arg(long)]
        starts_at: Option<DateTime<Utc>>,

        /// Scheduled class length in minutes
        #[arg(
            long,
            default_value_t = 60,
            value_parser = clap::value_parser!(u64).range(1..=MAX_DURATION_MINS)
        )]
        duration_mins: u64,

        /// Stop waiting after this many minutes of polling (0 stops after the first answer)
        #[arg(
            long,
            value_parser = clap::value_parser!(u64).range(0..=MAX_GIVE_UP_MINS)
        )]
        give_up_after_mins: Option<u64>,

        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Ask once whether a class is open
    Check {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration (token redacted)
    Config,
}

/// How a command ended; mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Joined,
    Failed,
    GaveUp,
    NotReady,
}

impl Outcome {
    fn exit_code(self) -> i32 {
        match self {
            Outcome::Done | Outcome::Joined => 0,
            Outcome::Failed => 1,
            Outcome::GaveUp => 2,
            Outcome::NotReady => 3,
        }
    }
}

fn main() {
    let logging_guard = logging::init();
    let code = run(Cli::parse());
    drop(logging_guard);
    std::process::exit(code);
}

fn run(cli: Cli) -> i32 {
    let config = match join_core::load_config(cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Failed to load configuration");
            eprintln!("{}", err);
            return 1;
        }
    };

    let result = match cli.command {
        Commands::Join {
            session_id,
            starts_at,
            duration_mins,
            give_up_after_mins,
            json,
        } => join::run(
            &config,
            join::JoinArgs {
                session_id,
                starts_at,
                duration_mins,
                give_up_after_mins,
                json,
            },
        ),
        Commands::Check { session_id, json } => check::run(&config, &session_id, json),
        Commands::Config => match serde_json::to_string_pretty(&config.redacted()) {
            Ok(rendered) => {
                println!("{}", rendered);
                Ok(Outcome::Done)
            }
            Err(err) => {
                eprintln!("Failed to render configuration: {}", err);
                Ok(Outcome::Failed)
            }
        },
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            tracing::error!(error = %err, "bambinos-join failed");
            eprintln!("{}", err);
            1
        }
    }
}
