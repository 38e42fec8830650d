//! CLI command definitions for the `talkgate` binary.
//!
//! Uses clap derive macros. `serve` runs the Telegram adapter and the REST
//! API; the remaining commands are operator tools over the same database.

pub mod history;
pub mod prompt;
pub mod serve;
pub mod user;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Entitlement-gated LLM chat over Telegram.
#[derive(Parser)]
#[command(name = "talkgate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot and the REST API.
    Serve {
        /// Port to listen on (defaults to the configured port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host).
        #[arg(long)]
        host: Option<String>,

        /// Do not start Telegram long polling.
        #[arg(long)]
        no_telegram: bool,

        /// Do not start the REST API.
        #[arg(long)]
        no_http: bool,
    },

    /// Manage topic prompts (set, list, remove).
    Prompt {
        #[command(subcommand)]
        action: prompt::PromptCommand,
    },

    /// Inspect users and grant plans.
    User {
        #[command(subcommand)]
        action: user::UserCommand,
    },

    /// Dump a user's dialogue history, oldest first.
    History {
        /// Telegram user id.
        user_id: i64,

        /// Show only the most recent N turns.
        #[arg(short = 'n', long)]
        limit: Option<i64>,

        /// Restrict the dump to one session of the user.
        #[arg(long)]
        session: Option<uuid::Uuid>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
