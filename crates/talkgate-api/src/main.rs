//! Talkgate entry point.
//!
//! Binary name: `talkgate`
//!
//! Parses CLI arguments, initializes tracing, database and services, then
//! dispatches to the operator commands or starts serving.

mod cli;
mod http;
mod state;
mod telegram;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,talkgate=debug",
        _ => "trace",
    };
    let otel = std::env::var("TALKGATE_OTEL").is_ok_and(|v| v == "1" || v == "true");
    if let Err(e) = talkgate_observe::tracing_setup::init_tracing(filter, cli.json, otel) {
        eprintln!("failed to initialize tracing: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "talkgate", &mut std::io::stdout());
        return Ok(());
    }

    let serving = matches!(cli.command, Commands::Serve { .. });
    let state = AppState::init(serving).await?;

    let result = match cli.command {
        Commands::Serve {
            port,
            host,
            no_telegram,
            no_http,
        } => {
            let opts = cli::serve::ServeOptions {
                host,
                port,
                telegram: !no_telegram,
                http: !no_http,
            };
            cli::serve::serve(state, opts).await
        }

        Commands::Prompt { action } => {
            cli::prompt::handle_prompt_command(action, &state, cli.json).await
        }

        Commands::User { action } => cli::user::handle_user_command(action, &state, cli.json).await,

        Commands::History {
            user_id,
            limit,
            session,
        } => cli::history::show_history(&state, user_id, session, limit, cli.json).await,

        Commands::Completions { .. } => Ok(()),
    };

    talkgate_observe::tracing_setup::shutdown_tracing();
    result
}
