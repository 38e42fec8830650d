//! Topic prompt CLI subcommands.

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use talkgate_core::repository::prompt::PromptRepository;
use talkgate_types::prompt::{Prompt, validate_prompt_id};

use crate::state::AppState;

/// Prompt subcommands.
#[derive(Subcommand)]
pub enum PromptCommand {
    /// Create or replace a topic prompt.
    Set {
        /// Prompt id used in button data (letters, digits, '_' and '-').
        id: String,

        /// Button label shown to users.
        #[arg(long)]
        title: String,

        /// Text sent to the model when the topic is chosen.
        #[arg(long)]
        text: String,
    },

    /// List topic prompts.
    #[command(alias = "ls")]
    List,

    /// Remove a topic prompt.
    #[command(alias = "rm")]
    Remove {
        /// Prompt id.
        id: String,
    },
}

/// Handle a prompt subcommand.
pub async fn handle_prompt_command(cmd: PromptCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        PromptCommand::Set { id, title, text } => set_prompt(state, id, title, text, json).await,
        PromptCommand::List => list_prompts(state, json).await,
        PromptCommand::Remove { id } => remove_prompt(state, &id, json).await,
    }
}

async fn set_prompt(
    state: &AppState,
    id: String,
    title: String,
    text: String,
    json: bool,
) -> Result<()> {
    if let Err(e) = validate_prompt_id(&id) {
        bail!(e);
    }
    if title.trim().is_empty() || text.trim().is_empty() {
        bail!("prompt title and text must not be empty");
    }

    let prompt = Prompt {
        id,
        title,
        text,
        created_at: Utc::now(),
    };
    state.prompts.upsert(&prompt).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prompt)?);
    } else {
        println!();
        println!(
            "  {} Saved prompt '{}' ({})",
            style("ok").green(),
            style(&prompt.id).cyan(),
            prompt.title,
        );
        println!();
    }
    Ok(())
}

async fn list_prompts(state: &AppState, json: bool) -> Result<()> {
    let prompts = state.prompts.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prompts)?);
        return Ok(());
    }

    if prompts.is_empty() {
        println!();
        println!("  {} No topic prompts configured.", style("i").blue().bold());
        println!("     Add one with: talkgate prompt set <id> --title <label> --text <prompt>");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Text").fg(Color::White),
    ]);

    for prompt in &prompts {
        table.add_row(vec![
            Cell::new(&prompt.id).fg(Color::Cyan),
            Cell::new(&prompt.title),
            Cell::new(preview(&prompt.text, 60)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn remove_prompt(state: &AppState, id: &str, json: bool) -> Result<()> {
    let removed = state.prompts.delete(id).await?;
    if !removed {
        bail!("prompt '{id}' not found");
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!();
        println!("  {} Removed prompt '{}'", style("ok").green(), style(id).cyan());
        println!();
    }
    Ok(())
}

/// Truncate on a char boundary, appending an ellipsis.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
