//! Dialogue history dump.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use talkgate_types::history::{MessageRole, Turn};

use crate::cli::prompt::preview;
use crate::state::AppState;

/// Print a user's dialogue log, oldest first.
///
/// With `session` only that session's turns are shown.
pub async fn show_history(
    state: &AppState,
    user_id: i64,
    session: Option<Uuid>,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let turns = load_history(state, user_id, session, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!("  {} No history for user {}.", style("i").blue().bold(), user_id);
        println!();
        return Ok(());
    }

    let table = history_table(&turns);
    println!();
    println!("  History for user {} ({} turns)", style(user_id).cyan(), turns.len());
    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Fetch the turns to show: the whole user log, or one session of it.
async fn load_history(
    state: &AppState,
    user_id: i64,
    session: Option<Uuid>,
    limit: Option<i64>,
) -> Result<Vec<Turn>> {
    let sessions = state.orchestrator.sessions();
    let Some(session_id) = session else {
        return Ok(sessions.history_for_user(user_id, limit).await?);
    };

    let owner = sessions.get(&session_id).await?.user_id;
    if owner != user_id {
        bail!("session {session_id} does not belong to user {user_id}");
    }
    let mut turns = sessions.history_for_session(&session_id).await?;
    if let Some(n) = limit.and_then(|n| usize::try_from(n).ok()) {
        turns = turns.split_off(turns.len().saturating_sub(n));
    }
    Ok(turns)
}

fn history_table(turns: &[Turn]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Session").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Text").fg(Color::White),
    ]);

    for turn in turns {
        table.add_row(vec![
            Cell::new(turn.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(short_id(turn)).fg(Color::DarkGrey),
            Cell::new(turn.role).fg(role_color(turn)),
            Cell::new(preview(&turn.text, 80)),
        ]);
    }
    table
}

fn short_id(turn: &Turn) -> String {
    turn.session_id.simple().to_string().chars().take(8).collect()
}

fn role_color(turn: &Turn) -> Color {
    if turn.is_topic_marker() {
        return Color::DarkGrey;
    }
    match turn.role {
        MessageRole::User => Color::Cyan,
        MessageRole::Assistant => Color::Green,
        MessageRole::System => Color::Yellow,
    }
}
