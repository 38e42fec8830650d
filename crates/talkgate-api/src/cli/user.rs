//! User inspection and manual plan grants.

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;
use console::style;

use talkgate_types::entitlement::{Entitlement, Plan};
use talkgate_types::session::Session;

use crate::state::AppState;

/// User subcommands.
#[derive(Subcommand)]
pub enum UserCommand {
    /// Show a user's entitlement and open session.
    Show {
        /// Telegram user id.
        user_id: i64,
    },

    /// Apply a plan purchase on behalf of a user.
    Grant {
        /// Telegram user id.
        user_id: i64,

        /// basic, standard or premium.
        plan: String,
    },
}

/// Handle a user subcommand.
pub async fn handle_user_command(cmd: UserCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        UserCommand::Show { user_id } => show_user(state, user_id, json).await,
        UserCommand::Grant { user_id, plan } => grant_plan(state, user_id, &plan, json).await,
    }
}

async fn show_user(state: &AppState, user_id: i64, json: bool) -> Result<()> {
    let (entitlement, open) = load_user(state, user_id).await?;

    if json {
        let out = serde_json::json!({
            "entitlement": entitlement,
            "open_session": open,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_entitlement(&entitlement);
    match open {
        Some(session) => println!(
            "  {:<16} {} ({}, {} messages)",
            style("Open session").bold(),
            session.id,
            session.state,
            session.user_message_count,
        ),
        None => println!("  {:<16} {}", style("Open session").bold(), style("none").dim()),
    }
    println!();
    Ok(())
}

async fn grant_plan(state: &AppState, user_id: i64, plan: &str, json: bool) -> Result<()> {
    let (plan, updated) = apply_grant(state, user_id, plan).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Granted {} to user {}",
        style("ok").green(),
        style(plan.label()).cyan(),
        user_id,
    );
    print_entitlement(&updated);
    println!();
    Ok(())
}

/// Entitlement record and open session of a user.
async fn load_user(state: &AppState, user_id: i64) -> Result<(Entitlement, Option<Session>)> {
    let entitlement = state
        .orchestrator
        .gate()
        .get(user_id)
        .await?
        .ok_or_else(|| anyhow!("user {user_id} has no entitlement record"))?;
    let open = state.orchestrator.sessions().find_open(user_id).await?;
    Ok((entitlement, open))
}

async fn apply_grant(state: &AppState, user_id: i64, plan: &str) -> Result<(Plan, Entitlement)> {
    let plan: Plan = plan.parse().map_err(|e: String| anyhow!(e))?;
    let updated = state
        .orchestrator
        .gate()
        .purchase_plan(user_id, plan)
        .await
        .with_context(|| format!("failed to grant {plan} to user {user_id}"))?;
    Ok((plan, updated))
}

fn print_entitlement(ent: &Entitlement) {
    let quota = if ent.unlimited {
        "unlimited".to_string()
    } else {
        ent.sessions_left.to_string()
    };

    println!();
    println!("  {:<16} {}", style("User").bold(), ent.user_id);
    println!("  {:<16} {}", style("Plan").bold(), style(ent.plan.label()).cyan());
    println!(
        "  {:<16} {} .. {}",
        style("Valid").bold(),
        ent.subscription_start.format("%Y-%m-%d %H:%M"),
        ent.subscription_end.format("%Y-%m-%d %H:%M"),
    );
    println!("  {:<16} {}", style("Sessions left").bold(), quota);
    println!("  {:<16} {}", style("Process").bold(), ent.process);
}
