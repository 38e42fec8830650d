//! `talkgate serve`: Telegram long polling plus the REST API.

use anyhow::{Context, Result, bail};
use console::style;
use tokio_util::sync::CancellationToken;

use talkgate_infra::config::read_secret_env;

use crate::http;
use crate::state::AppState;
use crate::telegram;

/// Listener and transport selection for `serve`.
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub telegram: bool,
    pub http: bool,
}

/// Run the enabled transports until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState, opts: ServeOptions) -> Result<()> {
    if !opts.telegram && !opts.http {
        bail!("nothing to serve: both --no-telegram and --no-http were given");
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        signal_token.cancel();
    });

    let telegram_task = if opts.telegram {
        let token = read_secret_env(&state.config.telegram.token_env)
            .context("Telegram bot token is required (use --no-telegram to skip)")?;
        let task_state = state.clone();
        let task_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            telegram::run(task_state, token, task_shutdown).await;
        }))
    } else {
        None
    };

    if opts.http {
        serve_http(state, &opts, shutdown.clone()).await?;
    } else {
        println!("  {}", style("Press Ctrl+C to stop").dim());
    }

    if let Some(task) = telegram_task {
        task.await.context("telegram task failed")?;
    }

    println!("\n  Server stopped.");
    Ok(())
}

async fn serve_http(state: AppState, opts: &ServeOptions, shutdown: CancellationToken) -> Result<()> {
    // Ensure an API key exists, print it if new
    if let Some(api_key) = http::extractors::auth::ensure_api_key(&state.db_pool).await? {
        println!();
        println!(
            "  {} API key generated (save this -- it won't be shown again):",
            style("🔑").bold()
        );
        println!();
        println!("  {}", style(&api_key).yellow().bold());
        println!();
    }

    let host = opts.host.clone().unwrap_or_else(|| state.config.http.host.clone());
    let port = opts.port.unwrap_or(state.config.http.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!(
        "  {} Talkgate API listening on {}",
        style("⚡").bold(),
        style(format!("http://{addr}")).cyan()
    );
    println!("  {}", style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
