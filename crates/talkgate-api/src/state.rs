//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the CLI, the
//! Telegram adapter, and the REST API. The orchestrator is generic over
//! store and gateway traits; AppState pins it to the infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use talkgate_core::conversation::Orchestrator;
use talkgate_core::llm::box_provider::BoxLlmProvider;
use talkgate_infra::config::{load_app_config, read_secret_env, resolve_data_dir, resolve_database_url};
use talkgate_infra::llm::create_provider;
use talkgate_infra::sqlite::capture::SqliteCaptureRepository;
use talkgate_infra::sqlite::entitlement::SqliteEntitlementRepository;
use talkgate_infra::sqlite::history::SqliteHistoryRepository;
use talkgate_infra::sqlite::pool::DatabasePool;
use talkgate_infra::sqlite::prompt::SqlitePromptRepository;
use talkgate_infra::sqlite::session::SqliteSessionRepository;
use talkgate_types::config::AppConfig;

/// Orchestrator pinned to the SQLite stores and the boxed gateway.
pub type ConcreteOrchestrator = Orchestrator<
    SqliteEntitlementRepository,
    SqliteSessionRepository,
    SqliteHistoryRepository,
    SqlitePromptRepository,
    SqliteCaptureRepository,
    BoxLlmProvider,
>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    /// Topic catalogue, managed directly by the `prompt` CLI commands.
    pub prompts: SqlitePromptRepository,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    ///
    /// With `require_gateway` unset a missing LLM API key is tolerated; the
    /// operator commands never call the gateway.
    pub async fn init(require_gateway: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_app_config(&data_dir).await;

        let db_url = resolve_database_url(&config, &data_dir);
        let db_pool = DatabasePool::new(&db_url)
            .await
            .with_context(|| format!("failed to open database at {db_url}"))?;

        let api_key = match read_secret_env(&config.llm.api_key_env) {
            Ok(key) => key,
            Err(e) if !require_gateway => {
                tracing::debug!(error = %e, "completion gateway key not available");
                SecretString::from(String::new())
            }
            Err(e) => return Err(e.context("completion gateway API key is required")),
        };
        Ok(Self::build(config, data_dir, db_pool, api_key))
    }

    /// Wire the stores and the gateway over an already opened pool.
    pub fn build(
        config: AppConfig,
        data_dir: PathBuf,
        db_pool: DatabasePool,
        api_key: SecretString,
    ) -> Self {
        let provider = create_provider(&config.llm, api_key);

        let prompts = SqlitePromptRepository::new(db_pool.clone());
        let orchestrator = Orchestrator::new(
            SqliteEntitlementRepository::new(db_pool.clone()),
            SqliteSessionRepository::new(db_pool.clone()),
            SqliteHistoryRepository::new(db_pool.clone()),
            prompts.clone(),
            SqliteCaptureRepository::new(db_pool.clone()),
            provider,
            &config,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            prompts,
            config: Arc::new(config),
            data_dir,
            db_pool,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State over a fresh on-disk database. The gateway key is empty, so
    /// tests must not route free text through the orchestrator.
    pub async fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let data_dir = dir.path().to_path_buf();
        std::mem::forget(dir);
        let pool = DatabasePool::new(&url).await.unwrap();
        AppState::build(
            AppConfig::default(),
            data_dir,
            pool,
            SecretString::from(String::new()),
        )
    }
}
