//! Configuration loader for Talkgate.
//!
//! Reads `config.toml` from the data directory (`~/.talkgate/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to defaults when the
//! file is missing or malformed. Secrets come from environment variables
//! whose names the config carries.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use talkgate_types::config::AppConfig;

use crate::sqlite::pool::default_database_url;

/// Resolve the data directory.
///
/// Priority: `TALKGATE_DATA_DIR`, then `~/.talkgate`, then `./.talkgate`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TALKGATE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|h| h.join(".talkgate"))
        .unwrap_or_else(|| PathBuf::from(".talkgate"))
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Resolve the SQLite URL.
///
/// Priority: `DATABASE_URL`, then `database_url` in config, then
/// `{data_dir}/talkgate.db`.
pub fn resolve_database_url(config: &AppConfig, data_dir: &Path) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| config.database_url.clone())
        .unwrap_or_else(|| default_database_url(data_dir))
}

/// Read a secret from the named environment variable.
///
/// Empty values count as missing.
pub fn read_secret_env(var: &str) -> anyhow::Result<SecretString> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        Ok(_) => anyhow::bail!("environment variable {var} is empty"),
        Err(_) => anyhow::bail!("environment variable {var} is not set"),
    }
}
