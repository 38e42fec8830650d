//! Configuration types for Talkgate.
//!
//! `AppConfig` represents the top-level `config.toml` that controls session
//! policy, the completion gateway, and the outer surfaces. Secrets are never
//! stored here; only the names of the environment variables that hold them.

use serde::{Deserialize, Serialize};

use crate::history::HistoryScope;

/// Top-level configuration.
///
/// Loaded from `~/.talkgate/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionPolicy,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Which turns feed the LLM context.
    #[serde(default)]
    pub history_scope: HistoryScope,

    /// SQLite URL override. Defaults to `{data_dir}/talkgate.db`.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Session cap and trial defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// User messages accepted per session before it is force-closed.
    #[serde(default = "default_message_cap")]
    pub message_cap: u32,

    /// Sessions granted by the lazily created trial.
    #[serde(default = "default_trial_sessions")]
    pub trial_sessions: i64,

    /// Trial validity window in hours.
    #[serde(default = "default_trial_window_hours")]
    pub trial_window_hours: i64,
}

fn default_message_cap() -> u32 {
    3
}

fn default_trial_sessions() -> i64 {
    2
}

fn default_trial_window_hours() -> i64 {
    24
}

impl SessionPolicy {
    pub fn trial_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.trial_window_hours)
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            message_cap: default_message_cap(),
            trial_sessions: default_trial_sessions(),
            trial_window_hours: default_trial_window_hours(),
        }
    }
}

/// Completion gateway settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name used in logs and span attributes.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Custom API base URL. `None` uses the provider's public endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f64>,

    /// Bound on a single completion call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// System turn used when the user has no history yet.
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_system_prompt() -> String {
    "You are an assistant helping users.".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
            default_system_prompt: default_system_prompt(),
        }
    }
}

/// Telegram transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "TALKGATE_TELEGRAM_TOKEN".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

/// REST API listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
