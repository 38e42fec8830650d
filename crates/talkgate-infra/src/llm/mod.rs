//! Completion gateway implementations.
//!
//! Contains the concrete [`LlmProvider`](talkgate_core::llm::provider::LlmProvider)
//! for OpenAI-compatible endpoints and a factory ([`create_provider`]) that
//! builds it from the `[llm]` config section.

pub mod openai_compat;

use secrecy::SecretString;

use talkgate_core::llm::box_provider::BoxLlmProvider;
use talkgate_types::config::LlmConfig;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from the `[llm]` config section.
///
/// The API key is resolved by the caller (see
/// [`crate::config::read_secret_env`]).
pub fn create_provider(config: &LlmConfig, api_key: SecretString) -> BoxLlmProvider {
    let oai_config = OpenAiCompatConfig::from_llm_config(config, api_key);
    tracing::info!(
        provider = %oai_config.provider_name,
        base_url = %oai_config.base_url,
        model = %oai_config.model,
        "completion gateway configured"
    );
    BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config))
}
