//! Connection settings and well-known endpoints for OpenAI-compatible providers.

use secrecy::SecretString;

use talkgate_types::config::LlmConfig;

/// Configuration for an OpenAI-compatible completion endpoint.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`]. Holds the API
/// key as a [`SecretString`] so it never shows up in `Debug` output.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "mistral").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Default model when a request leaves `model` empty.
    pub model: String,
}

impl OpenAiCompatConfig {
    /// Build from the `[llm]` config section and a resolved API key.
    ///
    /// An explicit `base_url` wins; otherwise the provider name picks a
    /// well-known endpoint, falling back to OpenAI.
    pub fn from_llm_config(config: &LlmConfig, api_key: SecretString) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&config.provider).to_string());

        Self {
            provider_name: config.provider.clone(),
            base_url,
            api_key,
            model: config.model.clone(),
        }
    }
}

/// Public endpoint for a provider name known to speak the OpenAI protocol.
pub fn default_base_url(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "mistral" => "https://api.mistral.ai/v1",
        "glm" => "https://api.z.ai/api/paas/v4",
        _ => "https://api.openai.com/v1",
    }
}
