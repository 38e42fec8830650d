//! LlmProvider trait definition.
//!
//! This is the core abstraction every completion backend implements.

use talkgate_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for completion gateway backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Request in,
/// one reply or an error out; there is no streaming surface.
///
/// Implementations live in talkgate-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
