//! BoxLlmProvider -- object-safe dynamic dispatch wrapper for LlmProvider.
//!
//! 1. Define an object-safe `LlmProviderDyn` trait with boxed futures
//! 2. Blanket-impl `LlmProviderDyn` for all `T: LlmProvider`
//! 3. `BoxLlmProvider` wraps `Box<dyn LlmProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use talkgate_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::LlmProvider;

/// Object-safe version of [`LlmProvider`] with boxed futures.
pub trait LlmProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;
}

impl<T: LlmProvider> LlmProviderDyn for T {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }
}

/// Type-erased LLM provider for runtime provider selection.
///
/// Since `LlmProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxLlmProvider` itself implements `LlmProvider`, so services
/// generic over the trait accept it unchanged.
pub struct BoxLlmProvider {
    inner: Box<dyn LlmProviderDyn + Send + Sync>,
}

impl BoxLlmProvider {
    /// Wrap a concrete `LlmProvider` in a type-erased box.
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }
}

impl LlmProvider for BoxLlmProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        self.inner.complete_boxed(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;
    use talkgate_types::llm::{Message, MessageRole, StopReason, Usage};

    struct EchoProvider;

    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn complete(
            &self,
            request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            async move {
                Ok(CompletionResponse {
                    id: "resp-1".to_string(),
                    content: last,
                    model: "echo-model".to_string(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_box_provider_delegates() {
        let provider = BoxLlmProvider::new(EchoProvider);
        assert_eq!(LlmProvider::name(&provider), "echo");

        let request = CompletionRequest {
            model: String::new(),
            messages: vec![Message::new(MessageRole::User, "ping")],
            max_tokens: 500,
            temperature: None,
        };
        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.content, "ping");
    }

    #[tokio::test]
    async fn test_box_provider_forwards_replies_and_errors() {
        let mock = MockProvider::default();
        mock.reply_next("boxed reply");
        mock.fail_next(LlmError::AuthenticationFailed);
        let provider = BoxLlmProvider::new(mock.clone());

        let request = CompletionRequest {
            model: "m".to_string(),
            messages: vec![Message::new(MessageRole::User, "hello")],
            max_tokens: 100,
            temperature: Some(0.2),
        };
        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.content, "boxed reply");
        assert_eq!(response.usage.output_tokens, 20);

        let err = provider.complete(&request).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed));

        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.last_request().unwrap().messages[0].content, "hello");
    }
}
