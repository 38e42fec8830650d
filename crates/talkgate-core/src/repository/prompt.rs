//! Prompt repository trait definition.

use talkgate_types::error::RepositoryError;
use talkgate_types::prompt::Prompt;

/// Repository trait for the topic catalogue.
pub trait PromptRepository: Send + Sync {
    /// Insert or replace a prompt by id.
    fn upsert(
        &self,
        prompt: &Prompt,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Prompt>, RepositoryError>> + Send;

    /// All prompts ordered by id.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Prompt>, RepositoryError>> + Send;

    /// Delete a prompt. Returns `false` when it did not exist.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
