use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in talkgate-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back to its domain type
    /// (unknown enum string, out-of-range integer, bad timestamp).
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors surfaced by the orchestrator and the services beneath it.
///
/// None of these reach end users verbatim; the orchestrator logs the cause
/// and replies with a templated message.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Bad input. Nothing was mutated.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("completion gateway error: {0}")]
    Gateway(#[from] LlmError),
}
