//! History repository trait definition.

use talkgate_types::error::RepositoryError;
use talkgate_types::history::Turn;
use uuid::Uuid;

/// Repository trait for the append-only dialogue log.
///
/// Reads are ordered by `created_at` ascending, ties broken by turn id.
pub trait HistoryRepository: Send + Sync {
    /// Append a turn.
    fn append(
        &self,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every turn of a user across sessions, oldest first.
    fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Turns of a single session, oldest first.
    fn list_for_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;
}
