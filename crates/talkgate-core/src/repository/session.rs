//! Session repository trait definition.

use talkgate_types::error::RepositoryError;
use talkgate_types::session::Session;
use uuid::Uuid;

/// Repository trait for conversation sessions.
///
/// The store guarantees at most one non-closed session per user; every
/// state change is a conditional update so a stale caller cannot move a
/// session backwards.
pub trait SessionRepository: Send + Sync {
    /// Insert `session` unless the user already has an open one.
    ///
    /// Returns the user's open session and whether this call created it.
    fn create_if_none_open(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<(Session, bool), RepositoryError>> + Send;

    /// Get a session by its unique ID.
    fn get(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// The user's open (awaiting topic or active) session, if any.
    fn find_open(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// The most recently closed session of the user.
    fn find_last_closed(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// List sessions for a user, newest first.
    fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, RepositoryError>> + Send;

    /// Move an awaiting-topic session to active with the chosen topic.
    ///
    /// Returns `false` when the session was not awaiting a topic.
    fn activate(
        &self,
        session_id: &Uuid,
        topic_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Add one to the user message counter of an active session.
    ///
    /// Returns the new count, or `None` when the session is not active.
    fn increment_user_messages(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<u32>, RepositoryError>> + Send;

    /// Close a session that is not closed yet.
    ///
    /// Returns `false` when the session was already closed.
    fn mark_closed(
        &self,
        session_id: &Uuid,
        closed_at: chrono::DateTime<chrono::Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
