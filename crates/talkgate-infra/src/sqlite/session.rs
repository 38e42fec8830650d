//! SQLite session repository implementation.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use talkgate_core::repository::session::SessionRepository;
use talkgate_types::error::RepositoryError;
use talkgate_types::session::{Session, SessionState};

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `SessionRepository`.
///
/// The `idx_sessions_one_open` partial unique index enforces a single
/// non-closed session per user; every state change is a guarded `UPDATE`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn find_open_on(
        &self,
        executor: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM sessions WHERE user_id = ? AND state != 'closed' LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(query_err)?;

        row.as_ref().map(decode).transpose()
    }
}

/// Internal row type for mapping SQLite rows to domain Session.
struct SessionRow {
    id: String,
    user_id: i64,
    state: String,
    topic_id: Option<String>,
    user_message_count: i64,
    created_at: String,
    closed_at: Option<String>,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            state: row.try_get("state")?,
            topic_id: row.try_get("topic_id")?,
            user_message_count: row.try_get("user_message_count")?,
            created_at: row.try_get("created_at")?,
            closed_at: row.try_get("closed_at")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Decode(format!("invalid session id: {e}")))?;
        let state: SessionState = self.state.parse().map_err(RepositoryError::Decode)?;
        let user_message_count = u32::try_from(self.user_message_count).map_err(|_| {
            RepositoryError::Decode(format!(
                "invalid user message count: {}",
                self.user_message_count
            ))
        })?;
        let closed_at = self.closed_at.as_deref().map(parse_datetime).transpose()?;

        Ok(Session {
            id,
            user_id: self.user_id,
            state,
            topic_id: self.topic_id,
            user_message_count,
            created_at: parse_datetime(&self.created_at)?,
            closed_at,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Session, RepositoryError> {
    SessionRow::from_row(row)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .into_session()
}

impl SessionRepository for SqliteSessionRepository {
    async fn create_if_none_open(
        &self,
        session: &Session,
    ) -> Result<(Session, bool), RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO sessions (id, user_id, state, topic_id, user_message_count, created_at, closed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id)
        .bind(session.state.to_string())
        .bind(&session.topic_id)
        .bind(i64::from(session.user_message_count))
        .bind(format_datetime(&session.created_at))
        .bind(session.closed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        let created = result.rows_affected() == 1;

        // Read back through the writer so the row is visible regardless of WAL snapshot.
        let open = self
            .find_open_on(&self.pool.writer, session.user_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::Conflict(format!(
                    "no open session for user {} after insert",
                    session.user_id
                ))
            })?;

        Ok((open, created))
    }

    async fn get(&self, session_id: &Uuid) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn find_open(&self, user_id: i64) -> Result<Option<Session>, RepositoryError> {
        self.find_open_on(&self.pool.reader, user_id).await
    }

    async fn find_last_closed(&self, user_id: i64) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM sessions
               WHERE user_id = ? AND state = 'closed'
               ORDER BY created_at DESC, id DESC
               LIMIT 1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Session>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM sessions
               WHERE user_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(user_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(decode).collect()
    }

    async fn activate(&self, session_id: &Uuid, topic_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE sessions SET state = 'active', topic_id = ? WHERE id = ? AND state = 'awaiting_topic'",
        )
        .bind(topic_id)
        .bind(session_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_user_messages(
        &self,
        session_id: &Uuid,
    ) -> Result<Option<u32>, RepositoryError> {
        let row = sqlx::query(
            r#"UPDATE sessions
               SET user_message_count = user_message_count + 1
               WHERE id = ? AND state = 'active'
               RETURNING user_message_count"#,
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let count: i64 = row
            .try_get("user_message_count")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        u32::try_from(count)
            .map(Some)
            .map_err(|_| RepositoryError::Decode(format!("invalid user message count: {count}")))
    }

    async fn mark_closed(
        &self,
        session_id: &Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE sessions SET state = 'closed', closed_at = ? WHERE id = ? AND state != 'closed'",
        )
        .bind(format_datetime(&closed_at))
        .bind(session_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }
}
