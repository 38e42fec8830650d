//! SQLite dialogue history repository implementation.

use sqlx::Row;
use uuid::Uuid;

use talkgate_core::repository::history::HistoryRepository;
use talkgate_types::error::RepositoryError;
use talkgate_types::history::{MessageRole, Turn};

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `HistoryRepository`.
#[derive(Clone)]
pub struct SqliteHistoryRepository {
    pool: DatabasePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct TurnRow {
    id: String,
    session_id: String,
    user_id: i64,
    role: String,
    text: String,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            role: row.try_get("role")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Decode(format!("invalid turn id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Decode(format!("invalid session id: {e}")))?;
        let role: MessageRole = self.role.parse().map_err(RepositoryError::Decode)?;

        Ok(Turn {
            id,
            session_id,
            user_id: self.user_id,
            role,
            text: self.text,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, RepositoryError> {
    TurnRow::from_row(row)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .into_turn()
}

impl HistoryRepository for SqliteHistoryRepository {
    async fn append(&self, turn: &Turn) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO dialogues (id, session_id, user_id, role, text, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(turn.session_id.to_string())
        .bind(turn.user_id)
        .bind(turn.role.to_string())
        .bind(&turn.text)
        .bind(format_datetime(&turn.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Turn>, RepositoryError> {
        // With a limit, keep the newest `limit` turns but return them oldest first.
        let rows = sqlx::query(
            r#"SELECT * FROM (
                   SELECT * FROM dialogues
                   WHERE user_id = ?
                   ORDER BY created_at DESC, id DESC
                   LIMIT ?
               )
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(user_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(decode).collect()
    }

    async fn list_for_session(&self, session_id: &Uuid) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM dialogues WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::session::SqliteSessionRepository;
    use crate::sqlite::test_support::test_pool;
    use chrono::Utc;
    use talkgate_core::repository::session::SessionRepository;
    use talkgate_types::session::Session;

    async fn open_session(pool: &DatabasePool, user_id: i64) -> Session {
        let sessions = SqliteSessionRepository::new(pool.clone());
        let (session, _) = sessions
            .create_if_none_open(&Session::open(user_id, Utc::now()))
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_append_and_list_in_order() {
        let pool = test_pool().await;
        let repo = SqliteHistoryRepository::new(pool.clone());
        let session = open_session(&pool, 1).await;

        repo.append(&Turn::topic_marker(session.id, 1, "prompt_1"))
            .await
            .unwrap();
        repo.append(&Turn::new(session.id, 1, MessageRole::System, "Be kind."))
            .await
            .unwrap();
        repo.append(&Turn::new(session.id, 1, MessageRole::User, "hi"))
            .await
            .unwrap();
        repo.append(&Turn::new(session.id, 1, MessageRole::Assistant, "hello"))
            .await
            .unwrap();

        let turns = repo.list_for_session(&session.id).await.unwrap();
        let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["#topic:prompt_1", "Be kind.", "hi", "hello"]);
        assert!(turns[0].is_topic_marker());
        assert_eq!(turns[3].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_list_for_user_spans_sessions_and_limits_to_newest() {
        let pool = test_pool().await;
        let repo = SqliteHistoryRepository::new(pool.clone());
        let sessions = SqliteSessionRepository::new(pool.clone());

        let first = open_session(&pool, 7).await;
        repo.append(&Turn::new(first.id, 7, MessageRole::User, "one"))
            .await
            .unwrap();
        sessions.mark_closed(&first.id, Utc::now()).await.unwrap();

        let second = open_session(&pool, 7).await;
        repo.append(&Turn::new(second.id, 7, MessageRole::User, "two"))
            .await
            .unwrap();
        repo.append(&Turn::new(second.id, 7, MessageRole::Assistant, "three"))
            .await
            .unwrap();

        let all = repo.list_for_user(7, None).await.unwrap();
        let texts: Vec<&str> = all.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);

        let newest = repo.list_for_user(7, Some(2)).await.unwrap();
        let texts: Vec<&str> = newest.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["two", "three"]);

        assert!(repo.list_for_user(8, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_requires_existing_session() {
        let repo = SqliteHistoryRepository::new(test_pool().await);
        let orphan = Turn::new(Uuid::now_v7(), 1, MessageRole::User, "lost");
        assert!(matches!(
            repo.append(&orphan).await,
            Err(RepositoryError::Query(_))
        ));
    }
}
