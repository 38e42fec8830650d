//! SQLite side-channel capture repository (support, feedback, ratings).

use talkgate_core::repository::capture::CaptureRepository;
use talkgate_types::capture::{FeedbackMessage, SessionRating, SupportMessage};
use talkgate_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::{format_datetime, query_err};

/// SQLite-backed implementation of `CaptureRepository`.
///
/// All three logs are append-only; nothing in the bot reads them back.
#[derive(Clone)]
pub struct SqliteCaptureRepository {
    pool: DatabasePool,
}

impl SqliteCaptureRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl CaptureRepository for SqliteCaptureRepository {
    async fn save_support(&self, message: &SupportMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO support_messages (id, user_id, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.user_id)
        .bind(&message.text)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn save_feedback(&self, message: &FeedbackMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO feedback_messages (id, user_id, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.user_id)
        .bind(&message.text)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn save_rating(&self, rating: &SessionRating) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO session_ratings (id, user_id, session_id, score, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(rating.id.to_string())
        .bind(rating.user_id)
        .bind(rating.session_id.to_string())
        .bind(i64::from(rating.score))
        .bind(format_datetime(&rating.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }
}
