//! SQLite prompt catalogue repository implementation.

use sqlx::Row;

use talkgate_core::repository::prompt::PromptRepository;
use talkgate_types::error::RepositoryError;
use talkgate_types::prompt::Prompt;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `PromptRepository`.
#[derive(Clone)]
pub struct SqlitePromptRepository {
    pool: DatabasePool,
}

impl SqlitePromptRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct PromptRow {
    id: String,
    title: String,
    text: String,
    created_at: String,
}

impl PromptRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_prompt(self) -> Result<Prompt, RepositoryError> {
        Ok(Prompt {
            id: self.id,
            title: self.title,
            text: self.text,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Prompt, RepositoryError> {
    PromptRow::from_row(row)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .into_prompt()
}

impl PromptRepository for SqlitePromptRepository {
    async fn upsert(&self, prompt: &Prompt) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO prompts (id, title, text, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET title = excluded.title, text = excluded.text"#,
        )
        .bind(&prompt.id)
        .bind(&prompt.title)
        .bind(&prompt.text)
        .bind(format_datetime(&prompt.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Prompt>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM prompts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn list(&self) -> Result<Vec<Prompt>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM prompts ORDER BY id ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(decode).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = ?")
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::test_pool;
    use chrono::Utc;

    fn prompt(id: &str, title: &str, text: &str) -> Prompt {
        Prompt {
            id: id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_title_and_text() {
        let repo = SqlitePromptRepository::new(test_pool().await);

        repo.upsert(&prompt("career", "Career", "Talk about jobs."))
            .await
            .unwrap();
        repo.upsert(&prompt("career", "Career advice", "Talk about careers."))
            .await
            .unwrap();

        let stored = repo.get("career").await.unwrap().unwrap();
        assert_eq!(stored.title, "Career advice");
        assert_eq!(stored.text, "Talk about careers.");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_ordered_by_id_and_delete() {
        let repo = SqlitePromptRepository::new(test_pool().await);
        repo.upsert(&prompt("prompt_2", "B", "b")).await.unwrap();
        repo.upsert(&prompt("prompt_1", "A", "a")).await.unwrap();

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["prompt_1", "prompt_2"]);

        assert!(repo.delete("prompt_1").await.unwrap());
        assert!(!repo.delete("prompt_1").await.unwrap());
        assert!(repo.get("prompt_1").await.unwrap().is_none());
    }
}
