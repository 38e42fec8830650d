//! SQLite entitlement repository implementation.

use chrono::Utc;
use sqlx::Row;

use talkgate_core::repository::entitlement::EntitlementRepository;
use talkgate_types::entitlement::{Entitlement, Plan, ProcessTag, PurchaseUpdate, SessionGrant};
use talkgate_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `EntitlementRepository`.
#[derive(Clone)]
pub struct SqliteEntitlementRepository {
    pool: DatabasePool,
}

impl SqliteEntitlementRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Entitlement.
struct EntitlementRow {
    user_id: i64,
    plan: String,
    subscription_start: String,
    subscription_end: String,
    sessions_left: i64,
    unlimited: i64,
    process: String,
    created_at: String,
    updated_at: String,
}

impl EntitlementRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            plan: row.try_get("plan")?,
            subscription_start: row.try_get("subscription_start")?,
            subscription_end: row.try_get("subscription_end")?,
            sessions_left: row.try_get("sessions_left")?,
            unlimited: row.try_get("unlimited")?,
            process: row.try_get("process")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_entitlement(self) -> Result<Entitlement, RepositoryError> {
        let plan: Plan = self.plan.parse().map_err(RepositoryError::Decode)?;
        let process: ProcessTag = self.process.parse().map_err(RepositoryError::Decode)?;
        let unlimited = match self.unlimited {
            0 => false,
            1 => true,
            other => {
                return Err(RepositoryError::Decode(format!(
                    "invalid unlimited flag: {other}"
                )));
            }
        };

        Ok(Entitlement {
            user_id: self.user_id,
            plan,
            subscription_start: parse_datetime(&self.subscription_start)?,
            subscription_end: parse_datetime(&self.subscription_end)?,
            sessions_left: self.sessions_left,
            unlimited,
            process,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Entitlement, RepositoryError> {
    EntitlementRow::from_row(row)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .into_entitlement()
}

impl EntitlementRepository for SqliteEntitlementRepository {
    async fn get(&self, user_id: i64) -> Result<Option<Entitlement>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM entitlements WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn insert_if_absent(&self, entitlement: &Entitlement) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO entitlements (user_id, plan, subscription_start, subscription_end, sessions_left, unlimited, process, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user_id) DO NOTHING"#,
        )
        .bind(entitlement.user_id)
        .bind(entitlement.plan.to_string())
        .bind(format_datetime(&entitlement.subscription_start))
        .bind(format_datetime(&entitlement.subscription_end))
        .bind(entitlement.sessions_left)
        .bind(entitlement.unlimited)
        .bind(entitlement.process.to_string())
        .bind(format_datetime(&entitlement.created_at))
        .bind(format_datetime(&entitlement.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn apply_purchase(
        &self,
        user_id: i64,
        update: &PurchaseUpdate,
    ) -> Result<Option<Entitlement>, RepositoryError> {
        // One statement covers both quota policies: `?6` selects increment.
        let (sessions, increment) = match update.sessions {
            SessionGrant::Set(n) => (n, false),
            SessionGrant::Increment(n) => (n, true),
        };

        let row = sqlx::query(
            r#"UPDATE entitlements
               SET plan = ?1,
                   subscription_start = ?2,
                   subscription_end = ?3,
                   unlimited = ?4,
                   sessions_left = CASE WHEN ?6 THEN sessions_left + ?5 ELSE ?5 END,
                   updated_at = ?7
               WHERE user_id = ?8
               RETURNING *"#,
        )
        .bind(update.plan.to_string())
        .bind(format_datetime(&update.subscription_start))
        .bind(format_datetime(&update.subscription_end))
        .bind(update.unlimited)
        .bind(sessions)
        .bind(increment)
        .bind(format_datetime(&Utc::now()))
        .bind(user_id)
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_err)?;

        row.as_ref().map(decode).transpose()
    }

    async fn set_process(&self, user_id: i64, process: ProcessTag) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE entitlements SET process = ?, updated_at = ? WHERE user_id = ?")
                .bind(process.to_string())
                .bind(format_datetime(&Utc::now()))
                .bind(user_id)
                .execute(&self.pool.writer)
                .await
                .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn consume_session(&self, user_id: i64) -> Result<Option<i64>, RepositoryError> {
        let row = sqlx::query(
            r#"UPDATE entitlements
               SET sessions_left = sessions_left - 1, updated_at = ?
               WHERE user_id = ? AND unlimited = 0
               RETURNING sessions_left"#,
        )
        .bind(format_datetime(&Utc::now()))
        .bind(user_id)
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_err)?;

        row.map(|r| r.try_get::<i64, _>("sessions_left"))
            .transpose()
            .map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}
