//! Entitlement repository trait definition.

use talkgate_types::entitlement::{Entitlement, ProcessTag, PurchaseUpdate};
use talkgate_types::error::RepositoryError;

/// Repository trait for per-user entitlement records.
///
/// Implementations live in talkgate-infra (e.g., `SqliteEntitlementRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait EntitlementRepository: Send + Sync {
    /// Get the entitlement for a user.
    fn get(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Entitlement>, RepositoryError>> + Send;

    /// Insert a record unless one already exists for the user.
    ///
    /// Returns `true` when this call created the record. Concurrent callers
    /// converge on a single row.
    fn insert_if_absent(
        &self,
        entitlement: &Entitlement,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Apply a plan purchase as one field-group update.
    ///
    /// Returns the updated record, or `None` when the user has no record.
    fn apply_purchase(
        &self,
        user_id: i64,
        update: &PurchaseUpdate,
    ) -> impl std::future::Future<Output = Result<Option<Entitlement>, RepositoryError>> + Send;

    /// Overwrite the process tag. Returns `false` when the user has no record.
    fn set_process(
        &self,
        user_id: i64,
        process: ProcessTag,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Charge one session against a capped quota.
    ///
    /// A no-op for unlimited records. Returns the remaining quota, or `None`
    /// when nothing was charged.
    fn consume_session(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<i64>, RepositoryError>> + Send;
}
