use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_model::{User, UserId};

use crate::error::StoreError;

/// Persistence for account records.
///
/// The directory owns the username case policy and the global "exactly one
/// root" rule: `create` must fail with [`StoreError::Constraint`] when asked
/// to store a second root account or a username that is already taken.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn exists_by_username(
        &self,
        username: &str,
    ) -> Result<bool, StoreError>;

    async fn list_all(&self) -> Result<Vec<User>, StoreError>;

    /// Returns `false` when the record was not stored.
    async fn create(&self, user: &User) -> Result<bool, StoreError>;

    /// Returns `false` when no record with this id exists.
    async fn update(&self, user: &User) -> Result<bool, StoreError>;

    /// Returns `false` when no record with this id exists.
    async fn delete(&self, user: &User) -> Result<bool, StoreError>;

    /// Advance `last_seen` on the currently stored record only. Every other
    /// field is left as stored, so concurrent updates are never reverted.
    ///
    /// Returns `false` when no record with this id exists.
    async fn touch_last_seen(
        &self,
        id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
