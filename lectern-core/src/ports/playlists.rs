use async_trait::async_trait;
use lectern_model::UserId;

use crate::error::StoreError;

/// Content-organization records owned by an account.
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Remove every playlist owned by `user_id`, returning how many went.
    async fn delete_for_user(
        &self,
        user_id: UserId,
    ) -> Result<usize, StoreError>;
}
