use async_trait::async_trait;
use lectern_model::{PlaybackSessionSummary, UserId};

use crate::error::StoreError;

/// Read-only view over playback sessions.
#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn find_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PlaybackSessionSummary>, StoreError>;

    /// Sessions currently open across all users.
    async fn open_sessions(
        &self,
    ) -> Result<Vec<PlaybackSessionSummary>, StoreError>;
}
