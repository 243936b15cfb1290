use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use lectern_model::{PlaybackSessionId, PlaybackSessionSummary, UserId};

use crate::error::StoreError;
use crate::ports::SessionLookup;

/// Open playback sessions kept by the streaming side of the server.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionRegistry {
    sessions: Arc<DashMap<PlaybackSessionId, PlaybackSessionSummary>>,
}

impl MemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a session.
    pub fn open(&self, session: PlaybackSessionSummary) {
        self.sessions.insert(session.id, session);
    }

    pub fn close(
        &self,
        id: PlaybackSessionId,
    ) -> Option<PlaybackSessionSummary> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    fn collect(
        &self,
        filter: impl Fn(&PlaybackSessionSummary) -> bool,
    ) -> Vec<PlaybackSessionSummary> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }
}

#[async_trait]
impl SessionLookup for MemorySessionRegistry {
    async fn find_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PlaybackSessionSummary>, StoreError> {
        Ok(self.collect(|session| session.user_id == user_id))
    }

    async fn open_sessions(
        &self,
    ) -> Result<Vec<PlaybackSessionSummary>, StoreError> {
        Ok(self.collect(|_| true))
    }
}
