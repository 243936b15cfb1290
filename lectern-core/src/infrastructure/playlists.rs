use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lectern_model::{LibraryItemId, PlaylistId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ports::PlaylistStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: PlaylistId,
    pub user_id: UserId,
    pub name: String,
    pub items: Vec<LibraryItemId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: PlaylistId::new(),
            user_id,
            name: name.into(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Process-local playlist storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlaylistStore {
    playlists: Arc<DashMap<PlaylistId, Playlist>>,
}

impl MemoryPlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, playlist: Playlist) {
        self.playlists.insert(playlist.id, playlist);
    }

    pub fn for_user(&self, user_id: UserId) -> Vec<Playlist> {
        self.playlists
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl PlaylistStore for MemoryPlaylistStore {
    async fn delete_for_user(
        &self,
        user_id: UserId,
    ) -> Result<usize, StoreError> {
        let before = self.playlists.len();
        self.playlists.retain(|_, playlist| playlist.user_id != user_id);
        Ok(before.saturating_sub(self.playlists.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deleting_for_user_keeps_other_owners() {
        let store = MemoryPlaylistStore::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        store.insert(Playlist::new(alice, "commute"));
        store.insert(Playlist::new(alice, "sleep"));
        store.insert(Playlist::new(bob, "workout"));

        assert_eq!(store.delete_for_user(alice).await.unwrap(), 2);
        assert!(store.for_user(alice).is_empty());
        assert_eq!(store.for_user(bob).len(), 1);
    }
}
