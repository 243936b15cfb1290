use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LibraryItemId, PlaybackSessionId, UserId};

/// Client-facing summary of an open playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSessionSummary {
    pub id: PlaybackSessionId,
    pub user_id: UserId,
    pub library_item_id: LibraryItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    pub display_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_author: Option<String>,
    /// Playback head in seconds
    pub current_time: f64,
    /// Total listened in this session, seconds
    pub time_listening: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Pick the session that best represents what `user_id` is doing right now:
/// the most recently updated one.
pub fn latest_session_for<'a>(
    sessions: &'a [PlaybackSessionSummary],
    user_id: &UserId,
) -> Option<&'a PlaybackSessionSummary> {
    sessions
        .iter()
        .filter(|session| &session.user_id == user_id)
        .max_by_key(|session| session.updated_at)
}
