use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LibraryItemId, MediaProgressId};

/// Listening position for one book or podcast episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaProgress {
    pub id: MediaProgressId,
    pub library_item_id: LibraryItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    /// Duration of the media in seconds
    #[serde(default)]
    pub duration: f64,
    /// Fraction listened, 0.0..=1.0
    #[serde(default)]
    pub progress: f64,
    /// Playback head in seconds
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,
}

/// Named position inside a library item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBookmark {
    pub library_item_id: LibraryItemId,
    pub title: String,
    /// Position in seconds
    pub time: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}
