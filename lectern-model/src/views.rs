//! Audience-specific projections of a [`User`].
//!
//! | View            | Audience               | Hash  | Token          |
//! |-----------------|------------------------|-------|----------------|
//! | [`StoredUser`]  | the directory          | yes   | yes            |
//! | [`BrowserUser`] | owner and other admins | never | hidden if root |
//! | [`PublicUser`]  | anyone                 | never | never          |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LibraryId, SeriesId, UserId};
use crate::permissions::PermissionSet;
use crate::progress::{AudioBookmark, MediaProgress};
use crate::role::UserRole;
use crate::session::{PlaybackSessionSummary, latest_session_for};
use crate::stored::{StoredPermissions, StoredUser};
use crate::user::User;

/// Everything except the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserUser {
    pub id: UserId,
    pub old_user_id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub role: UserRole,
    pub token: String,
    /// Omitted from minimal views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_progress: Option<Vec<MediaProgress>>,
    pub series_hide_from_continue_listening: Vec<SeriesId>,
    /// Omitted from minimal views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<Vec<AudioBookmark>>,
    pub is_active: bool,
    pub is_locked: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub permissions: PermissionSet,
    pub libraries_accessible: Vec<LibraryId>,
    pub item_tags_selected: Vec<String>,
    #[serde(rename = "hasOpenIDLink")]
    pub has_open_id_link: bool,
}

/// Minimal projection safe for non-privileged and anonymous callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub old_user_id: Option<String>,
    pub username: String,
    #[serde(rename = "type")]
    pub role: UserRole,
    pub session: Option<PlaybackSessionSummary>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Complete record for the durable store. Never send this to a client.
    pub fn to_full_view(&self) -> StoredUser {
        StoredUser {
            id: self.id,
            legacy_id: self.legacy_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            credential_hash: self.credential_hash.clone(),
            role: self.role,
            token: self.token.clone(),
            media_progress: self.media_progress.clone(),
            series_hide_from_continue_listening: self
                .series_hide_from_continue_listening
                .clone(),
            bookmarks: self.bookmarks.clone(),
            is_active: Some(self.is_active),
            is_locked: Some(self.is_locked),
            last_seen: self.last_seen,
            created_at: Some(self.created_at),
            permissions: Some(StoredPermissions::from(self.permissions)),
            libraries_accessible: self.libraries_accessible.clone(),
            item_tags_selected: self.item_tags_selected.clone(),
            item_tags_accessible: None,
            external_identity_sub: self.external_identity_sub.clone(),
        }
    }

    /// View for the account owner and admins.
    ///
    /// `hide_root_token` blanks the token when this account is root; callers
    /// pass `!actor.is_root()`. `minimal` drops progress and bookmarks for
    /// bulk listings.
    pub fn to_browser_view(
        &self,
        hide_root_token: bool,
        minimal: bool,
    ) -> BrowserUser {
        let token = if self.is_root() && hide_root_token {
            String::new()
        } else {
            self.token.clone()
        };

        BrowserUser {
            id: self.id,
            old_user_id: self.legacy_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            token,
            media_progress: (!minimal).then(|| self.media_progress.clone()),
            series_hide_from_continue_listening: self
                .series_hide_from_continue_listening
                .clone(),
            bookmarks: (!minimal).then(|| self.bookmarks.clone()),
            is_active: self.is_active,
            is_locked: self.is_locked,
            last_seen: self.last_seen,
            created_at: self.created_at,
            permissions: self.permissions,
            libraries_accessible: self.libraries_accessible.clone(),
            item_tags_selected: self.item_tags_selected.clone(),
            has_open_id_link: self.has_external_identity(),
        }
    }

    /// View for anyone, decorated with this user's latest open session.
    pub fn to_public_view(
        &self,
        active_sessions: &[PlaybackSessionSummary],
    ) -> PublicUser {
        PublicUser {
            id: self.id,
            old_user_id: self.legacy_id.clone(),
            username: self.username.clone(),
            role: self.role,
            session: latest_session_for(active_sessions, &self.id).cloned(),
            last_seen: self.last_seen,
            created_at: self.created_at,
        }
    }
}
