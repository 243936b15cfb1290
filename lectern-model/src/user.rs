//! Account entity.
//!
//! [`User`] deliberately does not implement `Serialize`: every outbound
//! representation goes through one of the projections in [`crate::views`],
//! and only [`User::to_full_view`] carries the credential hash.

use chrono::{DateTime, Utc};

use crate::ids::{LibraryId, SeriesId, UserId};
use crate::permissions::PermissionSet;
use crate::progress::{AudioBookmark, MediaProgress};
use crate::role::UserRole;

/// Identity and authorization state for one account.
#[derive(Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    /// Identifier from before the uuid migration, kept so old tokens and
    /// clients keep resolving.
    pub legacy_id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    /// Opaque hash produced by the authentication collaborator
    pub credential_hash: Option<String>,
    pub role: UserRole,
    /// Bearer credential; regenerated whenever the username changes
    pub token: String,
    pub media_progress: Vec<MediaProgress>,
    pub series_hide_from_continue_listening: Vec<SeriesId>,
    pub bookmarks: Vec<AudioBookmark>,
    pub is_active: bool,
    pub is_locked: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub permissions: PermissionSet,
    /// Empty means every library, honoured only with `access_all_libraries`
    pub libraries_accessible: Vec<LibraryId>,
    /// Empty means every tag, honoured only with `access_all_tags`
    pub item_tags_selected: Vec<String>,
    /// Subject of a linked third-party identity provider account
    pub external_identity_sub: Option<String>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("is_locked", &self.is_locked)
            .field("permissions", &self.permissions)
            .field("has_password", &self.has_password())
            .finish_non_exhaustive()
    }
}

impl User {
    /// Fresh account with role-default grants and no credential or token yet.
    pub fn new(
        username: impl Into<String>,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            legacy_id: None,
            username: username.into(),
            email: None,
            credential_hash: None,
            role,
            token: String::new(),
            media_progress: Vec::new(),
            series_hide_from_continue_listening: Vec::new(),
            bookmarks: Vec::new(),
            is_active: true,
            is_locked: false,
            last_seen: None,
            created_at: now,
            permissions: PermissionSet::defaults_for(role),
            libraries_accessible: Vec::new(),
            item_tags_selected: Vec::new(),
            external_identity_sub: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.role == UserRole::Root
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_user(&self) -> bool {
        self.role == UserRole::User
    }

    pub fn is_guest(&self) -> bool {
        self.role == UserRole::Guest
    }

    pub fn is_admin_or_up(&self) -> bool {
        self.role.is_admin_or_up()
    }

    /// Active and not locked. Root is always usable.
    pub fn is_usable(&self) -> bool {
        self.is_root() || (self.is_active && !self.is_locked)
    }

    pub fn can_delete(&self) -> bool {
        self.permissions.delete && self.is_usable()
    }

    pub fn can_update(&self) -> bool {
        self.permissions.update && self.is_usable()
    }

    pub fn can_download(&self) -> bool {
        self.permissions.download && self.is_usable()
    }

    pub fn can_upload(&self) -> bool {
        self.permissions.upload && self.is_usable()
    }

    pub fn can_access_explicit_content(&self) -> bool {
        self.permissions.access_explicit_content && self.is_usable()
    }

    pub fn has_password(&self) -> bool {
        self.credential_hash
            .as_deref()
            .is_some_and(|hash| !hash.is_empty())
    }

    pub fn has_external_identity(&self) -> bool {
        self.external_identity_sub.is_some()
    }

    /// Record activity; `last_seen` never moves backwards.
    pub fn touch_last_seen(&mut self, now: DateTime<Utc>) {
        if self.last_seen.is_none_or(|seen| seen < now) {
            self.last_seen = Some(now);
        }
    }
}
