//! Account data model shared across Lectern crates.
//!
//! Holds the [`User`] entity, its [`PermissionSet`], the audience-specific
//! views and the stored-record normalization. No I/O happens here.
#![allow(missing_docs)]

pub mod api;
pub mod ids;
pub mod permissions;
pub mod progress;
pub mod role;
pub mod routes;
pub mod session;
pub mod stored;
pub mod user;
pub mod views;

pub use api::{
    ApiResponse, OnlineUsersResponse, UserListEntry, UserListResponse,
};
pub use ids::{
    LibraryId, LibraryItemId, MediaProgressId, PlaybackSessionId, PlaylistId,
    SeriesId, UserId,
};
pub use permissions::{PermissionSet, PermissionsPatch};
pub use progress::{AudioBookmark, MediaProgress};
pub use role::UserRole;
pub use session::{PlaybackSessionSummary, latest_session_for};
pub use stored::{StoredPermissions, StoredUser};
pub use user::User;
pub use views::{BrowserUser, PublicUser};
