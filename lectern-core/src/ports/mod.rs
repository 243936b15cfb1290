//! Collaborator contracts the account core depends on.
//!
//! Implementations live outside the rules: [`crate::infrastructure`] ships
//! in-process adapters, and a deployment may swap in others.

pub mod auth;
pub mod directory;
pub mod notify;
pub mod playlists;
pub mod sessions;

pub use auth::Authenticator;
pub use directory::UserDirectory;
pub use notify::{Notifier, UserEvent};
pub use playlists::PlaylistStore;
pub use sessions::SessionLookup;
