//! In-process adapters for the collaborator ports.

pub mod hub;
pub mod json_directory;
pub mod playlists;
pub mod sessions;

pub use hub::{Audience, BroadcastHub, HubMessage};
pub use json_directory::JsonUserDirectory;
pub use playlists::{MemoryPlaylistStore, Playlist};
pub use sessions::MemorySessionRegistry;
