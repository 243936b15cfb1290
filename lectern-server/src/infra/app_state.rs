use std::{fmt, sync::Arc};

use lectern_core::UserService;
use lectern_core::infrastructure::{
    BroadcastHub, MemoryPlaylistStore, MemorySessionRegistry,
};
use lectern_core::ports::{Authenticator, UserDirectory};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<UserService>,
    /// Live connections; also the notifier behind `users`
    pub hub: BroadcastHub,
    pub sessions: MemorySessionRegistry,
    pub playlists: MemoryPlaylistStore,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the account service over the given directory and authenticator,
    /// with fresh in-process hub, session registry and playlist store.
    pub fn new(
        config: Config,
        directory: Arc<dyn UserDirectory>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let hub = BroadcastHub::new();
        let sessions = MemorySessionRegistry::new();
        let playlists = MemoryPlaylistStore::new();

        let users = UserService::new(
            directory,
            authenticator,
            Arc::new(hub.clone()),
            Arc::new(sessions.clone()),
            Arc::new(playlists.clone()),
        );

        Self {
            config: Arc::new(config),
            users: Arc::new(users),
            hub,
            sessions,
            playlists,
        }
    }
}
