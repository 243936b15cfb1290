use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use lectern_model::{User, UserId};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::ports::{Notifier, UserEvent};

/// Who a [`HubMessage`] is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Admins,
    User(UserId),
}

/// One event as seen by transport subscribers.
#[derive(Debug, Clone)]
pub struct HubMessage {
    pub audience: Audience,
    pub event: UserEvent,
    pub payload: serde_json::Value,
}

impl HubMessage {
    /// Whether a connection owned by `user_id` should receive this message.
    pub fn is_for(&self, user_id: UserId, is_admin: bool) -> bool {
        match self.audience {
            Audience::Admins => is_admin,
            Audience::User(target) => target == user_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Presence {
    user_id: UserId,
    is_admin: bool,
}

/// Presence tracking plus a fan-out channel for account events.
///
/// Transports call [`BroadcastHub::connect`] when a client attaches, forward
/// whatever [`BroadcastHub::subscribe`] yields after filtering with
/// [`HubMessage::is_for`], and call [`BroadcastHub::disconnect`] on close.
#[derive(Clone)]
pub struct BroadcastHub {
    connections: Arc<DashMap<Uuid, Presence>>,
    broadcast: Arc<broadcast::Sender<HubMessage>>,
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("connection_count", &self.connections.len())
            .field("broadcast_receivers", &self.broadcast.receiver_count())
            .finish()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);

        Self {
            connections: Arc::new(DashMap::new()),
            broadcast: Arc::new(tx),
        }
    }

    /// Register a live connection for `user` and return its connection id.
    pub fn connect(&self, user: &User) -> Uuid {
        let conn_id = Uuid::now_v7();
        self.connections.insert(
            conn_id,
            Presence {
                user_id: user.id,
                is_admin: user.is_admin_or_up(),
            },
        );
        conn_id
    }

    pub fn disconnect(&self, conn_id: Uuid) {
        self.connections.remove(&conn_id);
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections
            .iter()
            .any(|entry| entry.value().user_id == user_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubMessage> {
        self.broadcast.subscribe()
    }

    fn send(&self, message: HubMessage) {
        // No receivers is normal when nobody is connected.
        if self.broadcast.send(message).is_err() {
            trace!("account event dropped, no subscribers");
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastHub {
    fn broadcast_to_admins(
        &self,
        event: UserEvent,
        payload: serde_json::Value,
    ) {
        self.send(HubMessage {
            audience: Audience::Admins,
            event,
            payload,
        });
    }

    fn broadcast_to_user(
        &self,
        user_id: UserId,
        event: UserEvent,
        payload: serde_json::Value,
    ) {
        self.send(HubMessage {
            audience: Audience::User(user_id),
            event,
            payload,
        });
    }

    fn online_user_ids(&self) -> Vec<UserId> {
        self.connections
            .iter()
            .map(|entry| entry.value().user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
