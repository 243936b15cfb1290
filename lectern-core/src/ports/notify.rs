use lectern_model::UserId;
use serde::Serialize;

/// Account events pushed to connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserEvent {
    UserAdded,
    UserUpdated,
    UserRemoved,
}

impl UserEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserEvent::UserAdded => "user_added",
            UserEvent::UserUpdated => "user_updated",
            UserEvent::UserRemoved => "user_removed",
        }
    }
}

impl std::fmt::Display for UserEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget delivery to connected clients. Callers never wait for or
/// verify delivery.
pub trait Notifier: Send + Sync {
    fn broadcast_to_admins(&self, event: UserEvent, payload: serde_json::Value);

    fn broadcast_to_user(
        &self,
        user_id: UserId,
        event: UserEvent,
        payload: serde_json::Value,
    );

    /// Accounts with at least one live connection.
    fn online_user_ids(&self) -> Vec<UserId>;
}
