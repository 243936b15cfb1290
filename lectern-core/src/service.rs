//! Account operations exposed to the HTTP layer.
//!
//! Every public method runs the [`AccessController`] first, then talks to the
//! collaborators. Nothing here retries; a collaborator failure ends the
//! request.

use std::sync::Arc;

use chrono::{Duration, Utc};
use lectern_model::{
    BrowserUser, LibraryId, OnlineUsersResponse, PermissionsPatch, User, UserId,
    UserListEntry, UserListResponse, UserRole, latest_session_for,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::access::{AccessController, UserOperation};
use crate::auth::AuthCryptoError;
use crate::error::{Result, StoreError, UserError};
use crate::ports::{
    Authenticator, Notifier, PlaylistStore, SessionLookup, UserDirectory,
    UserEvent,
};
use crate::update::{UpdatePolicy, UserUpdate};

/// How stale `last_seen` may get, in seconds, before a bearer lookup
/// refreshes it.
const LAST_SEEN_RESOLUTION_SECS: i64 = 60;

/// Payload for creating an account.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserCommand {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub permissions: Option<PermissionsPatch>,
    #[serde(default)]
    pub libraries_accessible: Vec<LibraryId>,
    #[serde(default)]
    pub item_tags_selected: Vec<String>,
}

impl CreateUserCommand {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            username: username.into(),
            password: None,
            email: None,
            role: Some(role),
            is_active: None,
            permissions: None,
            libraries_accessible: Vec::new(),
            item_tags_selected: Vec::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for CreateUserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserCommand")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("has_password", &self.password.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct UserService {
    directory: Arc<dyn UserDirectory>,
    authenticator: Arc<dyn Authenticator>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<dyn SessionLookup>,
    playlists: Arc<dyn PlaylistStore>,
    access: AccessController,
    policy: UpdatePolicy,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}

fn crypto_failure(err: AuthCryptoError) -> UserError {
    UserError::Store(StoreError::Backend(err.to_string()))
}

fn not_stored(operation: &str, user: &User) -> UserError {
    UserError::Store(StoreError::Backend(format!(
        "directory did not {operation} user {}",
        user.id
    )))
}

impl UserService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        authenticator: Arc<dyn Authenticator>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<dyn SessionLookup>,
        playlists: Arc<dyn PlaylistStore>,
    ) -> Self {
        Self {
            access: AccessController::new(directory.clone()),
            policy: UpdatePolicy::new(directory.clone()),
            directory,
            authenticator,
            notifier,
            sessions,
            playlists,
        }
    }

    /// All accounts in minimal browser form, optionally decorated with each
    /// account's most recent playback session.
    pub async fn list_users(
        &self,
        actor: &User,
        include_latest_session: bool,
    ) -> Result<UserListResponse> {
        self.access.authorize(actor, UserOperation::ListUsers)?;

        let hide_root_token = !actor.is_root();
        let users = self.directory.list_all().await?;
        let mut entries = Vec::with_capacity(users.len());

        for user in users {
            let latest_session = if include_latest_session {
                let sessions =
                    self.sessions.find_sessions_for_user(user.id).await?;
                Some(latest_session_for(&sessions, &user.id).cloned())
            } else {
                None
            };

            entries.push(UserListEntry {
                user: user.to_browser_view(hide_root_token, true),
                latest_session,
            });
        }

        Ok(UserListResponse { users: entries })
    }

    pub async fn get_user(
        &self,
        actor: &User,
        id: UserId,
    ) -> Result<BrowserUser> {
        let target = self
            .access
            .authorize_target(actor, UserOperation::View, id)
            .await?;
        Ok(target.to_browser_view(!actor.is_root(), false))
    }

    pub async fn create_user(
        &self,
        actor: &User,
        command: CreateUserCommand,
    ) -> Result<BrowserUser> {
        self.access.authorize(actor, UserOperation::Create)?;

        if command.username.is_empty() {
            return Err(UserError::invalid("username is required"));
        }
        let role = command.role.unwrap_or_default();
        if role == UserRole::Root {
            return Err(UserError::invalid("root accounts cannot be created"));
        }
        if self.directory.exists_by_username(&command.username).await? {
            return Err(UserError::Conflict(format!(
                "username {} is already taken",
                command.username
            )));
        }

        let mut user = User::new(command.username, role, Utc::now());
        user.email = command.email.filter(|email| !email.is_empty());
        user.is_active = command.is_active.unwrap_or(true);
        if let Some(patch) = command.permissions {
            patch.apply_to(&mut user.permissions);
        }
        if !user.permissions.access_all_libraries {
            user.libraries_accessible = command.libraries_accessible;
        }
        if user.permissions.access_all_tags {
            user.permissions.selected_tags_not_accessible = false;
        } else {
            user.item_tags_selected = command.item_tags_selected;
        }

        if let Some(password) =
            command.password.filter(|password| !password.is_empty())
        {
            user.credential_hash = Some(
                self.authenticator
                    .hash_secret(&password)
                    .map_err(crypto_failure)?,
            );
        }
        user.token = self
            .authenticator
            .issue_access_token(&user)
            .map_err(crypto_failure)?;

        if !self.directory.create(&user).await? {
            return Err(not_stored("create", &user));
        }

        info!(
            actor = %actor.username,
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "created user"
        );
        self.notifier.broadcast_to_admins(
            UserEvent::UserAdded,
            browser_payload(&user, true),
        );

        Ok(user.to_browser_view(!actor.is_root(), false))
    }

    pub async fn update_user(
        &self,
        actor: &User,
        id: UserId,
        mut update: UserUpdate,
    ) -> Result<BrowserUser> {
        let mut user = self
            .access
            .authorize_target(actor, UserOperation::Update, id)
            .await?;

        if let Some(password) = update.password.take()
            && !password.is_empty()
        {
            update.credential_hash = Some(
                self.authenticator
                    .hash_secret(&password)
                    .map_err(crypto_failure)?,
            );
        }

        let outcome = self.policy.apply(&mut user, update, actor).await?;
        if outcome.changed {
            if outcome.regenerate_token {
                user.token = self
                    .authenticator
                    .issue_access_token(&user)
                    .map_err(crypto_failure)?;
                info!(
                    username = %user.username,
                    "user has generated a new api token"
                );
            }

            if !self.directory.update(&user).await? {
                return Err(UserError::NotFound);
            }

            debug!(
                actor = %actor.username,
                user_id = %user.id,
                "updated user"
            );
            self.notifier.broadcast_to_user(
                actor.id,
                UserEvent::UserUpdated,
                browser_payload(&user, !actor.is_root()),
            );
        }

        Ok(user.to_browser_view(!actor.is_root(), false))
    }

    /// Remove an account and every playlist it owns.
    pub async fn delete_user(&self, actor: &User, id: UserId) -> Result<()> {
        let user = self
            .access
            .authorize_target(actor, UserOperation::Delete, id)
            .await?;

        let removed_playlists = self.playlists.delete_for_user(user.id).await?;

        if !self.directory.delete(&user).await? {
            return Err(UserError::NotFound);
        }

        info!(
            actor = %actor.username,
            user_id = %user.id,
            username = %user.username,
            removed_playlists,
            "deleted user"
        );
        self.notifier.broadcast_to_admins(
            UserEvent::UserRemoved,
            browser_payload(&user, true),
        );
        Ok(())
    }

    pub async fn unlink_external_identity(
        &self,
        actor: &User,
        id: UserId,
    ) -> Result<BrowserUser> {
        let mut user = self
            .access
            .authorize_target(
                actor,
                UserOperation::UnlinkExternalIdentity,
                id,
            )
            .await?;

        if user.external_identity_sub.take().is_some() {
            if !self.directory.update(&user).await? {
                return Err(UserError::NotFound);
            }
            info!(
                actor = %actor.username,
                user_id = %user.id,
                "unlinked external identity"
            );
            self.notifier.broadcast_to_user(
                actor.id,
                UserEvent::UserUpdated,
                browser_payload(&user, !actor.is_root()),
            );
        }

        Ok(user.to_browser_view(!actor.is_root(), false))
    }

    /// Accounts with a live connection plus every open playback session.
    pub async fn online_users(
        &self,
        actor: &User,
    ) -> Result<OnlineUsersResponse> {
        self.access.authorize(actor, UserOperation::ViewOnlineUsers)?;

        let open_sessions = self.sessions.open_sessions().await?;
        let mut users_online = Vec::new();
        for id in self.notifier.online_user_ids() {
            if let Some(user) = self.directory.find_by_id(id).await? {
                users_online.push(user.to_public_view(&open_sessions));
            }
        }

        Ok(OnlineUsersResponse {
            users_online,
            open_sessions,
        })
    }

    /// Create the root account unless one already exists.
    ///
    /// Returns the new account, or `None` when a root was already present.
    pub async fn ensure_root(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        if username.is_empty() {
            return Err(UserError::invalid("root username is required"));
        }
        if self
            .directory
            .list_all()
            .await?
            .iter()
            .any(User::is_root)
        {
            debug!("root account already present");
            return Ok(None);
        }

        let mut root = User::new(username, UserRole::Root, Utc::now());
        if !password.is_empty() {
            root.credential_hash = Some(
                self.authenticator
                    .hash_secret(password)
                    .map_err(crypto_failure)?,
            );
        }
        root.token = self
            .authenticator
            .issue_access_token(&root)
            .map_err(crypto_failure)?;

        if !self.directory.create(&root).await? {
            return Err(not_stored("create", &root));
        }
        info!(
            username = %root.username,
            user_id = %root.id,
            "created root account"
        );
        Ok(Some(root))
    }

    /// Resolve a bearer token to a usable account.
    ///
    /// The token must verify, must still be the account's current token and
    /// the account must be active and unlocked. A stale `last_seen` is
    /// advanced on the stored record without rewriting any other field.
    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<Option<User>> {
        let user_id = match self.authenticator.verify_access_token(token) {
            Ok(user_id) => user_id,
            Err(err) => {
                debug!("rejected bearer token: {err}");
                return Ok(None);
            }
        };

        let Some(mut user) = self.directory.find_by_id(user_id).await? else {
            return Ok(None);
        };
        if user.token != token {
            debug!(user_id = %user.id, "bearer token has been superseded");
            return Ok(None);
        }
        if !user.is_usable() {
            warn!(
                username = %user.username,
                "inactive or locked account presented a token"
            );
            return Ok(None);
        }

        let now = Utc::now();
        let resolution = Duration::seconds(LAST_SEEN_RESOLUTION_SECS);
        let stale = user.last_seen.is_none_or(|seen| now - seen >= resolution);
        if stale {
            self.directory.touch_last_seen(user.id, now).await?;
            user.touch_last_seen(now);
        }

        Ok(Some(user))
    }
}

fn browser_payload(user: &User, hide_root_token: bool) -> serde_json::Value {
    serde_json::to_value(user.to_browser_view(hide_root_token, false))
        .unwrap_or(serde_json::Value::Null)
}
