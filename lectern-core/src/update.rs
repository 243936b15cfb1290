//! Field-level rules for partial account updates.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use lectern_model::{LibraryId, PermissionsPatch, SeriesId, User, UserRole};
use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, UserError};
use crate::ports::UserDirectory;

/// Partial update payload as sent by admin clients.
///
/// Absent keys leave the stored value untouched. `password` must be turned
/// into `credential_hash` by the caller before the payload reaches
/// [`UpdatePolicy::apply`].
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub series_hide_from_continue_listening: Option<Vec<SeriesId>>,
    pub permissions: Option<PermissionsPatch>,
    pub libraries_accessible: Option<Vec<LibraryId>>,
    pub item_tags_selected: Option<Vec<String>>,
    pub password: Option<String>,
    /// Filled server-side from `password`; never read from the wire
    #[serde(skip)]
    pub credential_hash: Option<String>,
}

impl std::fmt::Debug for UserUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserUpdate")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("permissions", &self.permissions)
            .field("libraries_accessible", &self.libraries_accessible)
            .field("item_tags_selected", &self.item_tags_selected)
            .field("has_password", &self.password.is_some())
            .field("has_credential_hash", &self.credential_hash.is_some())
            .finish_non_exhaustive()
    }
}

/// What [`UpdatePolicy::apply`] did to the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// At least one field changed value; the caller should persist.
    pub changed: bool,
    /// The username changed; the caller must mint a new access token.
    pub regenerate_token: bool,
}

#[derive(Clone)]
pub struct UpdatePolicy {
    directory: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for UpdatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePolicy").finish_non_exhaustive()
    }
}

impl UpdatePolicy {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Apply `update` to `user` on behalf of `actor`.
    ///
    /// All changes are staged on a copy; `user` is only overwritten when
    /// every rule passed and something actually changed.
    pub async fn apply(
        &self,
        user: &mut User,
        update: UserUpdate,
        actor: &User,
    ) -> Result<UpdateOutcome> {
        if user.is_root() && !actor.is_root() {
            warn!(
                actor = %actor.username,
                target = %user.id,
                "non-root account attempted to update root"
            );
            return Err(UserError::Forbidden);
        }

        if update.password.is_some() {
            return Err(UserError::invalid(
                "plaintext password must be hashed before it is applied",
            ));
        }

        let mut staged = user.clone();
        let mut changed = false;
        let mut regenerate_token = false;

        if let Some(username) = update.username.filter(|name| !name.is_empty())
            && username != staged.username
        {
            if let Some(existing) =
                self.directory.find_by_username(&username).await?
                && existing.id != staged.id
            {
                return Err(UserError::Conflict(format!(
                    "username {username} is already taken"
                )));
            }
            staged.username = username;
            changed = true;
            regenerate_token = true;
        }

        if let Some(hash) =
            update.credential_hash.filter(|hash| !hash.is_empty())
            && staged.credential_hash.as_deref() != Some(hash.as_str())
        {
            staged.credential_hash = Some(hash);
            changed = true;
        }

        if let Some(role) = update.role
            && role != staged.role
        {
            if staged.is_root() {
                return Err(UserError::invalid(
                    "the root account cannot change role",
                ));
            }
            if role == UserRole::Root {
                return Err(UserError::invalid(
                    "accounts cannot be promoted to root",
                ));
            }
            staged.role = role;
            changed = true;
        }

        if let Some(email) = update.email.filter(|email| !email.is_empty())
            && staged.email.as_deref() != Some(email.as_str())
        {
            staged.email = Some(email);
            changed = true;
        }

        if let Some(is_active) = update.is_active
            && is_active != staged.is_active
        {
            if staged.is_root() && !is_active {
                return Err(UserError::invalid(
                    "the root account cannot be deactivated",
                ));
            }
            staged.is_active = is_active;
            changed = true;
        }

        if let Some(series) = update.series_hide_from_continue_listening
            && !same_members(
                &series,
                &staged.series_hide_from_continue_listening,
            )
        {
            staged.series_hide_from_continue_listening = series;
            changed = true;
        }

        if let Some(patch) = update.permissions {
            if staged.is_root() && patch.upload == Some(false) {
                return Err(UserError::invalid(
                    "the root account always keeps upload",
                ));
            }
            changed |= patch.apply_to(&mut staged.permissions);
        }

        changed |= scope_libraries(&mut staged, update.libraries_accessible);
        changed |= scope_tags(&mut staged, update.item_tags_selected);

        if changed {
            *user = staged;
        }

        Ok(UpdateOutcome {
            changed,
            regenerate_token: changed && regenerate_token,
        })
    }
}

/// Order-insensitive membership comparison.
fn same_members<T: Eq + Hash>(left: &[T], right: &[T]) -> bool {
    left.iter().collect::<HashSet<_>>() == right.iter().collect::<HashSet<_>>()
}

fn scope_libraries(user: &mut User, requested: Option<Vec<LibraryId>>) -> bool {
    if user.permissions.access_all_libraries {
        if user.libraries_accessible.is_empty() {
            return false;
        }
        user.libraries_accessible.clear();
        return true;
    }

    match requested {
        None => false,
        Some(libraries) if libraries.is_empty() => {
            if user.libraries_accessible.is_empty() {
                return false;
            }
            user.libraries_accessible.clear();
            true
        }
        Some(libraries) => {
            if same_members(&libraries, &user.libraries_accessible) {
                return false;
            }
            user.libraries_accessible = libraries;
            true
        }
    }
}

fn scope_tags(user: &mut User, requested: Option<Vec<String>>) -> bool {
    if user.permissions.access_all_tags {
        if user.item_tags_selected.is_empty() {
            return false;
        }
        user.item_tags_selected.clear();
        user.permissions.selected_tags_not_accessible = false;
        return true;
    }

    match requested {
        None => false,
        Some(tags) if tags.is_empty() => {
            if user.item_tags_selected.is_empty() {
                return false;
            }
            user.item_tags_selected.clear();
            user.permissions.selected_tags_not_accessible = false;
            true
        }
        Some(tags) => {
            if same_members(&tags, &user.item_tags_selected) {
                return false;
            }
            user.item_tags_selected = tags;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::infrastructure::JsonUserDirectory;

    struct Fixture {
        directory: Arc<JsonUserDirectory>,
        policy: UpdatePolicy,
        admin: User,
        root: User,
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(JsonUserDirectory::in_memory());
        let root = User::new("root", UserRole::Root, Utc::now());
        let admin = User::new("admin", UserRole::Admin, Utc::now());
        directory.create(&root).await.unwrap();
        directory.create(&admin).await.unwrap();

        Fixture {
            policy: UpdatePolicy::new(directory.clone()),
            directory,
            admin,
            root,
        }
    }

    fn payload(value: serde_json::Value) -> UserUpdate {
        serde_json::from_value(value).expect("valid update payload")
    }

    #[tokio::test]
    async fn empty_payload_changes_nothing() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        let before = user.clone();

        let outcome = fx
            .policy
            .apply(&mut user, UserUpdate::default(), &fx.admin)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::default());
        assert_eq!(user, before);
    }

    #[tokio::test]
    async fn repeating_current_values_is_not_a_change() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        user.email = Some("a@example.com".into());
        let before = user.clone();

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({
                    "username": "alice",
                    "email": "a@example.com",
                    "type": "user",
                    "isActive": true,
                    "permissions": { "download": true },
                })),
                &fx.admin,
            )
            .await
            .unwrap();

        assert!(!outcome.changed);
        assert_eq!(user, before);
    }

    #[tokio::test]
    async fn falsy_identity_fields_are_ignored_but_is_active_false_applies() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        user.email = Some("a@example.com".into());

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({
                    "username": "",
                    "email": "",
                    "isActive": false
                })),
                &fx.admin,
            )
            .await
            .unwrap();

        assert!(outcome.changed);
        assert!(!outcome.regenerate_token);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        assert!(!user.is_active);
        assert!(!user.can_download());
    }

    #[tokio::test]
    async fn access_all_libraries_clears_the_library_list() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        user.permissions.access_all_libraries = false;
        user.libraries_accessible = vec![LibraryId::new(), LibraryId::new()];

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({
                    "permissions": { "accessAllLibraries": true },
                    "librariesAccessible": [LibraryId::new()],
                })),
                &fx.admin,
            )
            .await
            .unwrap();

        assert!(outcome.changed);
        assert!(user.libraries_accessible.is_empty());
    }

    #[tokio::test]
    async fn access_all_tags_clears_selected_tags() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        user.permissions.access_all_tags = false;
        user.permissions.selected_tags_not_accessible = true;
        user.item_tags_selected = vec!["kids".into(), "explicit".into()];

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "permissions": { "accessAllTags": true } })),
                &fx.admin,
            )
            .await
            .unwrap();

        assert!(outcome.changed);
        assert!(user.permissions.access_all_tags);
        assert!(user.item_tags_selected.is_empty());
        assert!(!user.permissions.selected_tags_not_accessible);
    }

    #[tokio::test]
    async fn username_conflict_leaves_record_untouched() {
        let fx = fixture().await;
        let bob = User::new("bob", UserRole::User, Utc::now());
        fx.directory.create(&bob).await.unwrap();

        let mut user = User::new("alice", UserRole::User, Utc::now());
        let before = user.clone();

        let err = fx
            .policy
            .apply(
                &mut user,
                payload(json!({
                    "username": "bob",
                    "email": "new@example.com"
                })),
                &fx.admin,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::Conflict(_)));
        assert_eq!(user, before);
    }

    #[tokio::test]
    async fn username_change_requests_a_new_token() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "username": "alicia" })),
                &fx.admin,
            )
            .await
            .unwrap();

        assert!(outcome.changed && outcome.regenerate_token);
        assert_eq!(user.username, "alicia");
    }

    #[tokio::test]
    async fn selecting_tags_after_all_tags_access() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        assert!(user.permissions.access_all_tags);

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({
                    "permissions": {
                        "accessAllTags": false,
                        "selectedTagsNotAccessible": true
                    },
                    "itemTagsSelected": ["t1", "t2"],
                })),
                &fx.admin,
            )
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(
            user.item_tags_selected,
            vec!["t1".to_string(), "t2".to_string()]
        );
        assert!(user.permissions.selected_tags_not_accessible);
    }

    #[tokio::test]
    async fn omitted_lists_are_untouched_and_empty_lists_clear() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        user.permissions.access_all_tags = false;
        user.permissions.selected_tags_not_accessible = true;
        user.item_tags_selected = vec!["kids".into()];

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "email": "a@example.com" })),
                &fx.admin,
            )
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(user.item_tags_selected, vec!["kids".to_string()]);

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "itemTagsSelected": [] })),
                &fx.admin,
            )
            .await
            .unwrap();
        assert!(outcome.changed);
        assert!(user.item_tags_selected.is_empty());
        assert!(!user.permissions.selected_tags_not_accessible);
    }

    #[tokio::test]
    async fn list_order_alone_is_not_a_change() {
        let fx = fixture().await;
        let (a, b) = (SeriesId::new(), SeriesId::new());
        let mut user = User::new("alice", UserRole::User, Utc::now());
        user.series_hide_from_continue_listening = vec![a, b];

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "seriesHideFromContinueListening": [b, a] })),
                &fx.admin,
            )
            .await
            .unwrap();
        assert!(!outcome.changed);

        let outcome = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "seriesHideFromContinueListening": [a] })),
                &fx.admin,
            )
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(user.series_hide_from_continue_listening, vec![a]);
    }

    #[tokio::test]
    async fn plaintext_password_is_rejected() {
        let fx = fixture().await;
        let mut user = User::new("alice", UserRole::User, Utc::now());
        let err = fx
            .policy
            .apply(
                &mut user,
                payload(json!({ "password": "hunter2" })),
                &fx.admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Invalid(_)));
    }

    #[tokio::test]
    async fn only_root_may_update_root() {
        let fx = fixture().await;
        let mut root = fx.root.clone();

        let err = fx
            .policy
            .apply(
                &mut root,
                payload(json!({ "email": "r@example.com" })),
                &fx.admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Forbidden));

        let actor = fx.root.clone();
        let outcome = fx
            .policy
            .apply(
                &mut root,
                payload(json!({ "email": "r@example.com" })),
                &actor,
            )
            .await
            .unwrap();
        assert!(outcome.changed);
    }

    #[tokio::test]
    async fn root_protections_reject_the_whole_update() {
        let fx = fixture().await;
        let actor = fx.root.clone();

        for body in [
            json!({ "isActive": false }),
            json!({ "type": "admin" }),
            json!({
                "email": "r@example.com",
                "permissions": { "upload": false }
            }),
        ] {
            let mut root = fx.root.clone();
            let err = fx
                .policy
                .apply(&mut root, payload(body), &actor)
                .await
                .unwrap_err();
            assert!(matches!(err, UserError::Invalid(_)));
            assert_eq!(root, fx.root);
        }

        let mut admin = fx.admin.clone();
        let err = fx
            .policy
            .apply(&mut admin, payload(json!({ "type": "root" })), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Invalid(_)));
    }
}
