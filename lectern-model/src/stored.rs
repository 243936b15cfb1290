//! Durable account record and the normalize-on-load step.
//!
//! Records written by older releases are missing fields or use retired
//! names. [`User::from_stored`] is the only place those records are
//! reconciled; each rule below is named after the field it repairs so new
//! migrations are added as one more rule.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{LibraryId, SeriesId, UserId};
use crate::permissions::PermissionSet;
use crate::progress::{AudioBookmark, MediaProgress};
use crate::role::UserRole;
use crate::user::User;

/// Full view of an account as persisted by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: UserId,
    #[serde(
        default,
        rename = "oldUserId",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "pash")]
    pub credential_hash: Option<String>,
    #[serde(rename = "type")]
    pub role: UserRole,
    #[serde(default)]
    pub token: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub media_progress: Vec<MediaProgress>,
    #[serde(default)]
    pub series_hide_from_continue_listening: Vec<SeriesId>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub bookmarks: Vec<AudioBookmark>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_locked: Option<bool>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub permissions: Option<StoredPermissions>,
    #[serde(default)]
    pub libraries_accessible: Vec<LibraryId>,
    #[serde(default)]
    pub item_tags_selected: Vec<String>,
    /// Retired name of `item_tags_selected`
    #[serde(default, skip_serializing)]
    pub item_tags_accessible: Option<Vec<String>>,
    #[serde(default, alias = "authOpenIDSub")]
    pub external_identity_sub: Option<String>,
}

/// Grants as found on disk; any key may be missing in old records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredPermissions {
    pub download: Option<bool>,
    pub update: Option<bool>,
    pub delete: Option<bool>,
    pub upload: Option<bool>,
    /// Added after the first release; absent means `true`
    pub access_all_libraries: Option<bool>,
    /// Added after the first release; absent means `true`
    pub access_all_tags: Option<bool>,
    /// Added after the first release; absent means `true`
    pub access_explicit_content: Option<bool>,
    pub selected_tags_not_accessible: Option<bool>,
}

impl From<PermissionSet> for StoredPermissions {
    fn from(grants: PermissionSet) -> Self {
        Self {
            download: Some(grants.download),
            update: Some(grants.update),
            delete: Some(grants.delete),
            upload: Some(grants.upload),
            access_all_libraries: Some(grants.access_all_libraries),
            access_all_tags: Some(grants.access_all_tags),
            access_explicit_content: Some(grants.access_explicit_content),
            selected_tags_not_accessible: Some(
                grants.selected_tags_not_accessible,
            ),
        }
    }
}

impl StoredPermissions {
    /// Fill missing grants: scoping and explicit-content grants default to
    /// permissive, everything else to denied.
    fn normalize(self) -> PermissionSet {
        PermissionSet {
            download: self.download.unwrap_or(false),
            update: self.update.unwrap_or(false),
            delete: self.delete.unwrap_or(false),
            upload: self.upload.unwrap_or(false),
            access_all_libraries: self.access_all_libraries.unwrap_or(true),
            access_all_tags: self.access_all_tags.unwrap_or(true),
            access_explicit_content: self
                .access_explicit_content
                .unwrap_or(true),
            selected_tags_not_accessible: self
                .selected_tags_not_accessible
                .unwrap_or(false),
        }
    }
}

impl User {
    /// Rebuild an account from its stored record, repairing legacy shapes.
    ///
    /// `now` stands in for a missing creation timestamp.
    pub fn from_stored(record: StoredUser, now: DateTime<Utc>) -> Self {
        let role = record.role;
        let is_root = role == UserRole::Root;

        let mut permissions = match record.permissions {
            Some(stored) => stored.normalize(),
            None => PermissionSet::defaults_for(role),
        };
        if is_root {
            permissions.upload = true;
        }

        let mut item_tags_selected = record.item_tags_selected;
        if let Some(legacy_tags) = record.item_tags_accessible
            && !legacy_tags.is_empty()
        {
            item_tags_selected = legacy_tags;
            permissions.selected_tags_not_accessible = false;
        }

        Self {
            id: record.id,
            legacy_id: record.legacy_id,
            username: record.username,
            email: record.email.filter(|email| !email.is_empty()),
            credential_hash: record.credential_hash,
            role,
            token: record.token,
            media_progress: record.media_progress,
            series_hide_from_continue_listening: record
                .series_hide_from_continue_listening,
            bookmarks: record.bookmarks,
            is_active: is_root || record.is_active.unwrap_or(true),
            is_locked: !is_root && record.is_locked.unwrap_or(false),
            last_seen: record.last_seen,
            created_at: record.created_at.unwrap_or(now),
            permissions,
            libraries_accessible: record.libraries_accessible,
            item_tags_selected,
            external_identity_sub: record
                .external_identity_sub
                .filter(|sub| !sub.is_empty()),
        }
    }
}

/// Deserialize a list, silently dropping entries that do not parse.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn load(value: serde_json::Value) -> User {
        let record: StoredUser =
            serde_json::from_value(value).expect("valid record");
        User::from_stored(record, Utc::now())
    }

    fn base(role: &str) -> serde_json::Value {
        json!({
            "id": UserId::new(),
            "username": "legacy",
            "type": role,
            "token": "tok",
            "createdAt": 1_600_000_000_000_i64,
        })
    }

    #[test]
    fn missing_permissions_take_role_defaults() {
        let admin = load(base("admin"));
        assert_eq!(
            admin.permissions,
            PermissionSet::defaults_for(UserRole::Admin)
        );
    }

    #[test]
    fn missing_scoping_grants_default_to_permissive() {
        let mut record = base("user");
        record["permissions"] = json!({ "download": true, "update": false });
        let user = load(record);

        assert!(user.permissions.access_all_libraries);
        assert!(user.permissions.access_all_tags);
        assert!(user.permissions.access_explicit_content);
        assert!(!user.permissions.upload);
    }

    #[test]
    fn explicit_false_grants_survive_normalization() {
        let mut record = base("user");
        record["permissions"] = json!({
            "download": true,
            "accessAllLibraries": false,
            "accessExplicitContent": false,
        });
        let user = load(record);
        assert!(!user.permissions.access_all_libraries);
        assert!(!user.permissions.access_explicit_content);
    }

    #[test]
    fn legacy_tag_field_is_adopted() {
        let mut record = base("user");
        record["itemTagsAccessible"] = json!(["x"]);
        record["permissions"] = json!({
            "accessAllTags": false,
            "selectedTagsNotAccessible": true,
        });
        let user = load(record);

        assert_eq!(user.item_tags_selected, vec!["x".to_string()]);
        assert!(!user.permissions.selected_tags_not_accessible);
    }

    #[test]
    fn empty_legacy_tag_field_is_ignored() {
        let mut record = base("user");
        record["itemTagsAccessible"] = json!([]);
        record["itemTagsSelected"] = json!(["kept"]);
        let user = load(record);
        assert_eq!(user.item_tags_selected, vec!["kept".to_string()]);
    }

    #[test]
    fn root_is_always_active_unlocked_and_can_upload() {
        let mut record = base("root");
        record["isActive"] = json!(false);
        record["isLocked"] = json!(true);
        record["permissions"] = json!({ "upload": false });
        let root = load(record);

        assert!(root.is_active);
        assert!(!root.is_locked);
        assert!(root.permissions.upload);
    }

    #[test]
    fn account_flags_default_sensibly() {
        let user = load(base("guest"));
        assert!(user.is_active);
        assert!(!user.is_locked);

        let mut record = base("guest");
        record["isActive"] = json!(false);
        record["isLocked"] = json!(true);
        let user = load(record);
        assert!(!user.is_active);
        assert!(user.is_locked);
    }

    #[test]
    fn legacy_credential_and_identity_keys_are_accepted() {
        let mut record = base("user");
        record["pash"] = json!("$argon2id$legacy");
        record["authOpenIDSub"] = json!("sub-1");
        let user = load(record);
        assert_eq!(user.credential_hash.as_deref(), Some("$argon2id$legacy"));
        assert_eq!(user.external_identity_sub.as_deref(), Some("sub-1"));
    }

    #[test]
    fn malformed_progress_and_bookmarks_are_dropped() {
        let mut record = base("user");
        record["mediaProgress"] = json!([{ "progress": 0.2 }]);
        record["bookmarks"] = json!([
            {
                "libraryItemId": 42,
                "title": "bad",
                "time": 1.0,
                "createdAt": 0
            },
        ]);
        let user = load(record);
        assert!(user.media_progress.is_empty());
        assert!(user.bookmarks.is_empty());
    }

    #[test]
    fn missing_created_at_uses_load_time() {
        let mut record = base("user");
        record.as_object_mut().unwrap().remove("createdAt");
        let now = Utc::now();
        let stored: StoredUser = serde_json::from_value(record).unwrap();
        let user = User::from_stored(stored, now);
        assert_eq!(user.created_at, now);
    }

    #[test]
    fn full_view_reloads_to_the_same_user() {
        let mut user = User::new("alice", UserRole::Guest, Utc::now());
        user.credential_hash = Some("hash".into());
        user.permissions.access_all_tags = false;
        user.item_tags_selected = vec!["t1".into()];
        user.is_locked = true;

        let json = serde_json::to_string(&user.to_full_view()).unwrap();
        assert!(!json.contains("itemTagsAccessible"));
        let stored: StoredUser = serde_json::from_str(&json).unwrap();
        let reloaded = User::from_stored(stored, Utc::now());

        assert_eq!(reloaded.permissions, user.permissions);
        assert_eq!(reloaded.item_tags_selected, user.item_tags_selected);
        assert_eq!(reloaded.credential_hash, user.credential_hash);
        assert!(reloaded.is_locked);
        assert_eq!(
            reloaded.created_at.timestamp_millis(),
            user.created_at.timestamp_millis()
        );
    }
}
