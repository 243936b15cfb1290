//! Fine-grained grants attached to every account.
//!
//! [`PermissionSet`] is a `Copy` value: reading it from a user hands out an
//! independent copy, so role defaults can never leak between accounts.

use serde::{Deserialize, Serialize};

use crate::role::UserRole;

/// Boolean grants plus the tag-scoping flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub download: bool,
    pub update: bool,
    pub delete: bool,
    pub upload: bool,
    pub access_all_libraries: bool,
    pub access_all_tags: bool,
    pub access_explicit_content: bool,
    /// When tag scoping is active, invert the selection: the selected tags
    /// are the ones hidden rather than the ones shown.
    #[serde(default)]
    pub selected_tags_not_accessible: bool,
}

impl PermissionSet {
    /// Baseline grants for a freshly created account of `role`.
    pub fn defaults_for(role: UserRole) -> Self {
        Self {
            download: true,
            update: role.is_admin_or_up(),
            delete: role == UserRole::Root,
            upload: role.is_admin_or_up(),
            access_all_libraries: true,
            access_all_tags: true,
            access_explicit_content: true,
            selected_tags_not_accessible: false,
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::defaults_for(UserRole::default())
    }
}

/// Partial grant update. Absent keys leave the current grant untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_all_libraries: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_all_tags: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_explicit_content: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tags_not_accessible: Option<bool>,
}

impl PermissionsPatch {
    /// Overwrite every supplied grant that differs from `target`.
    ///
    /// Returns `true` when at least one grant changed value.
    pub fn apply_to(&self, target: &mut PermissionSet) -> bool {
        let mut changed = false;
        let mut set = |slot: &mut bool, value: Option<bool>| {
            if let Some(value) = value
                && *slot != value
            {
                *slot = value;
                changed = true;
            }
        };

        set(&mut target.download, self.download);
        set(&mut target.update, self.update);
        set(&mut target.delete, self.delete);
        set(&mut target.upload, self.upload);
        set(&mut target.access_all_libraries, self.access_all_libraries);
        set(&mut target.access_all_tags, self.access_all_tags);
        set(
            &mut target.access_explicit_content,
            self.access_explicit_content,
        );
        set(
            &mut target.selected_tags_not_accessible,
            self.selected_tags_not_accessible,
        );

        changed
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
