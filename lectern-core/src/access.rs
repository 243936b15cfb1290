//! Authorization gate for account operations.
//!
//! Rules are evaluated in order and the first failing rule governs:
//!
//! 1. Listing accounts and viewing online users need admin or root.
//! 2. Viewing a single account needs admin or root, or must be the caller's
//!    own account.
//! 3. Every mutating operation needs admin or root, even on the caller's own
//!    account.
//! 4. The root account can never be deleted.
//! 5. Nobody can delete their own account.
//! 6. Only root may update the root account.
//!
//! Rules 1-3 and 5 need only the caller and the target id. The target record
//! is resolved after them (missing means [`UserError::NotFound`]) and rules 4
//! and 6 are checked against it.

use std::sync::Arc;

use lectern_model::{User, UserId};
use tracing::warn;

use crate::error::{Result, UserError};
use crate::ports::UserDirectory;

/// Operations exposed to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserOperation {
    ListUsers,
    ViewOnlineUsers,
    View,
    Create,
    Update,
    Delete,
    UnlinkExternalIdentity,
}

impl UserOperation {
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            UserOperation::Create
                | UserOperation::Update
                | UserOperation::Delete
                | UserOperation::UnlinkExternalIdentity
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserOperation::ListUsers => "list_users",
            UserOperation::ViewOnlineUsers => "view_online_users",
            UserOperation::View => "view_user",
            UserOperation::Create => "create_user",
            UserOperation::Update => "update_user",
            UserOperation::Delete => "delete_user",
            UserOperation::UnlinkExternalIdentity => "unlink_external_identity",
        }
    }
}

#[derive(Clone)]
pub struct AccessController {
    directory: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for AccessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessController").finish_non_exhaustive()
    }
}

impl AccessController {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Gate an operation that does not address a single account.
    pub fn authorize(
        &self,
        actor: &User,
        operation: UserOperation,
    ) -> Result<()> {
        Self::check_caller(actor, operation, None)
    }

    /// Gate an operation on account `target_id` and return the resolved
    /// target record.
    pub async fn authorize_target(
        &self,
        actor: &User,
        operation: UserOperation,
        target_id: UserId,
    ) -> Result<User> {
        Self::check_caller(actor, operation, Some(target_id))?;

        let target = self
            .directory
            .find_by_id(target_id)
            .await?
            .ok_or(UserError::NotFound)?;

        Self::check_target(actor, operation, &target)?;
        Ok(target)
    }

    /// Rules 1, 2, 3 and 5.
    pub fn check_caller(
        actor: &User,
        operation: UserOperation,
        target_id: Option<UserId>,
    ) -> Result<()> {
        let privileged = actor.is_admin_or_up();
        let is_self = target_id.is_some_and(|id| id == actor.id);

        let allowed = match operation {
            UserOperation::ListUsers | UserOperation::ViewOnlineUsers => {
                privileged
            }
            UserOperation::View => privileged || is_self,
            _ => privileged,
        };

        if !allowed {
            return Err(Self::deny(actor, operation, target_id));
        }

        if operation == UserOperation::Delete && is_self {
            return Err(Self::deny(actor, operation, target_id));
        }

        Ok(())
    }

    /// Rules 4 and 6, plus a repeat of rule 5 against the resolved record.
    pub fn check_target(
        actor: &User,
        operation: UserOperation,
        target: &User,
    ) -> Result<()> {
        let denied = match operation {
            UserOperation::Delete => target.is_root() || target.id == actor.id,
            UserOperation::Update | UserOperation::UnlinkExternalIdentity => {
                target.is_root() && !actor.is_root()
            }
            _ => false,
        };

        if denied {
            return Err(Self::deny(actor, operation, Some(target.id)));
        }
        Ok(())
    }

    fn deny(
        actor: &User,
        operation: UserOperation,
        target_id: Option<UserId>,
    ) -> UserError {
        warn!(
            actor = %actor.username,
            actor_role = %actor.role,
            operation = operation.as_str(),
            target = ?target_id,
            "denied account operation"
        );
        UserError::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lectern_model::UserRole;

    use super::*;

    fn user(role: UserRole) -> User {
        User::new(format!("{role}-account"), role, Utc::now())
    }

    fn forbidden(result: Result<()>) -> bool {
        matches!(result, Err(UserError::Forbidden))
    }

    fn caller(
        actor: &User,
        operation: UserOperation,
        target_id: Option<UserId>,
    ) -> Result<()> {
        AccessController::check_caller(actor, operation, target_id)
    }

    fn on_record(
        actor: &User,
        operation: UserOperation,
        target: &User,
    ) -> Result<()> {
        AccessController::check_target(actor, operation, target)
    }

    #[test]
    fn listing_requires_admin_or_root() {
        for op in [UserOperation::ListUsers, UserOperation::ViewOnlineUsers] {
            assert!(caller(&user(UserRole::Root), op, None).is_ok());
            assert!(caller(&user(UserRole::Admin), op, None).is_ok());
            assert!(forbidden(caller(&user(UserRole::User), op, None)));
            assert!(forbidden(caller(&user(UserRole::Guest), op, None)));
        }
    }

    #[test]
    fn viewing_self_is_allowed_for_everyone() {
        let guest = user(UserRole::Guest);
        let other = user(UserRole::User);
        let admin = user(UserRole::Admin);

        assert!(caller(&guest, UserOperation::View, Some(guest.id)).is_ok());
        assert!(forbidden(caller(&guest, UserOperation::View, Some(other.id))));
        assert!(caller(&admin, UserOperation::View, Some(other.id)).is_ok());
    }

    #[test]
    fn non_admins_cannot_mutate_even_themselves() {
        for role in [UserRole::User, UserRole::Guest] {
            let actor = user(role);
            for op in [
                UserOperation::Update,
                UserOperation::Delete,
                UserOperation::UnlinkExternalIdentity,
            ] {
                assert!(forbidden(caller(&actor, op, Some(actor.id))));
            }
            assert!(forbidden(caller(&actor, UserOperation::Create, None)));
        }
    }

    #[test]
    fn root_can_never_be_deleted() {
        let root = user(UserRole::Root);
        for role in UserRole::all() {
            let actor = user(*role);
            let result = caller(&actor, UserOperation::Delete, Some(root.id))
                .and_then(|_| on_record(&actor, UserOperation::Delete, &root));
            assert!(forbidden(result), "{role} deleted root");
        }
    }

    #[test]
    fn self_delete_is_always_forbidden() {
        for role in [UserRole::Root, UserRole::Admin] {
            let actor = user(role);
            assert!(forbidden(caller(
                &actor,
                UserOperation::Delete,
                Some(actor.id)
            )));
            assert!(forbidden(on_record(
                &actor,
                UserOperation::Delete,
                &actor
            )));
        }
    }

    #[test]
    fn only_root_updates_root() {
        let root = user(UserRole::Root);
        let admin = user(UserRole::Admin);
        let regular = user(UserRole::User);

        assert!(forbidden(on_record(&admin, UserOperation::Update, &root)));
        assert!(on_record(&root, UserOperation::Update, &root).is_ok());
        assert!(on_record(&admin, UserOperation::Update, &regular).is_ok());
    }

    #[test]
    fn admins_may_delete_other_accounts() {
        let admin = user(UserRole::Admin);
        let target = user(UserRole::User);
        let delete = UserOperation::Delete;
        assert!(caller(&admin, delete, Some(target.id)).is_ok());
        assert!(on_record(&admin, delete, &target).is_ok());
    }
}
