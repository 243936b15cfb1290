use serde::{Deserialize, Serialize};

/// Account tier driving default permissions and special exemptions.
///
/// Roles form a closed set. Capability checks live on
/// [`User`](crate::user::User) as pure functions of role, grants and account
/// state, so the root exemptions stay in one place.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// The single owner account
    /// - Cannot be deleted, locked or deactivated
    /// - Only root may modify root
    Root,

    /// Administrator
    /// - Can list, create, update and delete non-root accounts
    Admin,

    /// Regular listener
    #[default]
    User,

    /// Restricted listener, typically download-only
    Guest,
}

impl UserRole {
    pub fn is_admin_or_up(&self) -> bool {
        matches!(self, UserRole::Root | UserRole::Admin)
    }

    pub fn all() -> &'static [UserRole] {
        &[
            UserRole::Root,
            UserRole::Admin,
            UserRole::User,
            UserRole::Guest,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Root => "root",
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root" => Ok(UserRole::Root),
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            "guest" => Ok(UserRole::Guest),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_or_up() {
        assert!(UserRole::Root.is_admin_or_up());
        assert!(UserRole::Admin.is_admin_or_up());
        assert!(!UserRole::User.is_admin_or_up());
        assert!(!UserRole::Guest.is_admin_or_up());
    }

    #[test]
    fn string_conversion() {
        for role in UserRole::all() {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("moderator".parse::<UserRole>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Guest).unwrap(),
            "\"guest\""
        );
    }
}
