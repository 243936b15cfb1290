use lectern_model::{User, UserId};

use crate::auth::AuthCryptoError;

/// Credential and token primitives. The core calls these, never
/// reimplements them.
pub trait Authenticator: Send + Sync {
    /// Derive the stored credential hash from a plaintext secret.
    fn hash_secret(&self, plaintext: &str) -> Result<String, AuthCryptoError>;

    /// Check a plaintext secret against a stored hash.
    fn verify_secret(
        &self,
        plaintext: &str,
        hash: &str,
    ) -> Result<bool, AuthCryptoError>;

    /// Mint a bearer token that embeds the user's identity.
    fn issue_access_token(
        &self,
        user: &User,
    ) -> Result<String, AuthCryptoError>;

    /// Validate a bearer token and return the user it was issued to.
    fn verify_access_token(
        &self,
        token: &str,
    ) -> Result<UserId, AuthCryptoError>;
}
