use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use lectern_model::{User, UserId};
use password_hash::Error as PasswordHashError;
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::ports::Authenticator;

type HmacSha256 = Hmac<Sha256>;

/// Centralized cryptographic helper for account credentials.
///
/// - Argon2id for password hashing with a server-side pepper.
/// - HMAC-SHA-256 signed bearer tokens that carry the account identity.
#[derive(Debug)]
pub struct AuthCrypto {
    argon2: Argon2<'static>,
    password_pepper: Zeroizing<Vec<u8>>,
    token_hmac_key: Zeroizing<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum AuthCryptoError {
    #[error("password pepper must not be empty")]
    EmptyPasswordPepper,
    #[error("token HMAC key must not be empty")]
    EmptyTokenKey,
    #[error("invalid Argon2 parameters: {0}")]
    InvalidArgon2Params(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("malformed access token")]
    MalformedToken,
    #[error("access token signature mismatch")]
    BadSignature,
}

impl From<PasswordHashError> for AuthCryptoError {
    fn from(err: PasswordHashError) -> Self {
        AuthCryptoError::PasswordHash(err.to_string())
    }
}

/// Identity embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: UserId,
    pub username: String,
    /// Issue time, unix milliseconds
    pub iat: i64,
    pub nonce: String,
}

impl AuthCrypto {
    /// Recommended defaults target ~64 MiB memory and 3 iterations which is a
    /// solid baseline for servers without dedicated tuning.
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024; // 64 MiB
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;
    const NONCE_LENGTH: usize = 16;

    /// Build a helper with default Argon2id parameters.
    pub fn new(
        password_pepper: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
    ) -> Result<Self, AuthCryptoError> {
        Self::with_params(
            password_pepper,
            token_hmac_key,
            ParamsBuilder::new()
                .m_cost(Self::DEFAULT_MEMORY_KIB)
                .t_cost(Self::DEFAULT_ITERATIONS)
                .p_cost(Self::DEFAULT_PARALLELISM)
                .output_len(32)
                .build()
                .map_err(|err| {
                    AuthCryptoError::InvalidArgon2Params(err.to_string())
                })?,
        )
    }

    /// Build a helper with caller-specified Argon2 parameters (useful for
    /// integration tests or constrained environments).
    pub fn with_params(
        password_pepper: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
        params: Params,
    ) -> Result<Self, AuthCryptoError> {
        let pepper = password_pepper.as_ref();
        if pepper.is_empty() {
            return Err(AuthCryptoError::EmptyPasswordPepper);
        }

        let key = token_hmac_key.as_ref();
        if key.is_empty() {
            return Err(AuthCryptoError::EmptyTokenKey);
        }

        let argon2 =
            Argon2::new(Algorithm::Argon2id, Version::default(), params);

        Ok(Self {
            argon2,
            password_pepper: Zeroizing::new(pepper.to_vec()),
            token_hmac_key: Zeroizing::new(key.to_vec()),
        })
    }

    /// Cheap Argon2 parameters for tests.
    pub fn insecure_fast(
        password_pepper: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
    ) -> Result<Self, AuthCryptoError> {
        let params = Params::new(8, 1, 1, Some(32)).map_err(|err| {
            AuthCryptoError::InvalidArgon2Params(err.to_string())
        })?;
        Self::with_params(password_pepper, token_hmac_key, params)
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(
            password.len() + self.password_pepper.len(),
        ));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.password_pepper);
        material
    }

    fn fill_random(bytes: &mut [u8]) -> Result<(), AuthCryptoError> {
        OsRng
            .try_fill_bytes(bytes)
            .map_err(|err| AuthCryptoError::PasswordHash(err.to_string()))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.token_hmac_key)
            .expect("HMAC-SHA-256 accepts keys of any size")
    }

    /// Hash a password using Argon2id with a random salt and shared pepper.
    /// The resulting PHC string is suitable for storage.
    pub fn hash_password(
        &self,
        password: &str,
    ) -> Result<String, AuthCryptoError> {
        let material = self.peppered(password);
        // Use the workspace's rand crate so minimal builds avoid depending on
        // password_hash's optional rand_core shim.
        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        Self::fill_random(&mut salt_bytes)?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(AuthCryptoError::from)?;
        let hash = self.argon2.hash_password(&material, &salt)?.to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash, applying the shared pepper.
    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthCryptoError> {
        let parsed = PasswordHash::new(password_hash)?;
        let material = self.peppered(password);
        Ok(self.argon2.verify_password(&material, &parsed).is_ok())
    }

    /// Sign a token of the form `<base64url(claims)>.<hex(hmac)>`.
    pub fn sign_token(
        &self,
        claims: &TokenClaims,
    ) -> Result<String, AuthCryptoError> {
        let body = serde_json::to_vec(claims)
            .map_err(|_| AuthCryptoError::MalformedToken)?;
        let encoded = URL_SAFE_NO_PAD.encode(body);

        let mut mac = self.mac();
        mac.update(encoded.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{encoded}.{signature}"))
    }

    /// Check the signature and decode the embedded claims.
    pub fn decode_token(
        &self,
        token: &str,
    ) -> Result<TokenClaims, AuthCryptoError> {
        let (encoded, signature) = token
            .split_once('.')
            .ok_or(AuthCryptoError::MalformedToken)?;
        let signature = hex::decode(signature)
            .map_err(|_| AuthCryptoError::MalformedToken)?;

        let mut mac = self.mac();
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthCryptoError::BadSignature)?;

        let body = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| AuthCryptoError::MalformedToken)?;
        serde_json::from_slice(&body)
            .map_err(|_| AuthCryptoError::MalformedToken)
    }
}

impl Authenticator for AuthCrypto {
    fn hash_secret(&self, plaintext: &str) -> Result<String, AuthCryptoError> {
        self.hash_password(plaintext)
    }

    fn verify_secret(
        &self,
        plaintext: &str,
        hash: &str,
    ) -> Result<bool, AuthCryptoError> {
        self.verify_password(plaintext, hash)
    }

    fn issue_access_token(
        &self,
        user: &User,
    ) -> Result<String, AuthCryptoError> {
        let mut nonce = [0u8; Self::NONCE_LENGTH];
        Self::fill_random(&mut nonce)?;
        self.sign_token(&TokenClaims {
            sub: user.id,
            username: user.username.clone(),
            iat: Utc::now().timestamp_millis(),
            nonce: hex::encode(nonce),
        })
    }

    fn verify_access_token(
        &self,
        token: &str,
    ) -> Result<UserId, AuthCryptoError> {
        self.decode_token(token).map(|claims| claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use lectern_model::UserRole;

    use super::*;

    fn crypto() -> AuthCrypto {
        AuthCrypto::insecure_fast("pepper", "token-key").unwrap()
    }

    #[test]
    fn hashes_passwords_and_verifies() {
        let crypto = crypto();
        let hash = crypto.hash_password("correct horse").unwrap();
        assert!(crypto.verify_password("correct horse", &hash).unwrap());
        assert!(!crypto.verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn pepper_is_part_of_the_hash() {
        let hash = crypto().hash_password("secret").unwrap();
        let other =
            AuthCrypto::insecure_fast("other-pepper", "token-key").unwrap();
        assert!(!other.verify_password("secret", &hash).unwrap());
    }

    #[test]
    fn tokens_embed_identity_and_verify() {
        let crypto = crypto();
        let user = User::new("alice", UserRole::User, Utc::now());
        let token = crypto.issue_access_token(&user).unwrap();

        assert_eq!(crypto.verify_access_token(&token).unwrap(), user.id);
        assert_eq!(crypto.decode_token(&token).unwrap().username, "alice");
    }

    #[test]
    fn reissued_tokens_differ() {
        let crypto = crypto();
        let user = User::new("alice", UserRole::User, Utc::now());
        let first = crypto.issue_access_token(&user).unwrap();
        let second = crypto.issue_access_token(&user).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let crypto = crypto();
        let user = User::new("alice", UserRole::User, Utc::now());
        let token = crypto.issue_access_token(&user).unwrap();

        let foreign = AuthCrypto::insecure_fast("pepper", "other-key").unwrap();
        assert!(matches!(
            foreign.verify_access_token(&token),
            Err(AuthCryptoError::BadSignature)
        ));

        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = URL_SAFE_NO_PAD
            .encode(br#"{"sub":"00000000-0000-0000-0000-000000000000"}"#);
        let forged = format!("{forged_claims}.{signature}");
        assert!(matches!(
            crypto.verify_access_token(&forged),
            Err(AuthCryptoError::BadSignature)
        ));
        assert!(matches!(
            crypto.verify_access_token("no-dot-here"),
            Err(AuthCryptoError::MalformedToken)
        ));
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(matches!(
            AuthCrypto::new("", "token"),
            Err(AuthCryptoError::EmptyPasswordPepper)
        ));
        assert!(matches!(
            AuthCrypto::new("pepper", ""),
            Err(AuthCryptoError::EmptyTokenKey)
        ));
    }
}
