use axum::http::HeaderValue;
use thiserror::Error;

use super::models::{AuthConfig, Config, CorsConfig};

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("authentication secret {field} must not be empty")]
    EmptySecret { field: &'static str },
    #[error("root username must not be empty")]
    EmptyRootUsername,
    #[error("invalid CORS origin '{origin}'")]
    InvalidCorsOrigin { origin: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    check_secrets(&config.auth, &mut warnings)?;
    check_cors(&config.cors, &mut warnings)?;

    if config.bootstrap.root_username.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyRootUsername);
    }
    if config.bootstrap.root_password.is_none() {
        warnings.push_with_hint(
            "No root password configured; a new root can only use its token",
            "Set LECTERN_ROOT_PASSWORD or bootstrap.root_password",
        );
    }

    if config.storage.users_file.is_none() {
        warnings.push_with_hint(
            "No users file configured; accounts are lost on restart",
            "Set LECTERN_USERS_FILE or storage.users_file",
        );
    }

    Ok(warnings)
}

fn check_secrets(
    auth: &AuthConfig,
    warnings: &mut ConfigWarnings,
) -> Result<(), ConfigGuardRailError> {
    const MIN_SECRET_LENGTH: usize = 32;

    if auth.password_pepper.is_empty() {
        return Err(ConfigGuardRailError::EmptySecret {
            field: "LECTERN_PASSWORD_PEPPER",
        });
    }
    if auth.token_key.is_empty() {
        return Err(ConfigGuardRailError::EmptySecret {
            field: "LECTERN_TOKEN_KEY",
        });
    }

    if auth.is_default_pepper() {
        warnings.push_with_hint(
            "LECTERN_PASSWORD_PEPPER uses the default placeholder value",
            "Use a random value; changing it invalidates stored passwords",
        );
    } else if auth.password_pepper.len() < MIN_SECRET_LENGTH {
        warnings.push(format!(
            "LECTERN_PASSWORD_PEPPER is under {MIN_SECRET_LENGTH} characters"
        ));
    }

    if auth.is_default_token_key() {
        warnings.push_with_hint(
            "LECTERN_TOKEN_KEY uses the default placeholder value",
            "Use a random value; changing it revokes every issued token",
        );
    } else if auth.token_key.len() < MIN_SECRET_LENGTH {
        warnings.push(format!(
            "LECTERN_TOKEN_KEY is under {MIN_SECRET_LENGTH} characters"
        ));
    }

    Ok(())
}

fn check_cors(
    cors: &CorsConfig,
    warnings: &mut ConfigWarnings,
) -> Result<(), ConfigGuardRailError> {
    if cors.is_wildcard_included() {
        warnings.push(
            "CORS wildcard origin configured; any site may call the API",
        );
        return Ok(());
    }

    for origin in &cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            return Err(ConfigGuardRailError::InvalidCorsOrigin {
                origin: origin.clone(),
            });
        }
    }
    Ok(())
}
