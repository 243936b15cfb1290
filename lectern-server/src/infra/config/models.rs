use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

pub const DEFAULT_PASSWORD_PEPPER: &str = "change-me-password-pepper";
pub const DEFAULT_TOKEN_KEY: &str = "change-me-token-key";
pub const DEFAULT_ROOT_USERNAME: &str = "root";

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub cors: CorsConfig,
    #[serde(skip)]
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Address the listener binds to. Falls back to all interfaces when the
    /// host does not parse as an IP literal.
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED.into());
        SocketAddr::new(ip, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageConfig {
    /// JSON file backing the user directory. `None` keeps accounts in memory.
    pub users_file: Option<PathBuf>,
}

#[derive(Clone, Serialize)]
pub struct AuthConfig {
    #[serde(skip)]
    pub password_pepper: String,
    #[serde(skip)]
    pub token_key: String,
}

impl AuthConfig {
    pub fn is_default_pepper(&self) -> bool {
        self.password_pepper == DEFAULT_PASSWORD_PEPPER
    }

    pub fn is_default_token_key(&self) -> bool {
        self.token_key == DEFAULT_TOKEN_KEY
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_pepper: DEFAULT_PASSWORD_PEPPER.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password_pepper", &"<redacted>")
            .field("token_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct BootstrapConfig {
    pub root_username: String,
    #[serde(skip)]
    pub root_password: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            root_username: DEFAULT_ROOT_USERNAME.to_string(),
            root_password: None,
        }
    }
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("root_username", &self.root_username)
            .field(
                "root_password",
                &self.root_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin.trim() == "*")
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let config = Config {
            auth: AuthConfig {
                password_pepper: "pepper-value".into(),
                token_key: "key-value".into(),
            },
            bootstrap: BootstrapConfig {
                root_username: "root".into(),
                root_password: Some("hunter2".into()),
            },
            ..Config::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("pepper-value"));
        assert!(!rendered.contains("key-value"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn unparsable_hosts_bind_every_interface() {
        let mut config = Config::default();
        config.server.host = "localhost".into();
        config.server.port = 4100;
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:4100");

        config.server.host = "127.0.0.1".into();
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:4100");
    }
}
