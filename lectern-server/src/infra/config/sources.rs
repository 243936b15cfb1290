use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
    #[serde(default)]
    pub bootstrap: FileBootstrapConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBootstrapConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_password: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub users_file: Option<PathBuf>,
    pub auth_password_pepper: Option<String>,
    pub auth_token_key: Option<String>,
    pub root_username: Option<String>,
    pub root_password: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("LECTERN_CONFIG")
                .ok()
                .map(PathBuf::from),
            server_host: std::env::var("LECTERN_HOST").ok(),
            server_port: std::env::var("LECTERN_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            users_file: std::env::var("LECTERN_USERS_FILE")
                .ok()
                .map(PathBuf::from),
            auth_password_pepper: std::env::var("LECTERN_PASSWORD_PEPPER").ok(),
            auth_token_key: std::env::var("LECTERN_TOKEN_KEY").ok(),
            root_username: std::env::var("LECTERN_ROOT_USERNAME").ok(),
            root_password: std::env::var("LECTERN_ROOT_PASSWORD").ok(),
            cors_allowed_origins: parse_csv_var("LECTERN_CORS_ALLOWED_ORIGINS"),
        }
    }
}

fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| split_csv(&raw))
}

pub(crate) fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
