use std::fs;

use lectern_server::infra::config::{
    ConfigGuardRailError, ConfigLoadError, ConfigLoader, EnvConfig,
};
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("lectern.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn explicit_file_is_loaded() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
        [server]
        host = "127.0.0.1"
        port = 4242

        [storage]
        users_file = "data/users.json"

        [auth]
        password_pepper = "a-pepper-that-is-long-enough-for-the-check"
        token_key = "a-token-key-that-is-long-enough-for-the-check"

        [bootstrap]
        root_username = "admin"
        root_password = "correct horse"

        [cors]
        allowed_origins = ["https://books.example"]
        "#,
    );

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(EnvConfig::default(), false)
        .expect("config loads");

    let config = load.config;
    assert_eq!(config.server.port, 4242);
    assert_eq!(config.bind_addr().to_string(), "127.0.0.1:4242");
    assert_eq!(
        config.storage.users_file.as_deref(),
        Some(std::path::Path::new("data/users.json"))
    );
    assert_eq!(config.bootstrap.root_username, "admin");
    assert_eq!(
        config.cors.allowed_origins,
        vec!["https://books.example".to_string()]
    );
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert!(load.warnings.is_empty(), "{:?}", load.warnings.items);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .load_with_env(EnvConfig::default(), false)
        .expect_err("missing file");
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[server\nport = 1");
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(EnvConfig::default(), false)
        .expect_err("bad toml");
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
}

#[test]
fn empty_token_key_in_file_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[auth]\ntoken_key = \"\"\n");
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .load_with_env(EnvConfig::default(), false)
        .expect_err("empty key");
    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::EmptySecret {
            field: "LECTERN_TOKEN_KEY"
        })
    ));
}

#[test]
fn env_path_wins_over_defaults_and_env_values_win_over_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[server]\nport = 7000\n");
    let env = EnvConfig {
        config_path: Some(path.clone()),
        server_port: Some(7100),
        ..EnvConfig::default()
    };

    let load = ConfigLoader::new()
        .load_with_env(env, true)
        .expect("config loads");
    assert_eq!(load.config.server.port, 7100);
    assert!(load.config.metadata.env_file_loaded);
    assert_eq!(load.config.metadata.config_path, Some(path));

    let placeholder_warnings = load
        .warnings
        .items
        .iter()
        .filter(|w| w.message.contains("placeholder"))
        .count();
    assert_eq!(placeholder_warnings, 2);
}
