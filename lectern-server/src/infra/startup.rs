use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use lectern_core::AuthCrypto;
use lectern_core::infrastructure::JsonUserDirectory;
use lectern_core::ports::UserDirectory;

use crate::infra::{app_state::AppState, config::Config};

/// Open the user directory and crypto helper described by `config`.
pub async fn build_state(config: Config) -> Result<AppState> {
    let directory: Arc<dyn UserDirectory> = match &config.storage.users_file {
        Some(path) => {
            let directory = JsonUserDirectory::open(path.clone())
                .await
                .with_context(|| {
                    format!("failed to open users file {}", path.display())
                })?;
            info!(path = %path.display(), "user directory loaded");
            Arc::new(directory)
        }
        None => {
            warn!("user directory is in-memory; accounts are lost on restart");
            Arc::new(JsonUserDirectory::in_memory())
        }
    };

    let crypto = AuthCrypto::new(
        &config.auth.password_pepper,
        &config.auth.token_key,
    )
    .context("failed to initialise credential hashing")?;

    Ok(AppState::new(config, directory, Arc::new(crypto)))
}

/// Create the root account on first start.
///
/// The token is only ever printed here, once, since no login endpoint exists.
pub async fn bootstrap_root(state: &AppState) -> Result<()> {
    let bootstrap = &state.config.bootstrap;
    let password = bootstrap.root_password.as_deref().unwrap_or_default();

    match state
        .users
        .ensure_root(&bootstrap.root_username, password)
        .await
        .context("failed to bootstrap root account")?
    {
        Some(root) => {
            info!(
                username = %root.username,
                user_id = %root.id,
                token = %root.token,
                "root account created; store this token, it is not shown again"
            );
        }
        None => info!("root account present"),
    }
    Ok(())
}
