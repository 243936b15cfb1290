//! # Lectern Core
//!
//! Account rules for the Lectern media server: who may see or change which
//! account, how partial updates are applied, and how credentials and bearer
//! tokens are produced.
//!
//! ## Architecture
//!
//! - [`access`]: the [`AccessController`] gate run before every operation
//! - [`update`]: the [`UpdatePolicy`] that stages and commits field changes
//! - [`service`]: [`UserService`], the operations the HTTP layer binds
//! - [`ports`]: collaborator traits (directory, authentication, notification,
//!   session lookup, playlists)
//! - [`auth`]: [`AuthCrypto`], the Argon2id + HMAC implementation of
//!   [`ports::Authenticator`]
//! - [`infrastructure`]: in-process adapters for the other ports
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lectern_core::infrastructure::{
//!     BroadcastHub, JsonUserDirectory, MemoryPlaylistStore,
//!     MemorySessionRegistry,
//! };
//! use lectern_core::{AuthCrypto, CreateUserCommand, UserService};
//! use lectern_model::UserRole;
//!
//! async fn bootstrap() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = UserService::new(
//!         Arc::new(JsonUserDirectory::open("data/users.json").await?),
//!         Arc::new(AuthCrypto::new("pepper", "token-key")?),
//!         Arc::new(BroadcastHub::new()),
//!         Arc::new(MemorySessionRegistry::new()),
//!         Arc::new(MemoryPlaylistStore::new()),
//!     );
//!
//!     if let Some(root) = service.ensure_root("root", "change-me").await? {
//!         let alice = service
//!             .create_user(
//!                 &root,
//!                 CreateUserCommand::new("alice", UserRole::User),
//!             )
//!             .await?;
//!         println!("created {}", alice.username);
//!     }
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]

pub mod access;
pub mod auth;
pub mod error;
pub mod infrastructure;
pub mod ports;
pub mod service;
pub mod update;

pub use access::{AccessController, UserOperation};
pub use auth::{AuthCrypto, AuthCryptoError, TokenClaims};
pub use error::{Result, StoreError, UserError};
pub use service::{CreateUserCommand, UserService};
pub use update::{UpdateOutcome, UpdatePolicy, UserUpdate};
