use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_model::{StoredUser, User, UserId};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::ports::UserDirectory;

/// Account directory held in memory and optionally mirrored to a JSON file.
///
/// Usernames are matched case-insensitively. Every write rewrites the whole
/// file through a temp file and a rename, so a crash never leaves a partial
/// document behind.
pub struct JsonUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for JsonUserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonUserDirectory")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonUserDirectory {
    /// Directory with no backing file; contents die with the process.
    pub fn in_memory() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            path: None,
        }
    }

    /// Load accounts from `path`, normalizing legacy records. A missing file
    /// starts an empty directory that will be created on first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = match tokio::fs::read(&path).await {
            Ok(bytes) => Self::decode(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "users file not found, starting empty"
                );
                HashMap::new()
            }
            Err(err) => return Err(err.into()),
        };

        debug!(
            path = %path.display(),
            count = users.len(),
            "loaded user directory"
        );
        Ok(Self {
            users: RwLock::new(users),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn decode(bytes: &[u8]) -> Result<HashMap<UserId, User>, StoreError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(HashMap::new());
        }
        let records: Vec<StoredUser> = serde_json::from_slice(bytes)?;
        let now = Utc::now();
        Ok(records
            .into_iter()
            .map(|record| {
                let user = User::from_stored(record, now);
                (user.id, user)
            })
            .collect())
    }

    async fn persist(
        &self,
        users: &HashMap<UserId, User>,
    ) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut records: Vec<StoredUser> =
            users.values().map(User::to_full_view).collect();
        records.sort_by_key(|record| (record.created_at, record.id));
        let body = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "users.json".to_string());
        let tmp = path.with_file_name(format!(
            "{file_name}.tmp-{}",
            Uuid::new_v4().simple()
        ));

        let written = match tokio::fs::write(&tmp, &body).await {
            Ok(()) => tokio::fs::rename(&tmp, path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "failed to remove temp users file"
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn username_taken(
        users: &HashMap<UserId, User>,
        username: &str,
        except: UserId,
    ) -> bool {
        users.values().any(|user| {
            user.id != except && user.username.eq_ignore_ascii_case(username)
        })
    }

    fn root_taken(users: &HashMap<UserId, User>, except: UserId) -> bool {
        users.values().any(|user| user.id != except && user.is_root())
    }
}

#[async_trait]
impl UserDirectory for JsonUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn exists_by_username(
        &self,
        username: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|user| user.username.eq_ignore_ascii_case(username)))
    }

    async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> =
            self.users.read().await.values().cloned().collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    async fn create(&self, user: &User) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Ok(false);
        }
        if user.is_root() && Self::root_taken(&users, user.id) {
            return Err(StoreError::Constraint(
                "a root account already exists".into(),
            ));
        }
        if Self::username_taken(&users, &user.username, user.id) {
            return Err(StoreError::Constraint(format!(
                "username {} is already taken",
                user.username
            )));
        }

        users.insert(user.id, user.clone());
        if let Err(err) = self.persist(&users).await {
            users.remove(&user.id);
            return Err(err);
        }
        Ok(true)
    }

    async fn update(&self, user: &User) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Ok(false);
        }
        if user.is_root() && Self::root_taken(&users, user.id) {
            return Err(StoreError::Constraint(
                "a root account already exists".into(),
            ));
        }
        if Self::username_taken(&users, &user.username, user.id) {
            return Err(StoreError::Constraint(format!(
                "username {} is already taken",
                user.username
            )));
        }

        let previous = users.insert(user.id, user.clone());
        if let Err(err) = self.persist(&users).await {
            if let Some(previous) = previous {
                users.insert(previous.id, previous);
            }
            return Err(err);
        }
        Ok(true)
    }

    async fn delete(&self, user: &User) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(removed) = users.remove(&user.id) else {
            return Ok(false);
        };
        if let Err(err) = self.persist(&users).await {
            users.insert(removed.id, removed);
            return Err(err);
        }
        Ok(true)
    }

    async fn touch_last_seen(
        &self,
        id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };

        let previous = user.last_seen;
        user.touch_last_seen(at);
        if user.last_seen == previous {
            return Ok(true);
        }

        if let Err(err) = self.persist(&users).await {
            if let Some(user) = users.get_mut(&id) {
                user.last_seen = previous;
            }
            return Err(err);
        }
        Ok(true)
    }
}
