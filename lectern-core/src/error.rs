use thiserror::Error;

/// Failure of an account operation, as seen by the boundary layer.
#[derive(Error, Debug)]
pub enum UserError {
    /// An authorization rule failed. Deliberately carries no detail.
    #[error("forbidden")]
    Forbidden,

    #[error("user not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    /// The payload asks for a mutation that is never allowed
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(StoreError),
}

impl UserError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Constraint(message) => UserError::Conflict(message),
            other => UserError::Store(other),
        }
    }
}

/// Failure of a collaborator (directory, playlists, crypto). Never retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A uniqueness or population rule enforced by the store
    #[error("{0}")]
    Constraint(String),

    #[error("collaborator failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
