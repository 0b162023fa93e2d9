use thiserror::Error;

use crate::utils::UtilError;

/// Failures of a [`CredentialRepository`](super::CredentialRepository).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Credential not found")]
    CredentialNotFound,

    /// The credential id is registered to a different user.
    #[error("Credential is registered to another user")]
    CredentialConflict,

    #[error("Counter regression: stored {stored}, attempted {attempted}")]
    CounterRegression { stored: u32, attempted: u32 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Failures of a [`ChallengeSessionStore`](super::ChallengeSessionStore).
#[derive(Debug, Error, Clone)]
pub enum ChallengeStoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<redis::RedisError> for ChallengeStoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ChallengeStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<UtilError> for ChallengeStoreError {
    fn from(err: UtilError) -> Self {
        Self::Crypto(err.to_string())
    }
}
