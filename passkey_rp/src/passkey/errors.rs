use thiserror::Error;

use crate::storage::{ChallengeStoreError, RepositoryError};
use crate::utils::UtilError;

/// Outcome of a failed ceremony step.
///
/// Every variant except `UnexpectedServerError` is an expected rejection whose
/// message is safe to show the client. `UnexpectedServerError` keeps its
/// detail for the logs only; its `Display` never includes it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CeremonyError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("User does not exist")]
    UserNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Challenge does not exist")]
    ChallengeMissing,

    #[error("Authenticator is not registered with this site")]
    CredentialNotRegistered,

    #[error("{0}")]
    VerificationFailed(String),

    #[error("Unexpected Server Error")]
    UnexpectedServerError(String),
}

impl CeremonyError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::UnexpectedServerError(detail) => {
                tracing::error!("Unexpected server error: {}", detail)
            }
            Self::VerificationFailed(reason) => tracing::warn!("Verification failed: {}", reason),
            other => tracing::info!("Ceremony rejected: {}", other),
        }
        self
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::UnexpectedServerError(_))
    }
}

impl From<RepositoryError> for CeremonyError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UserNotFound(_) => Self::UserNotFound,
            RepositoryError::UserAlreadyExists(_) => Self::UserAlreadyExists,
            RepositoryError::CredentialNotFound => Self::CredentialNotRegistered,
            RepositoryError::CredentialConflict => Self::VerificationFailed(
                "Credential is already registered to another user".to_string(),
            ),
            RepositoryError::CounterRegression { stored, attempted } => {
                Self::VerificationFailed(format!(
                    "Counter value did not increase (stored {stored}, received {attempted})"
                ))
            }
            RepositoryError::Storage(detail) => {
                let error = Self::UnexpectedServerError(format!("Repository: {detail}"));
                tracing::error!("{:?}", error);
                error
            }
        }
    }
}

impl From<ChallengeStoreError> for CeremonyError {
    fn from(err: ChallengeStoreError) -> Self {
        let error = Self::UnexpectedServerError(format!("Challenge store: {err}"));
        tracing::error!("{:?}", error);
        error
    }
}

impl From<UtilError> for CeremonyError {
    fn from(err: UtilError) -> Self {
        let error = Self::UnexpectedServerError(format!("Utils: {err}"));
        tracing::error!("{:?}", error);
        error
    }
}

impl From<VerificationError> for CeremonyError {
    fn from(err: VerificationError) -> Self {
        Self::VerificationFailed(err.to_string())
    }
}

/// Why a response failed cryptographic or structural verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Invalid client data: {0}")]
    ClientData(String),

    #[error("Challenge mismatch")]
    ChallengeMismatch,

    #[error("Invalid origin. Expected: {expected}, Got: {actual}")]
    OriginMismatch { expected: String, actual: String },

    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    #[error("User not present")]
    UserNotPresent,

    #[error("User verification required but flag not set")]
    UserNotVerified,

    #[error("Unsupported attestation format: {0}")]
    UnsupportedAttestation(String),

    #[error("Invalid attestation: {0}")]
    Attestation(String),

    #[error("Unsupported public key: {0}")]
    PublicKey(String),

    #[error("Signature verification failed")]
    Signature,

    #[error("Counter value did not increase (stored {stored}, received {received})")]
    CounterRegression { stored: u32, received: u32 },
}

impl From<UtilError> for VerificationError {
    fn from(err: UtilError) -> Self {
        Self::Format(err.to_string())
    }
}
