use async_trait::async_trait;

use crate::passkey::{Credential, User};
use crate::storage::errors::RepositoryError;

/// Persistence for users and their credentials.
///
/// A credential id belongs to exactly one user, and a username to at most
/// one user. Counters only move forward.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// Prepare the backend (create tables etc.).
    async fn init(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<User, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<User>, RepositoryError>;

    /// Appends `credential` to the user. Adding an id the user already owns
    /// is a no-op; an id owned by someone else is a `CredentialConflict`.
    async fn add_credential(
        &self,
        user_id: &str,
        credential: Credential,
    ) -> Result<(), RepositoryError>;

    /// Stores `new_counter` if it is not below the stored value, and bumps
    /// `last_used_at`.
    async fn update_counter(
        &self,
        credential_id: &[u8],
        new_counter: u32,
    ) -> Result<(), RepositoryError>;
}
