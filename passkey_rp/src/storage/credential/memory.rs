use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::types::CredentialRepository;
use crate::passkey::{Credential, User};
use crate::storage::errors::RepositoryError;

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    // username -> user id
    usernames: HashMap<String, String>,
    // credential id -> user id
    owners: HashMap<Vec<u8>, String>,
}

/// Users and credentials held in process memory behind a single lock.
#[derive(Default)]
pub struct InMemoryCredentialRepository {
    state: RwLock<State>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        tracing::info!("Creating in-memory credential repository");
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn create_user(&self, username: &str) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.usernames.contains_key(username) {
            return Err(RepositoryError::UserAlreadyExists(username.to_string()));
        }

        let user = User::new(username);
        state
            .usernames
            .insert(username.to_string(), user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        tracing::info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .usernames
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .owners
            .get(credential_id)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn add_credential(
        &self,
        user_id: &str,
        credential: Credential,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(user_id) {
            return Err(RepositoryError::UserNotFound(user_id.to_string()));
        }

        match state.owners.get(&credential.id) {
            Some(owner) if owner == user_id => return Ok(()),
            Some(_) => return Err(RepositoryError::CredentialConflict),
            None => {}
        }

        state
            .owners
            .insert(credential.id.clone(), user_id.to_string());
        if let Some(user) = state.users.get_mut(user_id) {
            user.credentials.push(credential);
        }
        Ok(())
    }

    async fn update_counter(
        &self,
        credential_id: &[u8],
        new_counter: u32,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let owner = state
            .owners
            .get(credential_id)
            .cloned()
            .ok_or(RepositoryError::CredentialNotFound)?;

        let credential = state
            .users
            .get_mut(&owner)
            .and_then(|user| user.credentials.iter_mut().find(|c| c.id == credential_id))
            .ok_or(RepositoryError::CredentialNotFound)?;

        if new_counter < credential.sign_counter {
            return Err(RepositoryError::CounterRegression {
                stored: credential.sign_counter,
                attempted: new_counter,
            });
        }
        credential.sign_counter = new_counter;
        credential.last_used_at = Utc::now();
        Ok(())
    }
}
