mod challenge;
mod config;
mod credential;
mod errors;

pub use challenge::{
    ChallengeSessionStore, InMemoryChallengeStore, PendingChallenge, RedisChallengeStore,
};
pub use config::{challenge_store_from_env, credential_repository_from_env};
pub use credential::{
    CredentialRepository, InMemoryCredentialRepository, SqliteCredentialRepository,
};
pub use errors::{ChallengeStoreError, RepositoryError};
