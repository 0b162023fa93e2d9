//! Backend selection from the environment.

use std::env;
use std::sync::Arc;

use super::challenge::{ChallengeSessionStore, InMemoryChallengeStore, RedisChallengeStore};
use super::credential::{
    CredentialRepository, InMemoryCredentialRepository, SqliteCredentialRepository,
};
use super::errors::{ChallengeStoreError, RepositoryError};

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Builds the credential repository named by `PASSKEY_DATA_STORE_TYPE`
/// (`memory` or `sqlite`, default `memory`) and runs its `init`.
pub async fn credential_repository_from_env()
-> Result<Arc<dyn CredentialRepository>, RepositoryError> {
    let store_type = env_or("PASSKEY_DATA_STORE_TYPE", "memory");
    let store_url = env_or("PASSKEY_DATA_STORE_URL", "sqlite:passkey.db");

    tracing::info!("Initializing data store with type: {}", store_type);

    let repository: Arc<dyn CredentialRepository> = match store_type.as_str() {
        "memory" => Arc::new(InMemoryCredentialRepository::new()),
        "sqlite" => {
            tracing::info!("Opening SQLite database: {}", store_url);
            Arc::new(SqliteCredentialRepository::connect(&store_url).await?)
        }
        t => {
            return Err(RepositoryError::Storage(format!(
                "Unsupported data store type: {t}. Supported types are 'memory' and 'sqlite'"
            )));
        }
    };

    repository.init().await?;
    Ok(repository)
}

/// Builds the challenge store named by `PASSKEY_CACHE_STORE_TYPE`
/// (`memory` or `redis`, default `memory`) and checks connectivity.
pub async fn challenge_store_from_env(
    ttl_secs: u64,
) -> Result<Arc<dyn ChallengeSessionStore>, ChallengeStoreError> {
    let store_type = env_or("PASSKEY_CACHE_STORE_TYPE", "memory");
    let store_url = env_or("PASSKEY_CACHE_STORE_URL", "redis://127.0.0.1:6379");

    tracing::info!("Initializing cache store with type: {}", store_type);

    let store: Arc<dyn ChallengeSessionStore> = match store_type.as_str() {
        "memory" => Arc::new(InMemoryChallengeStore::new(ttl_secs)),
        "redis" => {
            tracing::info!("Connecting to Redis: {}", store_url);
            Arc::new(RedisChallengeStore::open(&store_url, ttl_secs)?)
        }
        t => {
            return Err(ChallengeStoreError::Storage(format!(
                "Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"
            )));
        }
    };

    store.init().await?;
    Ok(store)
}
