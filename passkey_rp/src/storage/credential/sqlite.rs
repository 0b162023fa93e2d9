use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};

use super::types::CredentialRepository;
use crate::passkey::{AuthenticatorTransport, Credential, User};
use crate::storage::errors::RepositoryError;

const USERS_TABLE: &str = "passkey_users";
const CREDENTIALS_TABLE: &str = "passkey_credentials";

/// Users and credentials in SQLite.
pub struct SqliteCredentialRepository {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
}

#[derive(FromRow)]
struct CredentialRow {
    credential_id: Vec<u8>,
    public_key: Vec<u8>,
    counter: i64,
    transports: String,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.credential_id,
            public_key: row.public_key,
            sign_counter: u32::try_from(row.counter).unwrap_or(u32::MAX),
            transports: decode_transports(&row.transports),
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        }
    }
}

fn encode_transports(credential: &Credential) -> String {
    credential
        .transports
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_transports(value: &str) -> std::collections::BTreeSet<AuthenticatorTransport> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let transport = AuthenticatorTransport::parse(s);
            if transport.is_none() {
                tracing::warn!("Ignoring unknown stored transport: {}", s);
            }
            transport
        })
        .collect()
}

impl SqliteCredentialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url`. An in-memory URL
    /// gets a single connection so every query sees the same database.
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        Ok(Self::new(pool))
    }

    async fn load_credentials(&self, user_id: &str) -> Result<Vec<Credential>, RepositoryError> {
        let rows = sqlx::query_as::<_, CredentialRow>(&format!(
            r#"
            SELECT credential_id, public_key, counter, transports, created_at, last_used_at
            FROM {CREDENTIALS_TABLE} WHERE user_id = ? ORDER BY created_at, rowid
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Credential::from).collect())
    }

    async fn load_user(&self, row: Option<UserRow>) -> Result<Option<User>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let credentials = self.load_credentials(&row.id).await?;
        Ok(Some(User {
            id: row.id,
            username: row.username,
            credentials,
        }))
    }

    async fn credential_owner(
        tx: &mut Transaction<'_, Sqlite>,
        credential_id: &[u8],
    ) -> Result<Option<String>, RepositoryError> {
        let owner: Option<(String,)> = sqlx::query_as(&format!(
            r#"SELECT user_id FROM {CREDENTIALS_TABLE} WHERE credential_id = ?"#
        ))
        .bind(credential_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(owner.map(|(id,)| id))
    }
}

#[async_trait]
impl CredentialRepository for SqliteCredentialRepository {
    async fn init(&self) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {USERS_TABLE} (
                id TEXT PRIMARY KEY NOT NULL,
                username TEXT NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {CREDENTIALS_TABLE} (
                credential_id BLOB PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL REFERENCES {USERS_TABLE}(id),
                public_key BLOB NOT NULL,
                counter INTEGER NOT NULL DEFAULT 0,
                transports TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP NOT NULL,
                last_used_at TIMESTAMP NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            r#"CREATE INDEX IF NOT EXISTS idx_{CREDENTIALS_TABLE}_user_id ON {CREDENTIALS_TABLE}(user_id)"#
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!("SQLite credential tables ready");
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<User, RepositoryError> {
        let user = User::new(username);
        let result = sqlx::query(&format!(
            r#"INSERT INTO {USERS_TABLE} (id, username, created_at) VALUES (?, ?, ?)"#
        ))
        .bind(&user.id)
        .bind(&user.username)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!("Created user {} ({})", user.username, user.id);
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RepositoryError::UserAlreadyExists(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT id, username FROM {USERS_TABLE} WHERE username = ?"#
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        self.load_user(row).await
    }

    async fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT u.id, u.username FROM {USERS_TABLE} u
            JOIN {CREDENTIALS_TABLE} c ON c.user_id = u.id
            WHERE c.credential_id = ?
            "#
        ))
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        self.load_user(row).await
    }

    async fn add_credential(
        &self,
        user_id: &str,
        credential: Credential,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user: Option<(String,)> =
            sqlx::query_as(&format!(r#"SELECT id FROM {USERS_TABLE} WHERE id = ?"#))
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if user.is_none() {
            return Err(RepositoryError::UserNotFound(user_id.to_string()));
        }

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO {CREDENTIALS_TABLE}
                (credential_id, user_id, public_key, counter, transports, created_at, last_used_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(credential_id) DO NOTHING
            "#
        ))
        .bind(&credential.id)
        .bind(user_id)
        .bind(&credential.public_key)
        .bind(i64::from(credential.sign_counter))
        .bind(encode_transports(&credential))
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            let owner = Self::credential_owner(&mut tx, &credential.id).await?;
            if owner.as_deref() != Some(user_id) {
                return Err(RepositoryError::CredentialConflict);
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_counter(
        &self,
        credential_id: &[u8],
        new_counter: u32,
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE {CREDENTIALS_TABLE}
            SET counter = ?, last_used_at = ?
            WHERE credential_id = ? AND counter <= ?
            "#
        ))
        .bind(i64::from(new_counter))
        .bind(Utc::now())
        .bind(credential_id)
        .bind(i64::from(new_counter))
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(());
        }

        let stored: Option<(i64,)> = sqlx::query_as(&format!(
            r#"SELECT counter FROM {CREDENTIALS_TABLE} WHERE credential_id = ?"#
        ))
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        match stored {
            None => Err(RepositoryError::CredentialNotFound),
            Some((stored,)) => Err(RepositoryError::CounterRegression {
                stored: u32::try_from(stored).unwrap_or(u32::MAX),
                attempted: new_counter,
            }),
        }
    }
}
