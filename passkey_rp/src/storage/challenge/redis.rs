use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use redis::AsyncCommands;

use super::types::{ChallengeSessionStore, PendingChallenge, ttl_from_secs};
use crate::passkey::Challenge;
use crate::session::SessionId;
use crate::storage::errors::ChallengeStoreError;

const CHALLENGE_PREFIX: &str = "passkey:challenge";

/// Challenge slots in Redis. `SET .. EX` bounds the lifetime and `GETDEL`
/// makes consumption atomic across server instances.
pub struct RedisChallengeStore {
    client: redis::Client,
    ttl_secs: u64,
    ttl: TimeDelta,
}

impl RedisChallengeStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self {
            client,
            ttl_secs,
            ttl: ttl_from_secs(ttl_secs),
        }
    }

    pub fn open(url: &str, ttl_secs: u64) -> Result<Self, ChallengeStoreError> {
        Ok(Self::new(redis::Client::open(url)?, ttl_secs))
    }

    fn make_key(session_id: &SessionId) -> String {
        format!("{CHALLENGE_PREFIX}:{session_id}")
    }
}

#[async_trait]
impl ChallengeSessionStore for RedisChallengeStore {
    async fn init(&self) -> Result<(), ChallengeStoreError> {
        let _conn = self.client.get_multiplexed_async_connection().await?;
        Ok(())
    }

    async fn issue(&self, session_id: &SessionId) -> Result<Challenge, ChallengeStoreError> {
        let pending = PendingChallenge::new(Challenge::random()?);
        let value = serde_json::to_string(&pending)?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // EX 0 is rejected by Redis.
        let _: () = conn
            .set_ex(Self::make_key(session_id), value, self.ttl_secs.max(1))
            .await?;

        tracing::debug!("Issued challenge for session {}", session_id);
        Ok(pending.challenge)
    }

    async fn consume(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Challenge>, ChallengeStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get_del(Self::make_key(session_id)).await?;

        let Some(value) = value else {
            return Ok(None);
        };
        let pending: PendingChallenge = serde_json::from_str(&value)?;
        if pending.is_expired(self.ttl, Utc::now()) {
            tracing::debug!("Challenge for session {} expired", session_id);
            return Ok(None);
        }
        Ok(Some(pending.challenge))
    }
}
