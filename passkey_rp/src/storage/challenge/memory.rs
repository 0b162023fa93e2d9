use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;

use super::types::{ChallengeSessionStore, PendingChallenge, ttl_from_secs};
use crate::passkey::Challenge;
use crate::session::SessionId;
use crate::storage::errors::ChallengeStoreError;

/// Process-local challenge slots. Not shared between nodes.
pub struct InMemoryChallengeStore {
    slots: Mutex<HashMap<SessionId, PendingChallenge>>,
    ttl: TimeDelta,
}

impl InMemoryChallengeStore {
    pub fn new(ttl_secs: u64) -> Self {
        tracing::info!("Creating in-memory challenge store (ttl {}s)", ttl_secs);
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl: ttl_from_secs(ttl_secs),
        }
    }
}

#[async_trait]
impl ChallengeSessionStore for InMemoryChallengeStore {
    async fn issue(&self, session_id: &SessionId) -> Result<Challenge, ChallengeStoreError> {
        let pending = PendingChallenge::new(Challenge::random()?);
        let challenge = pending.challenge.clone();

        let mut slots = self.slots.lock().await;
        let now = Utc::now();
        slots.retain(|_, p| !p.is_expired(self.ttl, now));
        slots.insert(session_id.clone(), pending);

        tracing::debug!("Issued challenge for session {}", session_id);
        Ok(challenge)
    }

    async fn consume(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Challenge>, ChallengeStoreError> {
        let pending = self.slots.lock().await.remove(session_id);

        Ok(match pending {
            Some(p) if p.is_expired(self.ttl, Utc::now()) => {
                tracing::debug!("Challenge for session {} expired", session_id);
                None
            }
            Some(p) => Some(p.challenge),
            None => None,
        })
    }
}
