use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::passkey::Challenge;
use crate::session::SessionId;
use crate::storage::errors::ChallengeStoreError;

/// Single pending challenge slot per session.
///
/// `issue` replaces whatever the session held before. `consume` reads and
/// clears the slot atomically, so a challenge can be used at most once.
/// Entries older than the store's TTL are reported as absent.
#[async_trait]
pub trait ChallengeSessionStore: Send + Sync + 'static {
    /// Verify the backend is reachable.
    async fn init(&self) -> Result<(), ChallengeStoreError> {
        Ok(())
    }

    async fn issue(&self, session_id: &SessionId) -> Result<Challenge, ChallengeStoreError>;

    async fn consume(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Challenge>, ChallengeStoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChallenge {
    pub challenge: Challenge,
    pub issued_at: DateTime<Utc>,
}

impl PendingChallenge {
    pub(crate) fn new(challenge: Challenge) -> Self {
        Self {
            challenge,
            issued_at: Utc::now(),
        }
    }

    pub(crate) fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        now - self.issued_at >= ttl
    }
}

pub(crate) fn ttl_from_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
