//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::client::{PlatformAuthenticator, SoftAuthenticator};
use crate::passkey::{CeremonyError, PasskeyConfig, RegistrationVerdict, RelyingParty};
use crate::session::SessionId;
use crate::storage::{InMemoryChallengeStore, InMemoryCredentialRepository};

pub(crate) const TEST_ORIGIN: &str = "https://rp.example.com";

/// A relying party on in-memory stores plus one authenticator bound to
/// [`TEST_ORIGIN`].
pub(crate) struct TestRp {
    pub(crate) rp: RelyingParty,
    pub(crate) config: Arc<PasskeyConfig>,
    pub(crate) repository: Arc<InMemoryCredentialRepository>,
    pub(crate) challenges: Arc<InMemoryChallengeStore>,
    pub(crate) authenticator: Arc<SoftAuthenticator>,
}

impl TestRp {
    pub(crate) fn new() -> Self {
        let config = PasskeyConfig::new(TEST_ORIGIN)
            .expect("test origin is valid")
            .with_rp_name("Test RP");
        let repository = Arc::new(InMemoryCredentialRepository::new());
        let challenges = Arc::new(InMemoryChallengeStore::new(config.challenge_timeout_secs));
        let rp = RelyingParty::new(config.clone(), repository.clone(), challenges.clone());

        Self {
            rp,
            config: Arc::new(config),
            repository,
            challenges,
            authenticator: Arc::new(SoftAuthenticator::new(TEST_ORIGIN)),
        }
    }

    /// Runs a full registration for `username` on `session`.
    pub(crate) async fn register(
        &self,
        session: &SessionId,
        username: &str,
    ) -> Result<RegistrationVerdict, CeremonyError> {
        let options = self
            .rp
            .registration
            .generate_options(session, username)
            .await?;
        let response = self
            .authenticator
            .create_credential(&options)
            .await
            .map_err(|e| CeremonyError::InvalidInput(e.to_string()))?;
        self.rp
            .registration
            .verify(session, username, &response)
            .await
    }
}
