use std::sync::Arc;

use super::auth::AuthenticationCeremony;
use super::register::RegistrationCeremony;
use super::verifier::{ResponseVerifier, WebAuthnVerifier};
use crate::passkey::config::PasskeyConfig;
use crate::storage::{ChallengeSessionStore, CredentialRepository};

/// Both ceremonies sharing one repository, challenge store and verifier.
#[derive(Clone)]
pub struct RelyingParty {
    pub registration: RegistrationCeremony,
    pub authentication: AuthenticationCeremony,
    config: Arc<PasskeyConfig>,
}

impl RelyingParty {
    pub fn new(
        config: PasskeyConfig,
        repository: Arc<dyn CredentialRepository>,
        challenges: Arc<dyn ChallengeSessionStore>,
    ) -> Self {
        Self::with_verifier(config, repository, challenges, Arc::new(WebAuthnVerifier::new()))
    }

    pub fn with_verifier(
        config: PasskeyConfig,
        repository: Arc<dyn CredentialRepository>,
        challenges: Arc<dyn ChallengeSessionStore>,
        verifier: Arc<dyn ResponseVerifier>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            registration: RegistrationCeremony::new(
                config.clone(),
                repository.clone(),
                challenges.clone(),
                verifier.clone(),
            ),
            authentication: AuthenticationCeremony::new(
                config.clone(),
                repository,
                challenges,
                verifier,
            ),
            config,
        }
    }

    pub fn config(&self) -> &PasskeyConfig {
        &self.config
    }
}
