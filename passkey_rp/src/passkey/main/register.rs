use std::sync::Arc;

use super::types::{
    ALG_ES256, ALG_RS256, AuthenticatorSelection, CredentialDescriptor, PUBLIC_KEY_TYPE,
    PubKeyCredParam, RegistrationOptions, RegistrationResponse, RegistrationVerdict,
    RelyingPartyEntity, ResidentKeyRequirement, UserEntity,
};
use super::verifier::{ExpectedCeremony, ResponseVerifier};
use crate::passkey::config::PasskeyConfig;
use crate::passkey::errors::CeremonyError;
use crate::passkey::types::{Credential, User};
use crate::session::SessionId;
use crate::storage::{ChallengeSessionStore, CredentialRepository, RepositoryError};
use crate::utils::base64url_encode;

const ATTESTATION_NONE: &str = "none";

pub(super) fn validate_username(username: &str) -> Result<&str, CeremonyError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(CeremonyError::InvalidInput("Username is invalid".to_string()));
    }
    Ok(username)
}

pub(super) fn credential_descriptors(user: &User) -> Vec<CredentialDescriptor> {
    user.credentials
        .iter()
        .map(|c| CredentialDescriptor {
            type_: PUBLIC_KEY_TYPE.to_string(),
            id: base64url_encode(&c.id),
            transports: c.transports.iter().copied().collect(),
        })
        .collect()
}

/// Issues creation options and verifies attestation responses.
#[derive(Clone)]
pub struct RegistrationCeremony {
    config: Arc<PasskeyConfig>,
    repository: Arc<dyn CredentialRepository>,
    challenges: Arc<dyn ChallengeSessionStore>,
    verifier: Arc<dyn ResponseVerifier>,
}

impl RegistrationCeremony {
    pub fn new(
        config: Arc<PasskeyConfig>,
        repository: Arc<dyn CredentialRepository>,
        challenges: Arc<dyn ChallengeSessionStore>,
        verifier: Arc<dyn ResponseVerifier>,
    ) -> Self {
        Self {
            config,
            repository,
            challenges,
            verifier,
        }
    }

    /// Creates the user on first use and binds a fresh challenge to `session_id`.
    pub async fn generate_options(
        &self,
        session_id: &SessionId,
        username: &str,
    ) -> Result<RegistrationOptions, CeremonyError> {
        let username = validate_username(username)?;
        let user = self.find_or_create_user(username).await?;
        let challenge = self.challenges.issue(session_id).await?;

        tracing::info!(
            "Registration options issued for {} ({} existing credentials)",
            user.username,
            user.credentials.len()
        );

        Ok(RegistrationOptions {
            rp: RelyingPartyEntity {
                name: self.config.rp_name.clone(),
                id: self.config.rp_id.clone(),
            },
            user: UserEntity {
                id: user.user_handle(),
                name: user.username.clone(),
                display_name: user.username.clone(),
            },
            challenge,
            pub_key_cred_params: [ALG_ES256, ALG_RS256]
                .into_iter()
                .map(|alg| PubKeyCredParam {
                    type_: PUBLIC_KEY_TYPE.to_string(),
                    alg,
                })
                .collect(),
            timeout: self.config.timeout_millis(),
            attestation: ATTESTATION_NONE.to_string(),
            exclude_credentials: credential_descriptors(&user),
            authenticator_selection: AuthenticatorSelection {
                resident_key: ResidentKeyRequirement::Preferred,
                require_resident_key: false,
                user_verification: self.config.user_verification,
            },
        })
    }

    async fn find_or_create_user(&self, username: &str) -> Result<User, CeremonyError> {
        if let Some(user) = self.repository.find_by_username(username).await? {
            return Ok(user);
        }

        match self.repository.create_user(username).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent request for the same name.
            Err(RepositoryError::UserAlreadyExists(_)) => self
                .repository
                .find_by_username(username)
                .await?
                .ok_or_else(|| {
                    CeremonyError::UnexpectedServerError(format!(
                        "User {username} vanished after creation conflict"
                    ))
                }),
            Err(e) => Err(e.into()),
        }
    }

    /// Consumes the session's challenge and stores the new credential.
    ///
    /// Re-submitting a credential the user already owns succeeds without
    /// creating a second record.
    pub async fn verify(
        &self,
        session_id: &SessionId,
        username: &str,
        response: &RegistrationResponse,
    ) -> Result<RegistrationVerdict, CeremonyError> {
        let username = validate_username(username)?;
        let user = self
            .repository
            .find_by_username(username)
            .await?
            .ok_or(CeremonyError::UserNotFound)?;

        let challenge = self
            .challenges
            .consume(session_id)
            .await?
            .ok_or(CeremonyError::ChallengeMissing)?;

        let expected = ExpectedCeremony {
            challenge: &challenge,
            origin: &self.config.origin,
            rp_id: &self.config.rp_id,
            require_user_verification: self.config.user_verification.is_required(),
        };
        let verified = self
            .verifier
            .verify_registration(response, &expected)
            .map_err(|e| CeremonyError::from(e).log())?;

        if !verified.verified {
            tracing::warn!("Registration for {} was not verified", user.username);
            return Ok(RegistrationVerdict { verified: false });
        }

        if user.credential(&verified.credential_id).is_some() {
            tracing::info!("Credential already registered for {}", user.username);
            return Ok(RegistrationVerdict { verified: true });
        }

        let credential = Credential::new(
            verified.credential_id,
            verified.public_key,
            verified.sign_counter,
            response.transports(),
        );
        self.repository
            .add_credential(&user.id, credential)
            .await
            .map_err(|e| CeremonyError::from(e).log())?;

        tracing::info!("Registered new credential for {}", user.username);
        Ok(RegistrationVerdict { verified: true })
    }
}
