//! passkey_rp - WebAuthn relying party for passkey sign-in
//!
//! This crate provides the server side of the registration and authentication
//! ceremonies (challenge sessions, credential storage, response verification)
//! together with a client-side orchestrator that drives them from the browser's
//! point of view.

mod client;
mod config;
mod passkey;
mod session;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

use thiserror::Error;

pub use client::{
    ApiError, CeremonyApi, CeremonyOutcome, ClientCeremonyOrchestrator, ClientError,
    HttpCeremonyApi, Mediation, PlatformAuthenticator, PlatformError, SoftAuthenticator,
};

// Re-export the route prefix
pub use config::PASSKEY_ROUTE_PREFIX;

pub use passkey::{
    AssertionResponse, AttestationResponse, AuthenticationCeremony, AuthenticationOptions,
    AuthenticationResponse, AuthenticationVerdict, AuthenticationVerifyRequest,
    AuthenticatorSelection, AuthenticatorTransport, CHALLENGE_LEN, CeremonyError, Challenge,
    ConfigError, CoseKey, Credential, CredentialDescriptor, ExpectedCeremony, PasskeyConfig,
    PubKeyCredParam, RegistrationCeremony, RegistrationOptions, RegistrationResponse,
    RegistrationVerdict, RegistrationVerifyRequest, RelyingParty, RelyingPartyEntity,
    ResidentKeyRequirement, ResponseVerifier, User, UserEntity, UserVerification,
    VerificationError, VerifiedAuthentication, VerifiedRegistration, WebAuthnVerifier,
};

pub use session::{
    SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME, SessionId, issue_session_cookie,
    session_id_from_headers,
};

pub use storage::{
    ChallengeSessionStore, ChallengeStoreError, CredentialRepository, InMemoryChallengeStore,
    InMemoryCredentialRepository, PendingChallenge, RedisChallengeStore, RepositoryError,
    SqliteCredentialRepository, challenge_store_from_env, credential_repository_from_env,
};

pub use utils::UtilError;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Challenge store error: {0}")]
    ChallengeStore(#[from] ChallengeStoreError),
}

/// Builds a relying party from `ORIGIN` and the `PASSKEY_*` variables,
/// initializing the configured stores.
pub async fn relying_party_from_env() -> Result<RelyingParty, InitError> {
    let config = PasskeyConfig::from_env()?;
    tracing::info!(
        "Relying party {} ({}) for origin {}",
        config.rp_name,
        config.rp_id,
        config.origin
    );

    let repository = credential_repository_from_env().await?;
    let challenges = challenge_store_from_env(config.challenge_timeout_secs).await?;

    Ok(RelyingParty::new(config, repository, challenges))
}
