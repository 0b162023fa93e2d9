use std::sync::Arc;

use async_trait::async_trait;
use passkey_rp::{
    ApiError, AuthenticationOptions, AuthenticationResponse, AuthenticationVerdict,
    AuthenticationVerifyRequest, CeremonyApi, CeremonyError, ChallengeSessionStore,
    ClientCeremonyOrchestrator, CredentialRepository, InMemoryChallengeStore,
    InMemoryCredentialRepository, Mediation, PasskeyConfig, PlatformAuthenticator,
    RegistrationOptions, RegistrationResponse, RegistrationVerdict, RegistrationVerifyRequest,
    RelyingParty, SessionId, SoftAuthenticator, SqliteCredentialRepository,
};

pub const ORIGIN: &str = "https://rp.example.com";

/// A relying party plus the authenticator the "browser" holds.
pub struct TestRp {
    pub rp: RelyingParty,
    pub repository: Arc<dyn CredentialRepository>,
    pub challenges: Arc<dyn ChallengeSessionStore>,
    pub authenticator: Arc<SoftAuthenticator>,
}

fn config() -> PasskeyConfig {
    PasskeyConfig::new(ORIGIN)
        .expect("valid origin")
        .with_rp_name("Integration RP")
}

impl TestRp {
    pub fn in_memory() -> Self {
        Self::in_memory_with(SoftAuthenticator::new(ORIGIN))
    }

    pub fn in_memory_with(authenticator: SoftAuthenticator) -> Self {
        let repository: Arc<dyn CredentialRepository> =
            Arc::new(InMemoryCredentialRepository::new());
        Self::build(config(), repository, authenticator)
    }

    pub async fn sqlite() -> Self {
        let repository = SqliteCredentialRepository::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        repository.init().await.expect("schema");
        Self::build(config(), Arc::new(repository), SoftAuthenticator::new(ORIGIN))
    }

    fn build(
        config: PasskeyConfig,
        repository: Arc<dyn CredentialRepository>,
        authenticator: SoftAuthenticator,
    ) -> Self {
        let challenges: Arc<dyn ChallengeSessionStore> =
            Arc::new(InMemoryChallengeStore::new(config.challenge_timeout_secs));
        let rp = RelyingParty::new(config, repository.clone(), challenges.clone());
        Self {
            rp,
            repository,
            challenges,
            authenticator: Arc::new(authenticator),
        }
    }

    /// Fetches options and lets the authenticator create a credential.
    pub async fn create(&self, session: &SessionId, username: &str) -> RegistrationResponse {
        let options = self
            .rp
            .registration
            .generate_options(session, username)
            .await
            .expect("registration options");
        self.authenticator
            .create_credential(&options)
            .await
            .expect("authenticator creates credential")
    }

    pub async fn register(
        &self,
        session: &SessionId,
        username: &str,
    ) -> Result<RegistrationVerdict, CeremonyError> {
        let response = self.create(session, username).await;
        self.rp
            .registration
            .verify(session, username, &response)
            .await
    }

    /// Fetches options and lets the authenticator sign an assertion.
    pub async fn assert(
        &self,
        session: &SessionId,
        username: Option<&str>,
    ) -> AuthenticationResponse {
        let options = self
            .rp
            .authentication
            .generate_options(session, username)
            .await
            .expect("authentication options");
        self.authenticator
            .get_assertion(&options, Mediation::Optional)
            .await
            .expect("authenticator signs assertion")
    }

    pub async fn authenticate(
        &self,
        session: &SessionId,
        username: Option<&str>,
    ) -> Result<AuthenticationVerdict, CeremonyError> {
        let response = self.assert(session, username).await;
        self.rp
            .authentication
            .verify(session, username, &response)
            .await
    }

    pub async fn stored_counter(&self, username: &str) -> u32 {
        let user = self
            .repository
            .find_by_username(username)
            .await
            .expect("repository lookup")
            .expect("user exists");
        user.credentials[0].sign_counter
    }
}

/// Calls the ceremonies in-process, as if every request carried the same
/// session cookie.
pub struct InProcessApi {
    pub rp: RelyingParty,
    pub session: SessionId,
}

fn http_error(err: CeremonyError) -> ApiError {
    ApiError::Http {
        status: if err.is_unexpected() { 500 } else { 400 },
        message: err.to_string(),
    }
}

#[async_trait]
impl CeremonyApi for InProcessApi {
    async fn registration_options(&self, username: &str) -> Result<RegistrationOptions, ApiError> {
        self.rp
            .registration
            .generate_options(&self.session, username)
            .await
            .map_err(http_error)
    }

    async fn verify_registration(
        &self,
        request: &RegistrationVerifyRequest,
    ) -> Result<RegistrationVerdict, ApiError> {
        self.rp
            .registration
            .verify(&self.session, &request.username, &request.registration)
            .await
            .map_err(http_error)
    }

    async fn authentication_options(
        &self,
        username: Option<&str>,
    ) -> Result<AuthenticationOptions, ApiError> {
        self.rp
            .authentication
            .generate_options(&self.session, username)
            .await
            .map_err(http_error)
    }

    async fn verify_authentication(
        &self,
        request: &AuthenticationVerifyRequest,
    ) -> Result<AuthenticationVerdict, ApiError> {
        self.rp
            .authentication
            .verify(
                &self.session,
                request.username.as_deref(),
                &request.authentication,
            )
            .await
            .map_err(http_error)
    }
}

impl TestRp {
    pub fn orchestrator(&self, browser: &str) -> Arc<ClientCeremonyOrchestrator> {
        let api = InProcessApi {
            rp: self.rp.clone(),
            session: SessionId::new(browser),
        };
        Arc::new(ClientCeremonyOrchestrator::new(
            Arc::new(api),
            self.authenticator.clone(),
        ))
    }
}
