use std::sync::Arc;

use super::register::{credential_descriptors, validate_username};
use super::types::{AuthenticationOptions, AuthenticationResponse, AuthenticationVerdict};
use super::verifier::{ExpectedCeremony, ResponseVerifier};
use crate::passkey::config::PasskeyConfig;
use crate::passkey::errors::CeremonyError;
use crate::passkey::types::User;
use crate::session::SessionId;
use crate::storage::{ChallengeSessionStore, CredentialRepository};
use crate::utils::base64url_decode;

/// Issues request options and verifies assertions.
#[derive(Clone)]
pub struct AuthenticationCeremony {
    config: Arc<PasskeyConfig>,
    repository: Arc<dyn CredentialRepository>,
    challenges: Arc<dyn ChallengeSessionStore>,
    verifier: Arc<dyn ResponseVerifier>,
}

/// An empty or blank username counts as not supplied.
fn supplied_username(username: Option<&str>) -> Option<&str> {
    username.map(str::trim).filter(|name| !name.is_empty())
}

impl AuthenticationCeremony {
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

    /// With a username the options list that user's credentials; without one
    /// `allowCredentials` is empty and the authenticator offers its
    /// discoverable credentials.
    pub async fn generate_options(
        &self,
        session_id: &SessionId,
        username: Option<&str>,
    ) -> Result<AuthenticationOptions, CeremonyError> {
        let username = supplied_username(username);
        let allow_credentials = match username {
            Some(name) => {
                let name = validate_username(name)?;
                let user = self
                    .repository
                    .find_by_username(name)
                    .await?
                    .ok_or(CeremonyError::UserNotFound)?;
                credential_descriptors(&user)
            }
            None => Vec::new(),
        };

        let challenge = self.challenges.issue(session_id).await?;
        tracing::info!(
            "Authentication options issued ({})",
            username.map_or("identifier-less".to_string(), |n| format!("user {n}"))
        );

        Ok(AuthenticationOptions {
            challenge,
            timeout: self.config.timeout_millis(),
            rp_id: self.config.rp_id.clone(),
            allow_credentials,
            user_verification: self.config.user_verification,
        })
    }

    async fn resolve_user(
        &self,
        username: Option<&str>,
        credential_id: &[u8],
    ) -> Result<User, CeremonyError> {
        let user = match supplied_username(username) {
            Some(name) => {
                self.repository
                    .find_by_username(validate_username(name)?)
                    .await?
            }
            None => self.repository.find_by_credential_id(credential_id).await?,
        };
        user.ok_or(CeremonyError::UserNotFound)
    }

    /// Consumes the session's challenge, checks the assertion and advances
    /// the credential's signature counter.
    pub async fn verify(
        &self,
        session_id: &SessionId,
        username: Option<&str>,
        response: &AuthenticationResponse,
    ) -> Result<AuthenticationVerdict, CeremonyError> {
        let credential_id = base64url_decode(&response.raw_id)
            .map_err(|_| CeremonyError::InvalidInput("Credential id is invalid".to_string()))?;

        let user = self.resolve_user(username, &credential_id).await?;

        let challenge = self
            .challenges
            .consume(session_id)
            .await?
            .ok_or(CeremonyError::ChallengeMissing)?;

        let credential = user
            .credential(&credential_id)
            .ok_or(CeremonyError::CredentialNotRegistered)?;

        if let Some(handle) = &response.response.user_handle {
            if *handle != user.user_handle() {
                tracing::warn!("User handle mismatch for {}", user.username);
                return Err(
                    CeremonyError::VerificationFailed("User handle mismatch".to_string()).log(),
                );
            }
        }

        let expected = ExpectedCeremony {
            challenge: &challenge,
            origin: &self.config.origin,
            rp_id: &self.config.rp_id,
            require_user_verification: self.config.user_verification.is_required(),
        };
        let verified = self
            .verifier
            .verify_authentication(response, &expected, credential)
            .map_err(|e| CeremonyError::from(e).log())?;

        let stored = credential.sign_counter;
        if stored > 0 && verified.new_counter <= stored {
            return Err(CeremonyError::VerificationFailed(format!(
                "Counter value did not increase (stored {stored}, received {})",
                verified.new_counter
            ))
            .log());
        }

        if verified.verified {
            self.repository
                .update_counter(&credential_id, verified.new_counter)
                .await
                .map_err(|e| CeremonyError::from(e).log())?;
            tracing::info!("Authenticated {}", user.username);
        } else {
            tracing::warn!("Assertion for {} was not verified", user.username);
        }

        Ok(AuthenticationVerdict {
            verified: verified.verified,
            username: user.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Mediation, PlatformAuthenticator};
    use crate::passkey::Credential;
    use crate::passkey::errors::VerificationError;
    use crate::passkey::main::types::RegistrationResponse;
    use crate::passkey::main::verifier::{VerifiedAuthentication, VerifiedRegistration};
    use crate::test_utils::TestRp;

    async fn assertion(
        t: &TestRp,
        session: &SessionId,
        username: Option<&str>,
    ) -> AuthenticationResponse {
        let options = t
            .rp
            .authentication
            .generate_options(session, username)
            .await
            .unwrap();
        t.authenticator
            .get_assertion(&options, Mediation::Optional)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_alice_registers_then_authenticates() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();

        let options = t
            .rp
            .authentication
            .generate_options(&session, Some("alice"))
            .await
            .unwrap();
        assert_eq!(options.allow_credentials.len(), 1);
        assert_eq!(options.rp_id, "rp.example.com");

        let response = t
            .authenticator
            .get_assertion(&options, Mediation::Optional)
            .await
            .unwrap();
        let verdict = t
            .rp
            .authentication
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap();
        assert_eq!(
            verdict,
            AuthenticationVerdict {
                verified: true,
                username: "alice".to_string()
            }
        );

        let alice = t.repository.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(alice.credentials[0].sign_counter, 1);
    }

    #[tokio::test]
    async fn test_identifier_less_flow_resolves_user_from_credential() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();

        let options = t
            .rp
            .authentication
            .generate_options(&session, None)
            .await
            .unwrap();
        assert!(options.allow_credentials.is_empty());

        let response = t
            .authenticator
            .get_assertion(&options, Mediation::Optional)
            .await
            .unwrap();
        let verdict = t
            .rp
            .authentication
            .verify(&session, None, &response)
            .await
            .unwrap();
        assert_eq!(verdict.username, "alice");
    }

    #[tokio::test]
    async fn test_blank_username_takes_identifier_less_path() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();

        for blank in ["", "   "] {
            let options = t
                .rp
                .authentication
                .generate_options(&session, Some(blank))
                .await
                .unwrap();
            assert!(options.allow_credentials.is_empty());

            let response = t
                .authenticator
                .get_assertion(&options, Mediation::Optional)
                .await
                .unwrap();
            let verdict = t
                .rp
                .authentication
                .verify(&session, Some(blank), &response)
                .await
                .unwrap();
            assert_eq!(verdict.username, "alice");
        }
    }

    #[tokio::test]
    async fn test_unknown_user_gets_no_challenge() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        let err = t
            .rp
            .authentication
            .generate_options(&session, Some("bob"))
            .await
            .unwrap_err();
        assert_eq!(err, CeremonyError::UserNotFound);
        assert!(t.challenges.consume(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_assertion_is_single_use() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();

        let response = assertion(&t, &session, Some("alice")).await;
        t.rp
            .authentication
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap();
        let err = t
            .rp
            .authentication
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap_err();
        assert_eq!(err, CeremonyError::ChallengeMissing);
    }

    #[tokio::test]
    async fn test_unregistered_credential_is_rejected() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();
        t.repository.create_user("bob").await.unwrap();

        // Alice's assertion presented as bob.
        let response = assertion(&t, &session, None).await;
        let err = t
            .rp
            .authentication
            .verify(&session, Some("bob"), &response)
            .await
            .unwrap_err();
        assert_eq!(err, CeremonyError::CredentialNotRegistered);
    }

    #[tokio::test]
    async fn test_replayed_counter_is_rejected() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();

        let response = assertion(&t, &session, Some("alice")).await;
        t.rp
            .authentication
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap();

        t.authenticator.rewind_counters(0).await;
        let response = assertion(&t, &session, Some("alice")).await;
        let err = t
            .rp
            .authentication
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap_err();
        assert!(matches!(err, CeremonyError::VerificationFailed(_)));

        let alice = t.repository.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(alice.credentials[0].sign_counter, 1);
    }

    /// Accepts every response and reports a fixed counter.
    struct LenientVerifier(u32);

    impl ResponseVerifier for LenientVerifier {
        fn verify_registration(
            &self,
            _response: &RegistrationResponse,
            _expected: &ExpectedCeremony<'_>,
        ) -> Result<VerifiedRegistration, VerificationError> {
            Err(VerificationError::Signature)
        }

        fn verify_authentication(
            &self,
            _response: &AuthenticationResponse,
            _expected: &ExpectedCeremony<'_>,
            _credential: &Credential,
        ) -> Result<VerifiedAuthentication, VerificationError> {
            Ok(VerifiedAuthentication {
                verified: true,
                new_counter: self.0,
            })
        }
    }

    #[tokio::test]
    async fn test_counter_guard_applies_even_if_verifier_allows_it() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();
        t.repository
            .update_counter(&t.authenticator.credential_ids().await[0], 5)
            .await
            .unwrap();

        let lenient = AuthenticationCeremony::new(
            t.config.clone(),
            t.repository.clone(),
            t.challenges.clone(),
            Arc::new(LenientVerifier(5)),
        );
        let options = lenient
            .generate_options(&session, Some("alice"))
            .await
            .unwrap();
        let response = t
            .authenticator
            .get_assertion(&options, Mediation::Optional)
            .await
            .unwrap();
        let err = lenient
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap_err();
        assert!(matches!(err, CeremonyError::VerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_user_handle_must_match() {
        let t = TestRp::new();
        let session = SessionId::new("s1");
        t.register(&session, "alice").await.unwrap();

        let mut response = assertion(&t, &session, Some("alice")).await;
        response.response.user_handle = Some("c29tZW9uZS1lbHNl".to_string());
        let err = t
            .rp
            .authentication
            .verify(&session, Some("alice"), &response)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CeremonyError::VerificationFailed("User handle mismatch".to_string())
        );
    }
}
