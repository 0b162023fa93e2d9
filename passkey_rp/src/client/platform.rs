use async_trait::async_trait;

use super::errors::PlatformError;
use crate::passkey::{
    AuthenticationOptions, AuthenticationResponse, RegistrationOptions, RegistrationResponse,
};

/// How the assertion prompt is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mediation {
    /// Modal prompt.
    Optional,
    /// Offered through form autofill; resolves only once the user picks a passkey.
    Conditional,
}

/// The browser/OS authenticator (`navigator.credentials`).
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    async fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationResponse, PlatformError>;

    async fn get_assertion(
        &self,
        options: &AuthenticationOptions,
        mediation: Mediation,
    ) -> Result<AuthenticationResponse, PlatformError>;
}
