use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::errors::ApiError;
use crate::passkey::{
    AuthenticationOptions, AuthenticationVerdict, AuthenticationVerifyRequest,
    RegistrationOptions, RegistrationVerdict, RegistrationVerifyRequest,
};

/// The four relying-party calls a client ceremony makes.
#[async_trait]
pub trait CeremonyApi: Send + Sync {
    async fn registration_options(&self, username: &str)
    -> Result<RegistrationOptions, ApiError>;

    async fn verify_registration(
        &self,
        request: &RegistrationVerifyRequest,
    ) -> Result<RegistrationVerdict, ApiError>;

    async fn authentication_options(
        &self,
        username: Option<&str>,
    ) -> Result<AuthenticationOptions, ApiError>;

    async fn verify_authentication(
        &self,
        request: &AuthenticationVerifyRequest,
    ) -> Result<AuthenticationVerdict, ApiError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`CeremonyApi`] over HTTP.
///
/// The client keeps a cookie store, so the session cookie set on the options
/// call goes back with the verify call and both land in the same challenge
/// slot.
pub struct HttpCeremonyApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCeremonyApi {
    /// `base_url` is the mount point, e.g. `https://example.com/web-authn`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(client, base_url)
    }

    /// `client` must have a cookie store enabled for the ceremonies to
    /// share a session.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Transport(format!("Invalid base url {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("Invalid endpoint {path}: {e}")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("Request failed with status {status}"));
        tracing::debug!("Server answered {}: {}", status, message);
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CeremonyApi for HttpCeremonyApi {
    async fn registration_options(
        &self,
        username: &str,
    ) -> Result<RegistrationOptions, ApiError> {
        let url = self.endpoint("registration/generate-options")?;
        self.send(self.client.get(url).query(&[("username", username)]))
            .await
    }

    async fn verify_registration(
        &self,
        request: &RegistrationVerifyRequest,
    ) -> Result<RegistrationVerdict, ApiError> {
        let url = self.endpoint("registration/verify")?;
        self.send(self.client.post(url).json(request)).await
    }

    async fn authentication_options(
        &self,
        username: Option<&str>,
    ) -> Result<AuthenticationOptions, ApiError> {
        let url = self.endpoint("authentication/generate-options")?;
        let request = match username {
            Some(name) => self.client.get(url).query(&[("username", name)]),
            None => self.client.get(url),
        };
        self.send(request).await
    }

    async fn verify_authentication(
        &self,
        request: &AuthenticationVerifyRequest,
    ) -> Result<AuthenticationVerdict, ApiError> {
        let url = self.endpoint("authentication/verify")?;
        self.send(self.client.post(url).json(request)).await
    }
}
