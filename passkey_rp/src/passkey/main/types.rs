//! WebAuthn JSON shapes exchanged with the browser.
//!
//! Field names follow the `PublicKeyCredential*JSON` dictionaries, so the
//! options can be passed to `navigator.credentials.*` after the usual
//! base64url → ArrayBuffer conversion and responses serialized with
//! `toJSON()` deserialize as-is.

use serde::{Deserialize, Serialize};

use crate::passkey::config::UserVerification;
use crate::passkey::types::{AuthenticatorTransport, Challenge};

pub(crate) const PUBLIC_KEY_TYPE: &str = "public-key";
pub(crate) const ALG_ES256: i64 = -7;
pub(crate) const ALG_RS256: i64 = -257;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingPartyEntity {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub type_: String,
    /// base64url credential id
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<AuthenticatorTransport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    pub resident_key: ResidentKeyRequirement,
    pub require_resident_key: bool,
    pub user_verification: UserVerification,
}

/// Argument for `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub challenge: Challenge,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// milliseconds
    pub timeout: u64,
    pub attestation: String,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Argument for `navigator.credentials.get()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub challenge: Challenge,
    pub timeout: u64,
    pub rp_id: String,
    /// Empty for the identifier-less flow.
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: UserVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    /// Raw strings; unknown values are dropped when the credential is stored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

/// Result of `navigator.credentials.create()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AttestationResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "type")]
    pub type_: String,
}

impl RegistrationResponse {
    pub fn transports(&self) -> Vec<AuthenticatorTransport> {
        self.response
            .transports
            .iter()
            .filter_map(|t| AuthenticatorTransport::parse(t))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

/// Result of `navigator.credentials.get()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    pub raw_id: String,
    pub response: AssertionResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "type")]
    pub type_: String,
}

/// Body of `POST /registration/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationVerifyRequest {
    pub username: String,
    pub registration: RegistrationResponse,
}

/// Body of `POST /authentication/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationVerifyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub authentication: AuthenticationResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationVerdict {
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationVerdict {
    pub verified: bool,
    pub username: String,
}
