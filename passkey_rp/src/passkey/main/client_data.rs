use serde::{Deserialize, Serialize};

use crate::passkey::errors::VerificationError;
use crate::passkey::types::Challenge;
use crate::utils::base64url_decode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CeremonyType {
    Create,
    Get,
}

impl CeremonyType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

/// `CollectedClientData` as serialized by the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectedClientData {
    #[serde(rename = "type")]
    pub(crate) type_: String,
    pub(crate) challenge: String,
    pub(crate) origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) cross_origin: Option<bool>,
}

#[derive(Debug)]
pub(crate) struct ParsedClientData {
    pub(crate) data: CollectedClientData,
    /// Bytes the authenticator hashed into the signature.
    pub(crate) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(crate) fn from_base64(client_data_json: &str) -> Result<Self, VerificationError> {
        let raw_data = base64url_decode(client_data_json)?;
        let data: CollectedClientData = serde_json::from_slice(&raw_data)
            .map_err(|e| VerificationError::ClientData(format!("Invalid JSON: {e}")))?;
        Ok(Self { data, raw_data })
    }

    pub(crate) fn verify(
        &self,
        ceremony: CeremonyType,
        challenge: &Challenge,
        origin: &str,
    ) -> Result<(), VerificationError> {
        if self.data.type_ != ceremony.as_str() {
            return Err(VerificationError::ClientData(format!(
                "Invalid type. Expected '{}', Got: {}",
                ceremony.as_str(),
                self.data.type_
            )));
        }

        let signed_challenge = base64url_decode(&self.data.challenge)
            .map_err(|_| VerificationError::ChallengeMismatch)?;
        if !challenge.matches(&signed_challenge) {
            tracing::debug!(
                "Challenge mismatch: expected {}, got {}",
                challenge.to_base64url(),
                self.data.challenge
            );
            return Err(VerificationError::ChallengeMismatch);
        }

        if self.data.origin != origin {
            return Err(VerificationError::OriginMismatch {
                expected: origin.to_string(),
                actual: self.data.origin.clone(),
            });
        }

        if self.data.cross_origin == Some(true) {
            return Err(VerificationError::ClientData(
                "Cross-origin ceremonies are not accepted".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn hash(&self) -> Vec<u8> {
        crate::utils::sha256(&self.raw_data)
    }
}
