use super::attestation::{parse_attestation_object, verify_none_attestation};
use super::authenticator_data::AuthenticatorData;
use super::client_data::{CeremonyType, ParsedClientData};
use super::cose::CoseKey;
use super::types::{AuthenticationResponse, PUBLIC_KEY_TYPE, RegistrationResponse};
use crate::passkey::errors::VerificationError;
use crate::passkey::types::{Challenge, Credential};
use crate::utils::base64url_decode;

/// What the relying party expects a response to be bound to.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedCeremony<'a> {
    pub challenge: &'a Challenge,
    pub origin: &'a str,
    pub rp_id: &'a str,
    pub require_user_verification: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRegistration {
    pub verified: bool,
    pub credential_id: Vec<u8>,
    /// COSE_Key bytes
    pub public_key: Vec<u8>,
    pub sign_counter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAuthentication {
    pub verified: bool,
    pub new_counter: u32,
}

/// Cryptographic checks the ceremonies delegate to.
pub trait ResponseVerifier: Send + Sync + 'static {
    fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &ExpectedCeremony<'_>,
    ) -> Result<VerifiedRegistration, VerificationError>;

    /// `credential` is the stored record the assertion claims to come from.
    fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &ExpectedCeremony<'_>,
        credential: &Credential,
    ) -> Result<VerifiedAuthentication, VerificationError>;
}

/// Built-in verifier: `none` attestation, ES256 and RS256 keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebAuthnVerifier;

impl WebAuthnVerifier {
    pub fn new() -> Self {
        Self
    }
}

fn check_credential_ids(id: &str, raw_id: &str, type_: &str) -> Result<Vec<u8>, VerificationError> {
    if type_ != PUBLIC_KEY_TYPE {
        return Err(VerificationError::Format(format!(
            "Unexpected credential type: {type_}"
        )));
    }
    if id != raw_id {
        return Err(VerificationError::Format(
            "Credential id and rawId differ".to_string(),
        ));
    }
    Ok(base64url_decode(raw_id)?)
}

impl ResponseVerifier for WebAuthnVerifier {
    fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &ExpectedCeremony<'_>,
    ) -> Result<VerifiedRegistration, VerificationError> {
        let raw_id = check_credential_ids(&response.id, &response.raw_id, &response.type_)?;

        let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
        client_data.verify(CeremonyType::Create, expected.challenge, expected.origin)?;

        let attestation = parse_attestation_object(&response.response.attestation_object)?;
        verify_none_attestation(&attestation)?;

        let auth_data = AuthenticatorData::from_bytes(attestation.auth_data)?;
        auth_data.verify(expected.rp_id, expected.require_user_verification)?;

        let attested = auth_data.attested_credential_data()?;
        if attested.credential_id != raw_id {
            return Err(VerificationError::AuthenticatorData(
                "Credential id does not match attested credential data".to_string(),
            ));
        }

        tracing::debug!(
            "Registration verified: alg {}, aaguid {:02x?}",
            attested.key.algorithm(),
            attested.aaguid
        );

        Ok(VerifiedRegistration {
            verified: true,
            credential_id: attested.credential_id,
            public_key: attested.public_key,
            sign_counter: auth_data.counter,
        })
    }

    fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &ExpectedCeremony<'_>,
        credential: &Credential,
    ) -> Result<VerifiedAuthentication, VerificationError> {
        let raw_id = check_credential_ids(&response.id, &response.raw_id, &response.type_)?;
        if raw_id != credential.id {
            return Err(VerificationError::Format(
                "Assertion is for a different credential".to_string(),
            ));
        }

        let client_data = ParsedClientData::from_base64(&response.response.client_data_json)?;
        client_data.verify(CeremonyType::Get, expected.challenge, expected.origin)?;

        let auth_data =
            AuthenticatorData::from_bytes(base64url_decode(&response.response.authenticator_data)?)?;
        auth_data.verify(expected.rp_id, expected.require_user_verification)?;

        let key = CoseKey::from_cbor(&credential.public_key)?;
        let signature = base64url_decode(&response.response.signature)?;
        let mut signed_data = auth_data.raw_data.clone();
        signed_data.extend_from_slice(&client_data.hash());
        key.verify(&signed_data, &signature)?;

        // Zero on both sides means the authenticator has no counter.
        let stored = credential.sign_counter;
        let received = auth_data.counter;
        if (received != 0 || stored != 0) && received <= stored {
            return Err(VerificationError::CounterRegression { stored, received });
        }

        Ok(VerifiedAuthentication {
            verified: true,
            new_counter: received,
        })
    }
}
