use async_trait::async_trait;
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use tokio::sync::{Mutex, Notify};
use url::Url;

use super::errors::PlatformError;
use super::platform::{Mediation, PlatformAuthenticator};
use crate::passkey::{
    ALG_ES256, AssertionResponse, AttestationResponse, AuthenticationOptions,
    AuthenticationResponse, CeremonyType, Challenge, CollectedClientData, CoseKey,
    CredentialDescriptor, PUBLIC_KEY_TYPE, RegistrationOptions, RegistrationResponse,
    encode_authenticator_data, encode_none_attestation, flags,
};
use crate::utils::{base64url_decode, base64url_encode, gen_random_bytes, sha256};

const CREDENTIAL_ID_LEN: usize = 32;

struct SoftCredential {
    id: Vec<u8>,
    rp_id: String,
    user_handle: String,
    key: EcdsaKeyPair,
    counter: u32,
}

/// In-process platform authenticator holding ES256 discoverable credentials.
///
/// Produces the same JSON a browser hands to the page: `none` attestation on
/// registration and P-256 signatures over `authData || SHA-256(clientDataJSON)`
/// on assertion. Used by the tests and the demo's self-check.
pub struct SoftAuthenticator {
    origin: String,
    rng: SystemRandom,
    credentials: Mutex<Vec<SoftCredential>>,
    counter_step: u32,
    pending_failure: Mutex<Option<PlatformError>>,
    autofill: Notify,
}

impl SoftAuthenticator {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            rng: SystemRandom::new(),
            credentials: Mutex::new(Vec::new()),
            counter_step: 1,
            pending_failure: Mutex::new(None),
            autofill: Notify::new(),
        }
    }

    /// Amount added to a credential's counter per assertion. Zero mimics
    /// authenticators that do not implement a counter.
    pub fn with_counter_step(mut self, step: u32) -> Self {
        self.counter_step = step;
        self
    }

    /// Makes the next prompt fail with `err`.
    pub async fn fail_next(&self, err: PlatformError) {
        *self.pending_failure.lock().await = Some(err);
    }

    /// Simulates the user choosing a passkey from the autofill dropdown.
    pub fn pick_autofill(&self) {
        self.autofill.notify_one();
    }

    /// Resets every credential's counter, as a cloned authenticator would.
    pub async fn rewind_counters(&self, value: u32) {
        for credential in self.credentials.lock().await.iter_mut() {
            credential.counter = value;
        }
    }

    pub async fn credential_ids(&self) -> Vec<Vec<u8>> {
        self.credentials
            .lock()
            .await
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    /// Copy of `response` whose client data carries `challenge` instead.
    /// `none` attestation signs nothing, so the rest stays valid.
    pub fn resign_registration(
        &self,
        response: &RegistrationResponse,
        challenge: &Challenge,
    ) -> Result<RegistrationResponse, PlatformError> {
        let mut response = response.clone();
        response.response.client_data_json =
            self.client_data(CeremonyType::Create, challenge, None)?;
        Ok(response)
    }

    fn client_data(
        &self,
        ceremony: CeremonyType,
        challenge: &Challenge,
        rp_id: Option<&str>,
    ) -> Result<String, PlatformError> {
        if let Some(rp_id) = rp_id {
            self.check_rp_id(rp_id)?;
        }
        let data = CollectedClientData {
            type_: ceremony.as_str().to_string(),
            challenge: challenge.to_base64url(),
            origin: self.origin.clone(),
            cross_origin: Some(false),
        };
        let json = serde_json::to_vec(&data).map_err(|e| PlatformError::Other(e.to_string()))?;
        Ok(base64url_encode(&json))
    }

    /// The RP id must be the origin's host or a registrable suffix of it.
    fn check_rp_id(&self, rp_id: &str) -> Result<(), PlatformError> {
        let origin = Url::parse(&self.origin)
            .map_err(|e| PlatformError::Security(format!("Invalid origin: {e}")))?;
        let host = origin
            .host_str()
            .ok_or_else(|| PlatformError::Security("Origin has no host".to_string()))?;
        if host == rp_id || host.ends_with(&format!(".{rp_id}")) {
            Ok(())
        } else {
            Err(PlatformError::Security(format!(
                "RP id {rp_id} is not valid for origin {}",
                self.origin
            )))
        }
    }

    async fn take_failure(&self) -> Result<(), PlatformError> {
        match self.pending_failure.lock().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn listed(descriptors: &[CredentialDescriptor], id: &[u8]) -> bool {
    descriptors
        .iter()
        .filter_map(|d| base64url_decode(&d.id).ok())
        .any(|listed| listed == id)
}

fn other(err: impl std::fmt::Display) -> PlatformError {
    PlatformError::Other(err.to_string())
}

#[async_trait]
impl PlatformAuthenticator for SoftAuthenticator {
    async fn create_credential(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationResponse, PlatformError> {
        self.take_failure().await?;

        if !options
            .pub_key_cred_params
            .iter()
            .any(|p| p.type_ == PUBLIC_KEY_TYPE && p.alg == ALG_ES256)
        {
            return Err(PlatformError::NotAllowed);
        }

        let rp_id = options.rp.id.as_str();
        let client_data_json =
            self.client_data(CeremonyType::Create, &options.challenge, Some(rp_id))?;

        let mut credentials = self.credentials.lock().await;
        if credentials
            .iter()
            .any(|c| c.rp_id == rp_id && listed(&options.exclude_credentials, &c.id))
        {
            return Err(PlatformError::InvalidState);
        }

        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.rng)
            .map_err(|_| other("Key generation failed"))?;
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &self.rng)
            .map_err(|e| other(format!("Invalid key: {e}")))?;

        // Uncompressed point: 0x04 || x || y
        let point = key.public_key().as_ref();
        let cose_key = CoseKey::Es256 {
            x: point[1..33].to_vec(),
            y: point[33..65].to_vec(),
        }
        .to_cbor()
        .map_err(other)?;

        let id = gen_random_bytes(CREDENTIAL_ID_LEN).map_err(other)?;
        let auth_data = encode_authenticator_data(
            rp_id,
            flags::UP | flags::UV | flags::AT,
            0,
            Some((id.as_slice(), cose_key.as_slice())),
        );
        let attestation_object = encode_none_attestation(&auth_data).map_err(other)?;

        credentials.push(SoftCredential {
            id: id.clone(),
            rp_id: rp_id.to_string(),
            user_handle: options.user.id.clone(),
            key,
            counter: 0,
        });

        let encoded_id = base64url_encode(&id);
        Ok(RegistrationResponse {
            id: encoded_id.clone(),
            raw_id: encoded_id,
            response: AttestationResponse {
                client_data_json,
                attestation_object: base64url_encode(&attestation_object),
                transports: vec!["internal".to_string()],
            },
            authenticator_attachment: Some("platform".to_string()),
            client_extension_results: serde_json::Map::new(),
            type_: PUBLIC_KEY_TYPE.to_string(),
        })
    }

    async fn get_assertion(
        &self,
        options: &AuthenticationOptions,
        mediation: Mediation,
    ) -> Result<AuthenticationResponse, PlatformError> {
        self.take_failure().await?;

        if mediation == Mediation::Conditional {
            self.autofill.notified().await;
        }

        let rp_id = options.rp_id.as_str();
        let client_data_json =
            self.client_data(CeremonyType::Get, &options.challenge, Some(rp_id))?;

        let mut credentials = self.credentials.lock().await;
        // Most recently created wins when several are discoverable.
        let credential = credentials
            .iter_mut()
            .rev()
            .filter(|c| c.rp_id == rp_id)
            .find(|c| options.allow_credentials.is_empty() || listed(&options.allow_credentials, &c.id))
            .ok_or(PlatformError::NotAllowed)?;

        credential.counter = credential.counter.wrapping_add(self.counter_step);
        let auth_data =
            encode_authenticator_data(rp_id, flags::UP | flags::UV, credential.counter, None);

        let client_data = base64url_decode(&client_data_json).map_err(other)?;
        let mut message = auth_data.clone();
        message.extend_from_slice(&sha256(&client_data));
        let signature = credential
            .key
            .sign(&self.rng, &message)
            .map_err(|_| other("Signing failed"))?;

        let encoded_id = base64url_encode(&credential.id);
        Ok(AuthenticationResponse {
            id: encoded_id.clone(),
            raw_id: encoded_id,
            response: AssertionResponse {
                client_data_json,
                authenticator_data: base64url_encode(&auth_data),
                signature: base64url_encode(signature.as_ref()),
                user_handle: Some(credential.user_handle.clone()),
            },
            authenticator_attachment: Some("platform".to_string()),
            client_extension_results: serde_json::Map::new(),
            type_: PUBLIC_KEY_TYPE.to_string(),
        })
    }
}
