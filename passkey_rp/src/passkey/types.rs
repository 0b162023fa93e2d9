use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::utils::{UtilError, base64url_decode, base64url_encode, gen_random_bytes};

/// Number of random bytes in an issued challenge.
pub const CHALLENGE_LEN: usize = 32;
const MIN_CHALLENGE_LEN: usize = 16;

/// A registered account. `username` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Random UUID; also the WebAuthn user handle.
    pub id: String,
    pub username: String,
    pub credentials: Vec<Credential>,
}

impl User {
    pub fn new(username: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            credentials: Vec::new(),
        }
    }

    pub fn credential(&self, credential_id: &[u8]) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.id == credential_id)
    }

    /// The user handle as sent to authenticators.
    pub fn user_handle(&self) -> String {
        base64url_encode(self.id.as_bytes())
    }
}

/// A public-key credential bound to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Vec<u8>,
    /// COSE_Key bytes exactly as found in the attested credential data
    pub public_key: Vec<u8>,
    pub sign_counter: u32,
    pub transports: BTreeSet<AuthenticatorTransport>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        id: Vec<u8>,
        public_key: Vec<u8>,
        sign_counter: u32,
        transports: impl IntoIterator<Item = AuthenticatorTransport>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            public_key,
            sign_counter,
            transports: transports.into_iter().collect(),
            created_at: now,
            last_used_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    SmartCard,
    Hybrid,
    Internal,
    Cable,
}

impl AuthenticatorTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usb => "usb",
            Self::Nfc => "nfc",
            Self::Ble => "ble",
            Self::SmartCard => "smart-card",
            Self::Hybrid => "hybrid",
            Self::Internal => "internal",
            Self::Cable => "cable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "usb" => Some(Self::Usb),
            "nfc" => Some(Self::Nfc),
            "ble" => Some(Self::Ble),
            "smart-card" => Some(Self::SmartCard),
            "hybrid" => Some(Self::Hybrid),
            "internal" => Some(Self::Internal),
            "cable" => Some(Self::Cable),
            _ => None,
        }
    }
}

/// Random bytes the client must sign. Serialized as unpadded base64url.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Challenge(Vec<u8>);

impl Challenge {
    pub fn random() -> Result<Self, UtilError> {
        Ok(Self(gen_random_bytes(CHALLENGE_LEN)?))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, UtilError> {
        if bytes.len() < MIN_CHALLENGE_LEN {
            return Err(UtilError::Format(format!(
                "Challenge must be at least {MIN_CHALLENGE_LEN} bytes"
            )));
        }
        Ok(Self(bytes))
    }

    pub fn from_base64url(encoded: &str) -> Result<Self, UtilError> {
        Self::from_bytes(base64url_decode(encoded)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64url(&self) -> String {
        base64url_encode(&self.0)
    }

    /// Constant-time comparison against the bytes echoed back by the client.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        self.0.len() == candidate.len() && bool::from(self.0.as_slice().ct_eq(candidate))
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Challenge").field(&self.to_base64url()).finish()
    }
}

impl From<Challenge> for String {
    fn from(challenge: Challenge) -> Self {
        challenge.to_base64url()
    }
}

impl TryFrom<String> for Challenge {
    type Error = UtilError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base64url(&value)
    }
}
