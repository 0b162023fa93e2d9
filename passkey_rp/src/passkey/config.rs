use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u32 = 60;
const DEFAULT_CHALLENGE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid origin {0}: {1}")]
    InvalidOrigin(String, String),
}

/// WebAuthn `userVerification` requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

impl UserVerification {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "required" => Some(Self::Required),
            "preferred" => Some(Self::Preferred),
            "discouraged" => Some(Self::Discouraged),
            _ => None,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Relying-party parameters used by both ceremonies.
#[derive(Debug, Clone)]
pub struct PasskeyConfig {
    /// Serialized origin, e.g. `https://example.com:3443`.
    pub origin: String,
    /// Effective domain of `origin`.
    pub rp_id: String,
    pub rp_name: String,
    /// Ceremony timeout advertised to the client.
    pub timeout_secs: u32,
    /// Lifetime of an issued challenge.
    pub challenge_timeout_secs: u64,
    pub user_verification: UserVerification,
}

impl PasskeyConfig {
    pub fn new(origin: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(origin)
            .map_err(|e| ConfigError::InvalidOrigin(origin.to_string(), e.to_string()))?;
        let rp_id = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidOrigin(origin.to_string(), "no host".to_string()))?
            .to_string();
        let origin = url.origin().ascii_serialization();

        Ok(Self {
            rp_name: origin.clone(),
            origin,
            rp_id,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            challenge_timeout_secs: DEFAULT_CHALLENGE_TIMEOUT_SECS,
            user_verification: UserVerification::default(),
        })
    }

    /// Reads `ORIGIN`, `PASSKEY_RP_NAME`, `PASSKEY_TIMEOUT`,
    /// `PASSKEY_CHALLENGE_TIMEOUT` and `PASSKEY_USER_VERIFICATION`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let origin = env::var("ORIGIN").map_err(|_| ConfigError::Missing("ORIGIN"))?;
        let mut config = Self::new(&origin)?;

        if let Ok(name) = env::var("PASSKEY_RP_NAME") {
            config.rp_name = name;
        }
        config.timeout_secs = env_number("PASSKEY_TIMEOUT", DEFAULT_TIMEOUT_SECS);
        config.challenge_timeout_secs =
            env_number("PASSKEY_CHALLENGE_TIMEOUT", DEFAULT_CHALLENGE_TIMEOUT_SECS);
        config.user_verification = match env::var("PASSKEY_USER_VERIFICATION").ok() {
            None => UserVerification::default(),
            Some(v) => UserVerification::parse(&v).unwrap_or_else(|| {
                tracing::warn!("Invalid user verification: {}. Using default 'preferred'", v);
                UserVerification::default()
            }),
        };

        tracing::debug!("Passkey config: {:?}", config);
        Ok(config)
    }

    pub fn with_rp_name(mut self, rp_name: impl Into<String>) -> Self {
        self.rp_name = rp_name.into();
        self
    }

    pub fn with_challenge_timeout(mut self, secs: u64) -> Self {
        self.challenge_timeout_secs = secs;
        self
    }

    pub fn with_user_verification(mut self, user_verification: UserVerification) -> Self {
        self.user_verification = user_verification;
        self
    }

    pub(crate) fn timeout_millis(&self) -> u64 {
        u64::from(self.timeout_secs) * 1000
    }
}

fn env_number<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Err(_) => default,
        Ok(v) => v.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}: {}. Using default {}", name, v, default);
            default
        }),
    }
}
