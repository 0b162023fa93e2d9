mod config;
mod errors;
mod main;
mod types;

pub use config::{ConfigError, PasskeyConfig, UserVerification};
pub use errors::{CeremonyError, VerificationError};
pub use types::{AuthenticatorTransport, CHALLENGE_LEN, Challenge, Credential, User};

pub use main::{
    AssertionResponse, AttestationResponse, AuthenticationCeremony, AuthenticationOptions,
    AuthenticationResponse, AuthenticationVerdict, AuthenticationVerifyRequest,
    AuthenticatorSelection, CoseKey, CredentialDescriptor, ExpectedCeremony, PubKeyCredParam,
    RegistrationCeremony, RegistrationOptions, RegistrationResponse, RegistrationVerdict,
    RegistrationVerifyRequest, RelyingParty, RelyingPartyEntity, ResidentKeyRequirement,
    ResponseVerifier, UserEntity, VerifiedAuthentication, VerifiedRegistration,
    WebAuthnVerifier,
};

pub(crate) use main::{
    ALG_ES256, CeremonyType, CollectedClientData, PUBLIC_KEY_TYPE, encode_authenticator_data,
    encode_none_attestation, flags,
};
