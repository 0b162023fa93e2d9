mod attestation;
mod auth;
mod authenticator_data;
mod client_data;
mod cose;
mod register;
mod relying_party;
mod types;
mod verifier;

pub use auth::AuthenticationCeremony;
pub use cose::CoseKey;
pub use register::RegistrationCeremony;
pub use relying_party::RelyingParty;
pub use types::{
    AssertionResponse, AttestationResponse, AuthenticationOptions, AuthenticationResponse,
    AuthenticationVerdict, AuthenticationVerifyRequest, AuthenticatorSelection,
    CredentialDescriptor, PubKeyCredParam, RegistrationOptions, RegistrationResponse,
    RegistrationVerdict, RegistrationVerifyRequest, RelyingPartyEntity, ResidentKeyRequirement,
    UserEntity,
};
pub use verifier::{
    ExpectedCeremony, ResponseVerifier, VerifiedAuthentication, VerifiedRegistration,
    WebAuthnVerifier,
};

pub(crate) use attestation::encode_none_attestation;
pub(crate) use authenticator_data::{encode_authenticator_data, flags};
pub(crate) use client_data::{CeremonyType, CollectedClientData};
pub(crate) use types::{ALG_ES256, PUBLIC_KEY_TYPE};
