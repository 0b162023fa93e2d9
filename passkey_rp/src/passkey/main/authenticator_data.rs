use super::cose::CoseKey;
use crate::passkey::errors::VerificationError;
use crate::utils::sha256;

/// Flags for AuthenticatorData as defined in WebAuthn spec Level 2
pub(crate) mod flags {
    /// User Present (UP) - Bit 0
    pub(crate) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(crate) const UV: u8 = 1 << 2;
    /// Backup Eligibility (BE) - Bit 3
    pub(crate) const BE: u8 = 1 << 3;
    /// Backup State (BS) - Bit 4
    pub(crate) const BS: u8 = 1 << 4;
    /// Attested Credential Data Present - Bit 6
    pub(crate) const AT: u8 = 1 << 6;
    /// Extension Data Present - Bit 7
    pub(crate) const ED: u8 = 1 << 7;
}

const RP_ID_HASH_LEN: usize = 32;
const MIN_LEN: usize = 37;
const AAGUID_LEN: usize = 16;

#[derive(Debug)]
pub(crate) struct AuthenticatorData {
    pub(crate) rp_id_hash: Vec<u8>,
    pub(crate) flags: u8,
    pub(crate) counter: u32,
    pub(crate) raw_data: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct AttestedCredentialData {
    pub(crate) aaguid: Vec<u8>,
    pub(crate) credential_id: Vec<u8>,
    /// COSE_Key bytes as they appear in the authenticator data
    pub(crate) public_key: Vec<u8>,
    pub(crate) key: CoseKey,
}

impl AuthenticatorData {
    /// Layout (minimum 37 bytes):
    /// - RP ID Hash (32 bytes)
    /// - Flags (1 byte)
    /// - Counter (4 bytes, big endian)
    /// - Optional: Attested Credential Data
    /// - Optional: Extensions
    pub(crate) fn from_bytes(data: Vec<u8>) -> Result<Self, VerificationError> {
        if data.len() < MIN_LEN {
            return Err(VerificationError::AuthenticatorData(format!(
                "Authenticator data too short: {} bytes",
                data.len()
            )));
        }

        Ok(Self {
            rp_id_hash: data[..RP_ID_HASH_LEN].to_vec(),
            flags: data[32],
            counter: u32::from_be_bytes([data[33], data[34], data[35], data[36]]),
            raw_data: data,
        })
    }

    pub(crate) fn has_flag(&self, flag: u8) -> bool {
        (self.flags & flag) != 0
    }

    pub(crate) fn verify(&self, rp_id: &str, require_uv: bool) -> Result<(), VerificationError> {
        if self.rp_id_hash != sha256(rp_id.as_bytes()) {
            return Err(VerificationError::AuthenticatorData(
                "Invalid RP ID hash".to_string(),
            ));
        }

        if !self.has_flag(flags::UP) {
            return Err(VerificationError::UserNotPresent);
        }

        if require_uv && !self.has_flag(flags::UV) {
            return Err(VerificationError::UserNotVerified);
        }

        tracing::debug!(
            "Authenticator data ok: uv={} be={} bs={} at={} ed={} counter={}",
            self.has_flag(flags::UV),
            self.has_flag(flags::BE),
            self.has_flag(flags::BS),
            self.has_flag(flags::AT),
            self.has_flag(flags::ED),
            self.counter
        );
        Ok(())
    }

    /// Parses the attested credential data that follows the fixed header.
    pub(crate) fn attested_credential_data(
        &self,
    ) -> Result<AttestedCredentialData, VerificationError> {
        if !self.has_flag(flags::AT) {
            return Err(VerificationError::AuthenticatorData(
                "No attested credential data".to_string(),
            ));
        }

        let data = &self.raw_data;
        let id_len_at = MIN_LEN + AAGUID_LEN;
        if data.len() < id_len_at + 2 {
            return Err(VerificationError::AuthenticatorData(
                "Attested credential data too short".to_string(),
            ));
        }

        let aaguid = data[MIN_LEN..id_len_at].to_vec();
        let id_len = usize::from(u16::from_be_bytes([data[id_len_at], data[id_len_at + 1]]));
        let id_start = id_len_at + 2;
        let key_start = id_start + id_len;
        if id_len == 0 || data.len() <= key_start {
            return Err(VerificationError::AuthenticatorData(
                "Invalid credential id length".to_string(),
            ));
        }

        let (key, key_len) = CoseKey::decode_prefix(&data[key_start..])?;
        let key_end = key_start + key_len;
        if key_end != data.len() && !self.has_flag(flags::ED) {
            return Err(VerificationError::AuthenticatorData(
                "Unexpected trailing bytes".to_string(),
            ));
        }

        Ok(AttestedCredentialData {
            aaguid,
            credential_id: data[id_start..key_start].to_vec(),
            public_key: data[key_start..key_end].to_vec(),
            key,
        })
    }
}

/// Serializes authenticator data. Used by the software authenticator.
pub(crate) fn encode_authenticator_data(
    rp_id: &str,
    flags: u8,
    counter: u32,
    attested: Option<(&[u8], &[u8])>,
) -> Vec<u8> {
    let mut out = sha256(rp_id.as_bytes());
    out.push(flags);
    out.extend_from_slice(&counter.to_be_bytes());
    if let Some((credential_id, public_key)) = attested {
        out.extend_from_slice(&[0u8; AAGUID_LEN]);
        out.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        out.extend_from_slice(credential_id);
        out.extend_from_slice(public_key);
    }
    out
}
