//! COSE_Key parsing and signature checks for ES256 and RS256.

use ciborium::value::{Integer, Value as CborValue};
use ring::signature::{
    ECDSA_P256_SHA256_ASN1, RSA_PKCS1_2048_8192_SHA256, RsaPublicKeyComponents, UnparsedPublicKey,
};

use super::types::{ALG_ES256, ALG_RS256};
use crate::passkey::errors::VerificationError;

const KTY: i128 = 1;
const ALG: i128 = 3;
const KTY_EC2: i128 = 2;
const KTY_RSA: i128 = 3;
const CRV_P256: i128 = 1;

// EC2 parameters
const EC2_CRV: i128 = -1;
const EC2_X: i128 = -2;
const EC2_Y: i128 = -3;

// RSA parameters
const RSA_N: i128 = -1;
const RSA_E: i128 = -2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKey {
    Es256 { x: Vec<u8>, y: Vec<u8> },
    Rs256 { n: Vec<u8>, e: Vec<u8> },
}

impl CoseKey {
    /// Decodes one CBOR item from the front of `bytes`; returns the key and
    /// the number of bytes it occupied.
    pub(crate) fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize), VerificationError> {
        let mut reader = bytes;
        let value: CborValue = ciborium::de::from_reader(&mut reader)
            .map_err(|e| VerificationError::PublicKey(format!("Invalid CBOR: {e}")))?;
        let consumed = bytes.len() - reader.len();
        Ok((Self::from_value(&value)?, consumed))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, VerificationError> {
        let (key, consumed) = Self::decode_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(VerificationError::PublicKey(
                "Trailing bytes after COSE key".to_string(),
            ));
        }
        Ok(key)
    }

    fn from_value(value: &CborValue) -> Result<Self, VerificationError> {
        let CborValue::Map(entries) = value else {
            return Err(VerificationError::PublicKey("COSE key is not a map".into()));
        };

        let int_param = |label: i128| -> Option<i128> {
            match lookup(entries, label)? {
                CborValue::Integer(i) => Some(i128::from(*i)),
                _ => None,
            }
        };
        let bytes_param = |label: i128| -> Result<Vec<u8>, VerificationError> {
            match lookup(entries, label) {
                Some(CborValue::Bytes(b)) => Ok(b.clone()),
                _ => Err(VerificationError::PublicKey(format!(
                    "Missing key parameter {label}"
                ))),
            }
        };

        let alg = int_param(ALG)
            .ok_or_else(|| VerificationError::PublicKey("Missing alg".to_string()))?;

        match (int_param(KTY), alg) {
            (Some(KTY_EC2), a) if a == i128::from(ALG_ES256) => {
                if int_param(EC2_CRV) != Some(CRV_P256) {
                    return Err(VerificationError::PublicKey(
                        "Only the P-256 curve is supported".to_string(),
                    ));
                }
                let x = bytes_param(EC2_X)?;
                let y = bytes_param(EC2_Y)?;
                if x.len() != 32 || y.len() != 32 {
                    return Err(VerificationError::PublicKey(
                        "Invalid P-256 coordinate length".to_string(),
                    ));
                }
                Ok(Self::Es256 { x, y })
            }
            (Some(KTY_RSA), a) if a == i128::from(ALG_RS256) => Ok(Self::Rs256 {
                n: bytes_param(RSA_N)?,
                e: bytes_param(RSA_E)?,
            }),
            (kty, alg) => Err(VerificationError::PublicKey(format!(
                "Unsupported key type {kty:?} / algorithm {alg}"
            ))),
        }
    }

    pub fn algorithm(&self) -> i64 {
        match self {
            Self::Es256 { .. } => ALG_ES256,
            Self::Rs256 { .. } => ALG_RS256,
        }
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), VerificationError> {
        let result = match self {
            Self::Es256 { x, y } => {
                let mut point = Vec::with_capacity(65);
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, point).verify(message, signature)
            }
            Self::Rs256 { n, e } => RsaPublicKeyComponents { n, e }.verify(
                &RSA_PKCS1_2048_8192_SHA256,
                message,
                signature,
            ),
        };
        result.map_err(|_| VerificationError::Signature)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, VerificationError> {
        let int = |v: i64| CborValue::Integer(Integer::from(v));
        let entries = match self {
            Self::Es256 { x, y } => vec![
                (int(1), int(2)),
                (int(3), int(ALG_ES256)),
                (int(-1), int(1)),
                (int(-2), CborValue::Bytes(x.clone())),
                (int(-3), CborValue::Bytes(y.clone())),
            ],
            Self::Rs256 { n, e } => vec![
                (int(1), int(3)),
                (int(3), int(ALG_RS256)),
                (int(-1), CborValue::Bytes(n.clone())),
                (int(-2), CborValue::Bytes(e.clone())),
            ],
        };

        let mut out = Vec::new();
        ciborium::ser::into_writer(&CborValue::Map(entries), &mut out)
            .map_err(|e| VerificationError::PublicKey(format!("CBOR encoding failed: {e}")))?;
        Ok(out)
    }
}

fn lookup(entries: &[(CborValue, CborValue)], label: i128) -> Option<&CborValue> {
    entries.iter().find_map(|(k, v)| match k {
        CborValue::Integer(i) if i128::from(*i) == label => Some(v),
        _ => None,
    })
}
