use ciborium::value::Value as CborValue;

use crate::passkey::errors::VerificationError;
use crate::utils::base64url_decode;

pub(crate) const FMT_NONE: &str = "none";

#[derive(Debug)]
pub(crate) struct AttestationObject {
    pub(crate) fmt: String,
    pub(crate) auth_data: Vec<u8>,
    pub(crate) att_stmt: Vec<(CborValue, CborValue)>,
}

pub(crate) fn parse_attestation_object(
    attestation_base64: &str,
) -> Result<AttestationObject, VerificationError> {
    let bytes = base64url_decode(attestation_base64)?;
    let value: CborValue = ciborium::de::from_reader(bytes.as_slice())
        .map_err(|e| VerificationError::Attestation(format!("Invalid CBOR: {e}")))?;

    let CborValue::Map(entries) = value else {
        return Err(VerificationError::Attestation(
            "Attestation object is not a map".to_string(),
        ));
    };

    let mut fmt = None;
    let mut auth_data = None;
    let mut att_stmt = None;
    for (key, value) in entries {
        match (key, value) {
            (CborValue::Text(k), CborValue::Text(v)) if k == "fmt" => fmt = Some(v),
            (CborValue::Text(k), CborValue::Bytes(v)) if k == "authData" => auth_data = Some(v),
            (CborValue::Text(k), CborValue::Map(v)) if k == "attStmt" => att_stmt = Some(v),
            _ => {}
        }
    }

    match (fmt, auth_data, att_stmt) {
        (Some(fmt), Some(auth_data), Some(att_stmt)) => Ok(AttestationObject {
            fmt,
            auth_data,
            att_stmt,
        }),
        _ => Err(VerificationError::Attestation(
            "Missing fmt, authData or attStmt".to_string(),
        )),
    }
}

/// `none` attestation carries no statement; everything else is refused.
pub(crate) fn verify_none_attestation(
    attestation: &AttestationObject,
) -> Result<(), VerificationError> {
    if attestation.fmt != FMT_NONE {
        return Err(VerificationError::UnsupportedAttestation(
            attestation.fmt.clone(),
        ));
    }
    if !attestation.att_stmt.is_empty() {
        return Err(VerificationError::Attestation(
            "attStmt must be empty for none attestation".to_string(),
        ));
    }
    Ok(())
}

/// CBOR attestation object with `fmt: "none"`.
pub(crate) fn encode_none_attestation(auth_data: &[u8]) -> Result<Vec<u8>, VerificationError> {
    let object = CborValue::Map(vec![
        (
            CborValue::Text("fmt".to_string()),
            CborValue::Text(FMT_NONE.to_string()),
        ),
        (
            CborValue::Text("attStmt".to_string()),
            CborValue::Map(vec![]),
        ),
        (
            CborValue::Text("authData".to_string()),
            CborValue::Bytes(auth_data.to_vec()),
        ),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&object, &mut out)
        .map_err(|e| VerificationError::Attestation(format!("CBOR encoding failed: {e}")))?;
    Ok(out)
}
