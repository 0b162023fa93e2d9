use http::HeaderMap;
use passkey_rp::{CeremonyError, SessionId, issue_session_cookie, session_id_from_headers};

/// Session the request belongs to, minting one when the browser has none.
///
/// The returned headers carry the `Set-Cookie` for a freshly minted session
/// and are empty otherwise.
pub(crate) fn session_or_new(
    request_headers: &HeaderMap,
) -> Result<(SessionId, HeaderMap), CeremonyError> {
    let mut response_headers = HeaderMap::new();
    let session_id = match session_id_from_headers(request_headers) {
        Some(session_id) => session_id,
        None => {
            let session_id = issue_session_cookie(&mut response_headers)?;
            tracing::debug!("Started session {}", session_id);
            session_id
        }
    };
    Ok((session_id, response_headers))
}

/// Session of a verify request. Without one there can be no pending challenge.
pub(crate) fn existing_session(request_headers: &HeaderMap) -> Result<SessionId, CeremonyError> {
    session_id_from_headers(request_headers).ok_or_else(|| {
        tracing::debug!("Verify request without a session cookie");
        CeremonyError::ChallengeMissing
    })
}
