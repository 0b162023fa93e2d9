use http::header::{COOKIE, HeaderMap};

use super::config::{SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME, SESSION_ID_LEN};
use super::types::SessionId;
use crate::utils::{UtilError, gen_random_string, header_set_cookie};

/// Extracts the session id from the `Cookie` header, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    let cookie_name = SESSION_COOKIE_NAME.as_str();
    session_id_from_cookie_headers(headers, cookie_name)
}

fn session_id_from_cookie_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    let session_id = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| match value.to_str() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::debug!("Ignoring non-ASCII cookie header: {}", e);
                None
            }
        })
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|s| {
            let mut parts = s.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(k), Some(v)) if k == cookie_name && !v.is_empty() => Some(v),
                _ => None,
            }
        });

    if session_id.is_none() {
        tracing::debug!("No session cookie '{}' found in cookies", cookie_name);
    }
    session_id.map(SessionId::new)
}

/// Mints a fresh session id and appends its `Set-Cookie` header.
pub fn issue_session_cookie(headers: &mut HeaderMap) -> Result<SessionId, UtilError> {
    let session_id = SessionId::new(gen_random_string(SESSION_ID_LEN)?);
    let max_age = i64::try_from(*SESSION_COOKIE_MAX_AGE).unwrap_or(i64::MAX);
    header_set_cookie(
        headers,
        SESSION_COOKIE_NAME.as_str(),
        session_id.as_str(),
        max_age,
    )?;
    Ok(session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::SET_COOKIE;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_session_id_found_among_other_cookies() {
        let headers = headers_with_cookie("theme=dark; sid=abc123; lang=en");
        assert_eq!(
            session_id_from_cookie_headers(&headers, "sid"),
            Some(SessionId::new("abc123"))
        );
    }

    #[test]
    fn test_session_id_missing_or_empty() {
        assert_eq!(session_id_from_cookie_headers(&HeaderMap::new(), "sid"), None);
        let headers = headers_with_cookie("sid=; other=1");
        assert_eq!(session_id_from_cookie_headers(&headers, "sid"), None);
    }

    #[test]
    fn test_session_id_name_must_match_exactly() {
        let headers = headers_with_cookie("xsid=nope");
        assert_eq!(session_id_from_cookie_headers(&headers, "sid"), None);
    }

    #[test]
    fn test_issue_session_cookie_round_trips_through_headers() {
        let mut response_headers = HeaderMap::new();
        let session_id = issue_session_cookie(&mut response_headers).unwrap();

        let set_cookie = response_headers
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));

        let pair = set_cookie.split(';').next().unwrap();
        let request_headers = headers_with_cookie(pair);
        assert_eq!(session_id_from_headers(&request_headers), Some(session_id));
    }
}
