use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use http::HeaderMap;
use serde::Deserialize;

use passkey_rp::{
    AuthenticationOptions, AuthenticationVerdict, AuthenticationVerifyRequest, CeremonyError,
    RegistrationOptions, RegistrationVerdict, RegistrationVerifyRequest, RelyingParty,
};

use crate::error::{ErrorResponse, IntoResponseError};
use crate::session::{existing_session, session_or_new};

pub(crate) fn router() -> Router<RelyingParty> {
    Router::new()
        .nest("/registration", router_registration())
        .nest("/authentication", router_authentication())
}

fn router_registration() -> Router<RelyingParty> {
    Router::new()
        .route("/generate-options", get(registration_options))
        .route("/verify", post(verify_registration))
}

fn router_authentication() -> Router<RelyingParty> {
    Router::new()
        .route("/generate-options", get(authentication_options))
        .route("/verify", post(verify_authentication))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsernameQuery {
    username: Option<String>,
}

fn query_username(
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<Option<String>, CeremonyError> {
    let Query(query) = query.map_err(|e| CeremonyError::InvalidInput(e.body_text()))?;
    Ok(query.username)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, CeremonyError> {
    let Json(body) = body.map_err(|e| {
        tracing::debug!("Rejected request body: {}", e.body_text());
        CeremonyError::InvalidInput(e.body_text())
    })?;
    Ok(body)
}

pub(crate) async fn registration_options(
    State(rp): State<RelyingParty>,
    request_headers: HeaderMap,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<(HeaderMap, Json<RegistrationOptions>), ErrorResponse> {
    let username = query_username(query)
        .and_then(|username| {
            username.ok_or_else(|| CeremonyError::InvalidInput("Username is required".to_string()))
        })
        .into_response_error()?;
    let (session_id, headers) = session_or_new(&request_headers).into_response_error()?;

    let options = rp
        .registration
        .generate_options(&session_id, &username)
        .await
        .into_response_error()?;

    Ok((headers, Json(options)))
}

pub(crate) async fn verify_registration(
    State(rp): State<RelyingParty>,
    request_headers: HeaderMap,
    body: Result<Json<RegistrationVerifyRequest>, JsonRejection>,
) -> Result<Json<RegistrationVerdict>, ErrorResponse> {
    let request = json_body(body).into_response_error()?;
    let session_id = existing_session(&request_headers).into_response_error()?;

    let verdict = rp
        .registration
        .verify(&session_id, &request.username, &request.registration)
        .await
        .into_response_error()?;

    Ok(Json(verdict))
}

pub(crate) async fn authentication_options(
    State(rp): State<RelyingParty>,
    request_headers: HeaderMap,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Result<(HeaderMap, Json<AuthenticationOptions>), ErrorResponse> {
    let username = query_username(query).into_response_error()?;
    let (session_id, headers) = session_or_new(&request_headers).into_response_error()?;

    let options = rp
        .authentication
        .generate_options(&session_id, username.as_deref())
        .await
        .into_response_error()?;

    Ok((headers, Json(options)))
}

pub(crate) async fn verify_authentication(
    State(rp): State<RelyingParty>,
    request_headers: HeaderMap,
    body: Result<Json<AuthenticationVerifyRequest>, JsonRejection>,
) -> Result<Json<AuthenticationVerdict>, ErrorResponse> {
    let request = json_body(body).into_response_error()?;
    let session_id = existing_session(&request_headers).into_response_error()?;

    let verdict = rp
        .authentication
        .verify(
            &session_id,
            request.username.as_deref(),
            &request.authentication,
        )
        .await
        .into_response_error()?;

    Ok(Json(verdict))
}
