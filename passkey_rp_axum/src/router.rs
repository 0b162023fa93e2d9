//! Router for the four WebAuthn endpoints

use axum::Router;
use passkey_rp::RelyingParty;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Create a router for the passkey ceremonies
///
/// Mount it at [`PASSKEY_ROUTE_PREFIX`](passkey_rp::PASSKEY_ROUTE_PREFIX). The
/// endpoints will be available at:
/// - {PASSKEY_ROUTE_PREFIX}/registration/generate-options
/// - {PASSKEY_ROUTE_PREFIX}/registration/verify
/// - {PASSKEY_ROUTE_PREFIX}/authentication/generate-options
/// - {PASSKEY_ROUTE_PREFIX}/authentication/verify
pub fn passkey_router(rp: RelyingParty) -> Router {
    passkey_router_no_trace(rp).layer(
        TraceLayer::new_for_http()
            // Headers stay out of the span: the Cookie header carries the session id.
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`passkey_router`] without the HTTP tracing middleware.
pub fn passkey_router_no_trace(rp: RelyingParty) -> Router {
    super::passkey::router().with_state(rp)
}
