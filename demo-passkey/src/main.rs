mod server;

use std::env;
use std::sync::Arc;

use axum::{Router, routing::get};
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::CorsLayer;

use passkey_rp::{
    CeremonyOutcome, ClientCeremonyOrchestrator, HttpCeremonyApi, RelyingParty,
    SoftAuthenticator,
};
use passkey_rp_axum::{PASSKEY_ROUTE_PREFIX, passkey_router, relying_party_from_env};

use server::{init_tracing, spawn_http_server, spawn_https_server};

const DEFAULT_PORT: u16 = 3001;

async fn index() -> &'static str {
    "Passkey relying party is running"
}

fn cors(rp: &RelyingParty) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);
    match HeaderValue::from_str(&rp.config().origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Origin is not a valid header value, CORS disabled: {}", e);
            layer
        }
    }
}

/// Registers and signs in a throwaway user through the plain HTTP listener
/// with a software authenticator.
async fn self_check(rp: &RelyingParty, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = format!("http://127.0.0.1:{port}{}", PASSKEY_ROUTE_PREFIX.as_str());
    let client = ClientCeremonyOrchestrator::new(
        Arc::new(HttpCeremonyApi::new(&base_url)?),
        Arc::new(SoftAuthenticator::new(&rp.config().origin)),
    );

    let username = "self-check";
    for outcome in [
        client.register(username).await,
        client.authenticate(Some(username)).await,
        client.authenticate(None).await,
    ] {
        match outcome {
            CeremonyOutcome::Success { username } => {
                tracing::info!("Self-check ceremony succeeded for {}", username)
            }
            other => return Err(format!("Self-check failed: {other:?}").into()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install default CryptoProvider for rustls to prevent errors
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    init_tracing("demo-passkey");

    let rp = relying_party_from_env().await?;

    let app = Router::new()
        .route("/", get(index))
        .nest(PASSKEY_ROUTE_PREFIX.as_str(), passkey_router(rp.clone()))
        .layer(cors(&rp));

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let http_server = spawn_http_server(port, app.clone());

    let https_server = match (env::var("TLS_CERT_PATH"), env::var("TLS_KEY_PATH")) {
        (Ok(cert), Ok(key)) => {
            let https_port = env::var("HTTPS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(port.saturating_add(442));
            Some(spawn_https_server(https_port, app, &cert, &key).await?)
        }
        _ => {
            tracing::info!("TLS_CERT_PATH/TLS_KEY_PATH not set, serving plain HTTP only");
            None
        }
    };

    if env::var("PASSKEY_DEMO_SELF_CHECK").is_ok_and(|v| v == "true") {
        // Give the listener a moment to bind.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        self_check(&rp, port).await?;
    }

    match https_server {
        Some(https_server) => {
            tokio::try_join!(http_server, https_server)?;
        }
        None => http_server.await?,
    }
    Ok(())
}
