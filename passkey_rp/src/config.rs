//! Crate-wide configuration shared by the HTTP integration.

use std::sync::LazyLock;

const DEFAULT_ROUTE_PREFIX: &str = "/web-authn";

/// Prefix under which the four WebAuthn endpoints are mounted.
///
/// Default: "/web-authn"
pub static PASSKEY_ROUTE_PREFIX: LazyLock<String> =
    LazyLock::new(|| route_prefix(std::env::var("PASSKEY_ROUTE_PREFIX").ok()));

/// An unset or empty value falls back to the default.
fn route_prefix(value: Option<String>) -> String {
    value
        .filter(|prefix| !prefix.is_empty())
        .unwrap_or_else(|| DEFAULT_ROUTE_PREFIX.to_string())
}
