//! passkey_rp_axum - Axum handlers for the passkey_rp relying party
//!
//! Serves registration and authentication ceremonies over HTTP and carries
//! the session cookie that binds options to their verify call.

mod error;
mod passkey;
mod router;
mod session;

pub use error::{ErrorBody, ErrorResponse, IntoResponseError};
pub use router::{passkey_router, passkey_router_no_trace};

// Re-export the route prefix and relying party from the passkey_rp crate
pub use passkey_rp::{PASSKEY_ROUTE_PREFIX, RelyingParty, relying_party_from_env};
