mod config;
mod cookie;
mod types;

pub use config::{SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME};
pub use cookie::{issue_session_cookie, session_id_from_headers};
pub use types::SessionId;
