use std::sync::LazyLock;

/// Cookie carrying the ceremony session id.
pub static SESSION_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    std::env::var("SESSION_COOKIE_NAME")
        .ok()
        .unwrap_or("__Host-PasskeySession".to_string())
});

pub static SESSION_COOKIE_MAX_AGE: LazyLock<u64> = LazyLock::new(|| {
    std::env::var("SESSION_COOKIE_MAX_AGE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(600) // 10 minutes
});

/// Random bytes in a minted session id.
pub(super) const SESSION_ID_LEN: usize = 32;
