mod memory;
mod redis;
mod types;

pub use memory::InMemoryChallengeStore;
pub use self::redis::RedisChallengeStore;
pub use types::{ChallengeSessionStore, PendingChallenge};
