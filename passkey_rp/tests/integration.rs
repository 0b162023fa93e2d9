/// Integration tests for the passkey_rp library
///
/// These tests drive complete ceremonies through the public API with a
/// software authenticator, against in-memory and SQLite backends.
mod common;

mod integration {
    pub mod ceremony_flows;
    pub mod concurrency;
    pub mod counter_properties;
    pub mod orchestrator_flows;
    pub mod sqlite_flows;
}
