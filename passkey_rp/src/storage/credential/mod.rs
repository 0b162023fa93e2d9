mod memory;
mod sqlite;
mod types;

pub use memory::InMemoryCredentialRepository;
pub use sqlite::SqliteCredentialRepository;
pub use types::CredentialRepository;
