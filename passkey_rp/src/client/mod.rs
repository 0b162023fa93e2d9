mod api;
mod errors;
mod orchestrator;
mod platform;
mod soft_authenticator;

pub use api::{CeremonyApi, HttpCeremonyApi};
pub use errors::{ApiError, ClientError, PlatformError};
pub use orchestrator::{CeremonyOutcome, ClientCeremonyOrchestrator};
pub use platform::{Mediation, PlatformAuthenticator};
pub use soft_authenticator::SoftAuthenticator;
