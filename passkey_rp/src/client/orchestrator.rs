use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};

use super::api::CeremonyApi;
use super::errors::{ClientError, PlatformError};
use super::platform::{Mediation, PlatformAuthenticator};
use crate::passkey::{AuthenticationVerifyRequest, RegistrationVerifyRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyOutcome {
    Success { username: String },
    /// Prompt dismissed or timed out.
    UserCancelled,
    /// Superseded by another ceremony or cancelled explicitly.
    Aborted,
    Failed(ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CeremonyKind {
    Registration,
    Authentication,
    Autofill,
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registration => "WebAuthn:Registration",
            Self::Authentication => "WebAuthn:Authentication",
            Self::Autofill => "WebAuthn:Autofill",
        })
    }
}

/// Receiving side of a ceremony's cancel signal.
struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is signalled; never resolves otherwise.
    async fn cancelled(&mut self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            if self.0.changed().await.is_err() {
                // Sender gone without cancelling.
                if self.is_cancelled() {
                    return;
                }
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Client-side driver for both ceremonies.
///
/// At most one ceremony is in flight per orchestrator: starting a new one
/// aborts the previous one, which is how a manual sign-in supersedes a
/// pending autofill request.
pub struct ClientCeremonyOrchestrator {
    api: Arc<dyn CeremonyApi>,
    platform: Arc<dyn PlatformAuthenticator>,
    in_flight: Mutex<Option<(u64, watch::Sender<bool>)>>,
    next_id: AtomicU64,
}

impl ClientCeremonyOrchestrator {
    pub fn new(api: Arc<dyn CeremonyApi>, platform: Arc<dyn PlatformAuthenticator>) -> Self {
        Self {
            api,
            platform,
            in_flight: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    async fn begin(&self, kind: CeremonyKind) -> (u64, CancelToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(false);

        let previous = self.in_flight.lock().await.replace((id, tx));
        if let Some((_, previous)) = previous {
            tracing::info!("[{}] Superseding ceremony in flight", kind);
            let _ = previous.send(true);
        }
        (id, CancelToken(rx))
    }

    async fn finish(&self, id: u64) {
        let mut in_flight = self.in_flight.lock().await;
        if matches!(in_flight.as_ref(), Some((current, _)) if *current == id) {
            *in_flight = None;
        }
    }

    /// Aborts the ceremony in flight, if any.
    pub async fn cancel_ceremony(&self) {
        if let Some((_, tx)) = self.in_flight.lock().await.take() {
            tracing::info!("Cancelling ceremony in flight");
            let _ = tx.send(true);
        }
    }

    pub async fn register(&self, username: &str) -> CeremonyOutcome {
        let kind = CeremonyKind::Registration;
        let (id, mut token) = self.begin(kind).await;
        let outcome = self.run_registration(username, &mut token).await;
        self.finish(id).await;
        log_outcome(kind, &outcome);
        outcome
    }

    /// Modal sign-in. Without a username the authenticator offers its
    /// discoverable credentials.
    pub async fn authenticate(&self, username: Option<&str>) -> CeremonyOutcome {
        self.authenticate_with(CeremonyKind::Authentication, username, Mediation::Optional)
            .await
    }

    /// Identifier-less sign-in offered through form autofill. Stays pending
    /// until the user picks a passkey or another ceremony starts.
    pub async fn authenticate_autofill(&self) -> CeremonyOutcome {
        self.authenticate_with(CeremonyKind::Autofill, None, Mediation::Conditional)
            .await
    }

    async fn authenticate_with(
        &self,
        kind: CeremonyKind,
        username: Option<&str>,
        mediation: Mediation,
    ) -> CeremonyOutcome {
        let (id, mut token) = self.begin(kind).await;
        let outcome = self
            .run_authentication(kind, username, mediation, &mut token)
            .await;
        self.finish(id).await;
        log_outcome(kind, &outcome);
        outcome
    }

    async fn run_registration(&self, username: &str, token: &mut CancelToken) -> CeremonyOutcome {
        let kind = CeremonyKind::Registration;
        tracing::info!("[{}] Requesting options for {}", kind, username);
        let options = match self.api.registration_options(username).await {
            Ok(options) => options,
            Err(e) => return CeremonyOutcome::Failed(e.into()),
        };
        tracing::debug!("[{}] Options: {:?}", kind, options);

        if token.is_cancelled() {
            return CeremonyOutcome::Aborted;
        }

        tracing::info!("[{}] Prompting authenticator", kind);
        let registration = tokio::select! {
            biased;
            _ = token.cancelled() => return CeremonyOutcome::Aborted,
            result = self.platform.create_credential(&options) => match result {
                Ok(registration) => registration,
                Err(e) => return classify_platform_error(e),
            },
        };

        tracing::info!("[{}] Verifying response", kind);
        let request = RegistrationVerifyRequest {
            username: username.to_string(),
            registration,
        };
        match self.api.verify_registration(&request).await {
            Ok(verdict) if verdict.verified => CeremonyOutcome::Success {
                username: username.to_string(),
            },
            Ok(_) => CeremonyOutcome::Failed(ClientError::NotVerified),
            Err(e) => CeremonyOutcome::Failed(e.into()),
        }
    }

    async fn run_authentication(
        &self,
        kind: CeremonyKind,
        username: Option<&str>,
        mediation: Mediation,
        token: &mut CancelToken,
    ) -> CeremonyOutcome {
        tracing::info!("[{}] Requesting options", kind);
        let options = match self.api.authentication_options(username).await {
            Ok(options) => options,
            Err(e) => return CeremonyOutcome::Failed(e.into()),
        };
        tracing::debug!("[{}] Options: {:?}", kind, options);

        if token.is_cancelled() {
            return CeremonyOutcome::Aborted;
        }

        tracing::info!("[{}] Prompting authenticator", kind);
        let authentication = tokio::select! {
            biased;
            _ = token.cancelled() => return CeremonyOutcome::Aborted,
            result = self.platform.get_assertion(&options, mediation) => match result {
                Ok(authentication) => authentication,
                Err(e) => return classify_platform_error(e),
            },
        };

        tracing::info!("[{}] Verifying response", kind);
        let request = AuthenticationVerifyRequest {
            username: username.map(str::to_string),
            authentication,
        };
        match self.api.verify_authentication(&request).await {
            Ok(verdict) if verdict.verified => CeremonyOutcome::Success {
                username: verdict.username,
            },
            Ok(_) => CeremonyOutcome::Failed(ClientError::NotVerified),
            Err(e) => CeremonyOutcome::Failed(e.into()),
        }
    }
}

fn classify_platform_error(err: PlatformError) -> CeremonyOutcome {
    match err {
        PlatformError::NotAllowed => CeremonyOutcome::UserCancelled,
        PlatformError::Abort => CeremonyOutcome::Aborted,
        PlatformError::InvalidState => CeremonyOutcome::Failed(ClientError::AlreadyRegistered),
        PlatformError::Security(_) => CeremonyOutcome::Failed(ClientError::PreconditionsNotMet),
        PlatformError::Other(detail) => CeremonyOutcome::Failed(ClientError::Unknown(detail)),
    }
}

fn log_outcome(kind: CeremonyKind, outcome: &CeremonyOutcome) {
    match outcome {
        CeremonyOutcome::Success { username } => {
            tracing::info!("[{}] Succeeded for {}", kind, username)
        }
        CeremonyOutcome::UserCancelled => tracing::info!("[{}] Cancelled by user", kind),
        CeremonyOutcome::Aborted => tracing::info!("[{}] Aborted", kind),
        CeremonyOutcome::Failed(e) => tracing::warn!("[{}] Failed: {}", kind, e),
    }
}
