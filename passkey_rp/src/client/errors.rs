use thiserror::Error;

/// Failure reported by the platform authenticator, named after the
/// `DOMException`s browsers raise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Dismissed by the user or timed out.
    #[error("The operation either timed out or was not allowed")]
    NotAllowed,

    #[error("The operation was aborted")]
    Abort,

    /// An excluded credential already lives on this authenticator.
    #[error("The authenticator was previously registered")]
    InvalidState,

    #[error("Security error: {0}")]
    Security(String),

    #[error("{0}")]
    Other(String),
}

/// Failure talking to the relying party.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx answer; `message` is the body's `error` field when present.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// What a failed ceremony tells the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("This authenticator is already registered")]
    AlreadyRegistered,

    #[error("Verification preconditions were not met")]
    PreconditionsNotMet,

    #[error("Verification was not successful")]
    NotVerified,

    /// Message returned by the relying party.
    #[error("{0}")]
    Server(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { message, .. } => Self::Server(message),
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ClientError::AlreadyRegistered.user_message(),
            "This authenticator is already registered"
        );
        assert_eq!(
            ClientError::PreconditionsNotMet.user_message(),
            "Verification preconditions were not met"
        );
        assert_eq!(
            ClientError::Unknown("boom".into()).user_message(),
            "Unknown error: boom"
        );
    }

    #[test]
    fn test_server_errors_surface_their_message() {
        let err = ClientError::from(ApiError::Http {
            status: 400,
            message: "User does not exist".into(),
        });
        assert_eq!(err.user_message(), "User does not exist");

        let err = ClientError::from(ApiError::Transport("connection refused".into()));
        assert_eq!(
            err.user_message(),
            "Unknown error: Request failed: connection refused"
        );
    }
}
