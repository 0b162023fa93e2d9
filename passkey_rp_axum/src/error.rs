use axum::Json;
use http::StatusCode;
use passkey_rp::CeremonyError;
use serde::Serialize;

/// Body of every failed request: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, ErrorResponse>;
}

/// Client-caused failures are 400; anything unexpected is a 500 whose body
/// carries no internal detail.
impl<T> IntoResponseError<T> for Result<T, CeremonyError> {
    fn into_response_error(self) -> Result<T, ErrorResponse> {
        self.map_err(|e| {
            let status = if e.is_unexpected() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::BAD_REQUEST
            };
            (
                status,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
        })
    }
}
