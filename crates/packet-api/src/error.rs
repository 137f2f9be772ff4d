use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use packet_types::api::ErrorResponse;
use thiserror::Error;

/// Errors surfaced to HTTP clients. Storage detail is logged where it
/// happens and replaced by a generic message here.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Email already registered")]
    Conflict,

    /// Carries the client-facing message only.
    #[error("{0}")]
    Storage(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
