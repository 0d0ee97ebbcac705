//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type, carrying a bnp-common error mapped to a status by kind
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] bnp_common::Error);

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use bnp_common::Error as E;
        match &self.0 {
            E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            E::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            E::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_UNAVAILABLE"),
            E::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            E::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            E::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message shown to clients, without the error-kind prefix
    fn message(&self) -> String {
        use bnp_common::Error as E;
        match &self.0 {
            E::NotFound(msg) | E::InvalidInput(msg) | E::Forbidden(msg) | E::Unavailable(msg) => {
                msg.clone()
            }
            E::Database(_) => "Detection database unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        if status.is_server_error() {
            error!(code = error_code, error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.message(),
            }
        }));

        (status, body).into_response()
    }
}
