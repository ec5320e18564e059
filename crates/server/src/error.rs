//! HTTP error responses for the hostgrade server.
//!
//! Status mapping:
//! - `InvalidInput` → 400 with the plain-text message
//! - `Timeout` → 408
//! - `UnsupportedResponse` → 501
//! - everything else → 500

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hostgrade_core::Error;

/// Wrapper turning a core [`Error`] into an HTTP response.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl From<hostgrade_client::HostError> for ApiError {
    fn from(err: hostgrade_client::HostError) -> Self {
        ApiError(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self.0 {
            Error::InvalidInput(msg) => {
                tracing::debug!(%msg, "rejected request");
                (status, msg.clone()).into_response()
            }
            err => {
                if status.is_server_error() {
                    tracing::error!(error = %err, status = status.as_u16(), "request failed");
                } else {
                    tracing::warn!(error = %err, status = status.as_u16(), "request failed");
                }
                (status, Json(ErrorBody { error: err.to_string() })).into_response()
            }
        }
    }
}
