// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from service errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use callrelay_core::CallRelayError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// A [`CallRelayError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub CallRelayError);

impl From<CallRelayError> for ApiError {
    fn from(err: CallRelayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            CallRelayError::NotFound { .. } => StatusCode::NOT_FOUND,
            CallRelayError::Forbidden(_) => StatusCode::FORBIDDEN,
            CallRelayError::Validation(_) => StatusCode::BAD_REQUEST,
            CallRelayError::Config(_)
            | CallRelayError::Storage { .. }
            | CallRelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            // Storage details stay in the log.
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
