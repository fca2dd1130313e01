// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller identification middleware for the gateway.
//!
//! The authenticated user id is read from a trusted header set by the
//! upstream authentication layer (`x-user-id` by default). When a shared
//! bearer token is configured, requests must also carry
//! `Authorization: Bearer <token>`.

use axum::{
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. If `Some`, bearer auth is enforced.
    pub bearer_token: Option<String>,
    /// Header carrying the caller's user id.
    pub identity_header: HeaderName,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .field("identity_header", &self.identity_header)
            .finish()
    }
}

/// The authenticated user making the request.
///
/// Inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Middleware that checks the bearer token (if configured) and resolves the
/// caller identity. Both failures are `401 Unauthorized`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(ref expected_token) = auth.bearer_token {
        let presented = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected_token.as_str()) {
            tracing::debug!("request rejected: bad or missing bearer token");
            return unauthorized("invalid bearer token");
        }
    }

    let caller = request
        .headers()
        .get(&auth.identity_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    match caller {
        Some(caller) => {
            request.extensions_mut().insert(CallerId(caller));
            next.run(request).await
        }
        None => {
            tracing::debug!(header = %auth.identity_header, "request rejected: no caller identity");
            unauthorized("missing caller identity")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
            identity_header: HeaderName::from_static("x-user-id"),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
        assert!(debug_output.contains("x-user-id"));
    }

    #[test]
    fn caller_id_exposes_inner_str() {
        let caller = CallerId("alice".into());
        assert_eq!(caller.as_str(), "alice");
    }
}
