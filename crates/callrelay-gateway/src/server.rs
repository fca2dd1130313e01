// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    http::HeaderName,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use callrelay_config::model::GatewayConfig;
use callrelay_core::{CallRelayError, SessionStore};
use callrelay_signaling::{PresenceNotifier, SessionManager, SignalRelay};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub sessions: Arc<SessionManager>,
    pub relay: Arc<SignalRelay>,
    pub presence: Arc<PresenceNotifier>,
    /// Used directly only for health checks.
    pub store: Arc<dyn SessionStore>,
    pub auth: AuthConfig,
    /// Reported by `/health`.
    pub service_name: Arc<str>,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors `GatewayConfig` from callrelay-config).
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth", &self.auth)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, CallRelayError> {
        let identity_header = HeaderName::from_bytes(config.identity_header.as_bytes())
            .map_err(|e| {
                CallRelayError::Config(format!(
                    "invalid gateway.identity_header '{}': {e}",
                    config.identity_header
                ))
            })?;
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            auth: AuthConfig {
                bearer_token: config.bearer_token.clone(),
                identity_header,
            },
        })
    }
}

/// Build the application router.
///
/// - GET /health (no auth)
/// - everything under /v1/calls (caller identity required)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/calls", post(handlers::create_call))
        .route("/v1/calls/incoming", get(handlers::get_incoming))
        .route("/v1/calls/active", get(handlers::get_active))
        .route("/v1/calls/missed", get(handlers::get_missed))
        .route(
            "/v1/calls/{id}",
            get(handlers::get_status).patch(handlers::transition_call),
        )
        .route("/v1/calls/{id}/end", post(handlers::end_call))
        .route(
            "/v1/calls/{id}/signals",
            get(handlers::poll_signals).post(handlers::post_signal),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), CallRelayError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CallRelayError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| CallRelayError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
