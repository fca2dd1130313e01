// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the call signaling API.
//!
//! Request bodies default missing fields to empty strings so that absent
//! input surfaces as a 400 validation error from the service layer.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use callrelay_core::{HealthStatus, SessionStatus, TransitionAction, TransitionOutcome};
use callrelay_signaling::{IncomingCall, MissedCall, PollBatch, SignalRelay};

use crate::auth::CallerId;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for POST /v1/calls.
#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    #[serde(default)]
    pub callee_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCallResponse {
    pub session_id: String,
}

/// Request body for PATCH /v1/calls/{id}.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// `accept` or `end`.
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    /// The request was well-formed and authorized. Always `true` on 200.
    pub success: bool,
    /// Whether this request changed the session.
    pub applied: bool,
    pub status: SessionStatus,
}

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            success: true,
            applied: outcome.is_applied(),
            status: outcome.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct IncomingResponse {
    pub incoming_call: Option<IncomingCall>,
}

#[derive(Debug, Serialize)]
pub struct ActiveResponse {
    pub active_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MissedQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MissedResponse {
    pub missed_calls: Vec<MissedCall>,
    pub count: usize,
}

/// Request body for POST /v1/calls/{id}/signals.
#[derive(Debug, Deserialize)]
pub struct PostSignalRequest {
    #[serde(default)]
    pub kind: String,
    /// Opaque to the relay; typically serialized SDP or candidate JSON.
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct PostSignalResponse {
    pub success: bool,
    pub signal_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub since: Option<i64>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `degraded`, or `unhealthy`.
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
///
/// Unauthenticated. Returns 503 when storage is unreachable.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (code, status) = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok"),
        Ok(HealthStatus::Degraded(reason)) => {
            tracing::warn!(%reason, "storage degraded");
            (StatusCode::OK, "degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            tracing::warn!(%reason, "storage unhealthy");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
        Err(e) => {
            tracing::error!(error = %e, "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            service: state.service_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
        }),
    )
        .into_response()
}

/// POST /v1/calls
pub async fn create_call(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerId>,
    Json(body): Json<CreateCallRequest>,
) -> Result<(StatusCode, Json<CreateCallResponse>), ApiError> {
    let session_id = state
        .sessions
        .create_session(caller.as_str(), &body.callee_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CreateCallResponse { session_id })))
}

/// PATCH /v1/calls/{id}
pub async fn transition_call(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
    Extension(caller): Extension<CallerId>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let action = TransitionAction::from_str(body.action.trim()).map_err(|_| {
        callrelay_core::CallRelayError::Validation(format!(
            "unknown action '{}', expected 'accept' or 'end'",
            body.action
        ))
    })?;
    let outcome = state
        .sessions
        .transition(&session_id, caller.as_str(), action)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /v1/calls/{id}/end
///
/// Body-less `end`, for page-unload beacons.
pub async fn end_call(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let outcome = state
        .sessions
        .transition(&session_id, caller.as_str(), TransitionAction::End)
        .await?;
    Ok(Json(outcome.into()))
}

/// GET /v1/calls/{id}
pub async fn get_status(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state
        .sessions
        .get_status(&session_id, caller.as_str())
        .await?;
    Ok(Json(StatusResponse { session_id, status }))
}

/// GET /v1/calls/incoming
pub async fn get_incoming(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<IncomingResponse>, ApiError> {
    let incoming_call = state.presence.get_incoming_call(caller.as_str()).await?;
    Ok(Json(IncomingResponse { incoming_call }))
}

/// GET /v1/calls/active
pub async fn get_active(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerId>,
) -> Result<Json<ActiveResponse>, ApiError> {
    let active = state.sessions.get_active_session(caller.as_str()).await?;
    Ok(Json(ActiveResponse {
        active_session_id: active.map(|s| s.id),
    }))
}

/// GET /v1/calls/missed?limit=
pub async fn get_missed(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerId>,
    Query(query): Query<MissedQuery>,
) -> Result<Json<MissedResponse>, ApiError> {
    let missed_calls = state
        .presence
        .get_missed_calls(caller.as_str(), query.limit)
        .await?;
    let count = missed_calls.len();
    Ok(Json(MissedResponse {
        missed_calls,
        count,
    }))
}

/// POST /v1/calls/{id}/signals
pub async fn post_signal(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
    Extension(caller): Extension<CallerId>,
    Json(body): Json<PostSignalRequest>,
) -> Result<(StatusCode, Json<PostSignalResponse>), ApiError> {
    let kind = SignalRelay::parse_kind(&body.kind)?;
    let message = state
        .relay
        .post(&session_id, caller.as_str(), kind, &body.payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PostSignalResponse {
            success: true,
            signal_id: message.id,
        }),
    ))
}

/// GET /v1/calls/{id}/signals?since=
pub async fn poll_signals(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
    Extension(caller): Extension<CallerId>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollBatch>, ApiError> {
    let batch = state
        .relay
        .poll(&session_id, caller.as_str(), query.since)
        .await?;
    Ok(Json(batch))
}
