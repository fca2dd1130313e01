// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store for call sessions and relayed signals.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::CallRelayError;
use crate::types::{CallSession, HealthStatus, NewSignal, SignalMessage};

/// Shared store backing every signaling operation.
///
/// Status writes are conditional on the prior status and report whether
/// they matched; implementations must never overwrite a status
/// unconditionally. Multiple request handlers may call into the same store
/// concurrently.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Checks that the backend is reachable.
    async fn health_check(&self) -> Result<HealthStatus, CallRelayError>;

    /// Atomically ends every ringing session placed by the new session's
    /// caller and every live session between the same two users (in either
    /// direction), then inserts `session`. Superseded sessions get
    /// `ended_at = session.started_at`. Returns the ids of the superseded
    /// sessions.
    async fn create_superseding(
        &self,
        session: &CallSession,
    ) -> Result<Vec<String>, CallRelayError>;

    async fn get_session(&self, id: &str) -> Result<Option<CallSession>, CallRelayError>;

    /// `RINGING -> ACTIVE`. Returns `false` if the session was not ringing.
    async fn mark_active(
        &self,
        id: &str,
        answered_at: DateTime<Utc>,
    ) -> Result<bool, CallRelayError>;

    /// `RINGING | ACTIVE -> ENDED`. Returns `false` if already ended.
    async fn mark_ended(&self, id: &str, ended_at: DateTime<Utc>) -> Result<bool, CallRelayError>;

    /// Ends every session that has been ringing for longer than `ring_timeout`
    /// as of `now`, stamping `ended_at = started_at + ring_timeout`.
    /// Returns the ids of the sessions it ended.
    async fn expire_ringing(
        &self,
        now: DateTime<Utc>,
        ring_timeout: Duration,
    ) -> Result<Vec<String>, CallRelayError>;

    /// Most recently started ringing session where `callee_id` is the callee.
    async fn latest_incoming(&self, callee_id: &str)
    -> Result<Option<CallSession>, CallRelayError>;

    /// Most recently started live session in which `user_id` participates.
    async fn live_session_for(&self, user_id: &str)
    -> Result<Option<CallSession>, CallRelayError>;

    /// Ended sessions where `callee_id` was the callee and the call was never
    /// answered, has no end time, or lasted less than `threshold`. Newest first.
    async fn missed_calls(
        &self,
        callee_id: &str,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<CallSession>, CallRelayError>;

    /// Appends a signal and returns it with its assigned id.
    async fn insert_signal(&self, signal: &NewSignal) -> Result<SignalMessage, CallRelayError>;

    /// Signals of `session_id` not sent by `exclude_sender`, with
    /// `id > after` when given, in ascending id order, at most `limit`.
    async fn signals_after(
        &self,
        session_id: &str,
        exclude_sender: &str,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SignalMessage>, CallRelayError>;

    /// Deletes every signal of `session_id`. Returns how many were removed.
    async fn prune_signals(&self, session_id: &str) -> Result<u64, CallRelayError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), CallRelayError>;
}
