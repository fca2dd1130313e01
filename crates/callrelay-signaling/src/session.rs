// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call session lifecycle.
//!
//! [`SessionManager`] owns every status change. It holds no per-session
//! state of its own: each operation is a single round trip against the
//! shared [`SessionStore`], and every status write is conditional on the
//! prior status so that concurrent handlers (and the expiry sweep) resolve
//! races to exactly one outcome.
//!
//! Ringing sessions that outlive the ring timeout are expired lazily, as a
//! side effect of the reads that could observe them.

use std::sync::Arc;

use callrelay_config::model::CallsConfig;
use callrelay_core::{
    CallRelayError, CallSession, Clock, ParticipantRole, SessionStatus, SessionStore,
    TransitionAction, TransitionOutcome,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Creates sessions and applies lifecycle transitions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: CallsConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: CallsConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Start ringing `callee_id` on behalf of `caller_id`.
    ///
    /// Any session the caller is still ringing, and any live session between
    /// the two users, is ended first in the same store transaction.
    pub async fn create_session(
        &self,
        caller_id: &str,
        callee_id: &str,
    ) -> Result<String, CallRelayError> {
        validate_user_id("caller_id", caller_id)?;
        validate_user_id("callee_id", callee_id)?;
        if caller_id == callee_id {
            return Err(CallRelayError::Validation("cannot call yourself".into()));
        }

        let session = CallSession::ringing(
            Uuid::new_v4().to_string(),
            caller_id,
            callee_id,
            self.clock.now(),
        );
        let superseded = self.store.create_superseding(&session).await?;
        info!(
            session_id = %session.id,
            caller_id,
            callee_id,
            superseded = superseded.len(),
            "call session created"
        );
        for session_id in &superseded {
            self.after_end(session_id).await;
        }
        Ok(session.id)
    }

    /// Apply `action` on behalf of `requester_id`.
    ///
    /// Only the callee may accept; either participant may end. An action
    /// whose precondition no longer holds returns
    /// [`TransitionOutcome::Unchanged`] with the current status.
    pub async fn transition(
        &self,
        session_id: &str,
        requester_id: &str,
        action: TransitionAction,
    ) -> Result<TransitionOutcome, CallRelayError> {
        if action == TransitionAction::Accept {
            // A ring past its timeout is no longer answerable.
            self.sweep().await?;
        }

        let session = self.require_session(session_id).await?;
        let role = self.require_role(&session, requester_id)?;
        if action == TransitionAction::Accept && role != ParticipantRole::Callee {
            warn!(session_id, requester_id, "caller attempted to accept own call");
            return Err(CallRelayError::Forbidden(
                "only the callee may accept a call".into(),
            ));
        }

        let Some(target) = session.status.apply(action) else {
            debug!(
                session_id,
                %action,
                status = %session.status,
                "transition not applicable, nothing to do"
            );
            return Ok(TransitionOutcome::Unchanged(session.status));
        };

        let now = self.clock.now();
        let applied = match action {
            TransitionAction::Accept => self.store.mark_active(session_id, now).await?,
            TransitionAction::End => self.store.mark_ended(session_id, now).await?,
        };

        if !applied {
            // Lost a race against the peer or the sweep; report where it landed.
            let current = self
                .store
                .get_session(session_id)
                .await?
                .map(|s| s.status)
                .unwrap_or(session.status);
            debug!(
                session_id,
                %action,
                status = %current,
                "transition lost a race, nothing to do"
            );
            return Ok(TransitionOutcome::Unchanged(current));
        }

        info!(session_id, requester_id, %role, %action, status = %target, "call session transitioned");
        if target == SessionStatus::Ended {
            self.after_end(session_id).await;
        }
        Ok(TransitionOutcome::Applied(target))
    }

    /// Current status of a session, for one of its participants.
    pub async fn get_status(
        &self,
        session_id: &str,
        requester_id: &str,
    ) -> Result<SessionStatus, CallRelayError> {
        self.sweep().await?;
        let session = self.require_session(session_id).await?;
        self.require_role(&session, requester_id)?;
        Ok(session.status)
    }

    /// The most recent session ringing `user_id`, if any.
    pub async fn get_incoming(&self, user_id: &str) -> Result<Option<CallSession>, CallRelayError> {
        self.sweep().await?;
        self.store.latest_incoming(user_id).await
    }

    /// The most recent ringing or active session `user_id` takes part in.
    pub async fn get_active_session(
        &self,
        user_id: &str,
    ) -> Result<Option<CallSession>, CallRelayError> {
        self.sweep().await?;
        self.store.live_session_for(user_id).await
    }

    /// A session visible to `requester_id`.
    ///
    /// Fails with `NotFound` for unknown ids and `Forbidden` for
    /// non-participants.
    pub async fn participant_session(
        &self,
        session_id: &str,
        requester_id: &str,
    ) -> Result<CallSession, CallRelayError> {
        let session = self.require_session(session_id).await?;
        self.require_role(&session, requester_id)?;
        Ok(session)
    }

    /// End every session that has rung past the ring timeout.
    ///
    /// Returns how many sessions were ended.
    pub async fn sweep(&self) -> Result<usize, CallRelayError> {
        let ring_timeout = to_chrono(self.config.ring_timeout())?;
        let expired = self
            .store
            .expire_ringing(self.clock.now(), ring_timeout)
            .await?;
        if !expired.is_empty() {
            info!(swept = expired.len(), "expired unanswered calls");
            for session_id in &expired {
                self.after_end(session_id).await;
            }
        }
        Ok(expired.len())
    }

    async fn after_end(&self, session_id: &str) {
        if !self.config.prune_signals_on_end {
            return;
        }
        match self.store.prune_signals(session_id).await {
            Ok(removed) => debug!(session_id, removed, "pruned signals of ended session"),
            Err(e) => warn!(session_id, error = %e, "failed to prune signals (non-fatal)"),
        }
    }

    async fn require_session(&self, session_id: &str) -> Result<CallSession, CallRelayError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| CallRelayError::session_not_found(session_id))
    }

    fn require_role(
        &self,
        session: &CallSession,
        requester_id: &str,
    ) -> Result<ParticipantRole, CallRelayError> {
        session.role_of(requester_id).ok_or_else(|| {
            warn!(session_id = %session.id, requester_id, "rejected non-participant");
            CallRelayError::Forbidden("not a participant in this call".into())
        })
    }
}

/// Ids are stored and compared verbatim.
fn validate_user_id(field: &str, id: &str) -> Result<(), CallRelayError> {
    if id.trim().is_empty() {
        return Err(CallRelayError::Validation(format!("{field} is required")));
    }
    if id.trim() != id {
        return Err(CallRelayError::Validation(format!(
            "{field} must not have leading or trailing whitespace"
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(CallRelayError::Validation(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(())
}

/// Convert a configured duration for timestamp arithmetic.
pub(crate) fn to_chrono(d: std::time::Duration) -> Result<chrono::Duration, CallRelayError> {
    chrono::Duration::from_std(d)
        .map_err(|e| CallRelayError::Config(format!("duration out of range: {e}")))
}
