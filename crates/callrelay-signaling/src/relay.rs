// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered mailbox for negotiation payloads between the two participants.
//!
//! The relay imposes no ordering on signal kinds and never inspects
//! payloads. Readers page through the other peer's messages with an id
//! cursor; repeated polls with the same cursor return the same messages
//! until new ones arrive.

use std::str::FromStr;
use std::sync::Arc;

use callrelay_config::model::CallsConfig;
use callrelay_core::{CallRelayError, Clock, NewSignal, SessionStore, SignalKind, SignalMessage};
use serde::Serialize;
use tracing::debug;

use crate::session::SessionManager;

/// One page of signals for a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollBatch {
    pub signals: Vec<SignalMessage>,
    /// Cursor for the next poll: the last id returned, or the cursor that
    /// was supplied when nothing new arrived.
    pub next_cursor: Option<i64>,
}

/// Appends and serves signals for participants of a session.
pub struct SignalRelay {
    sessions: Arc<SessionManager>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: CallsConfig,
}

impl SignalRelay {
    pub fn new(
        sessions: Arc<SessionManager>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: CallsConfig,
    ) -> Self {
        Self {
            sessions,
            store,
            clock,
            config,
        }
    }

    /// Parse a wire-level signal kind (`OFFER`, `ANSWER`, `CANDIDATE`, or the
    /// legacy `ICE`).
    pub fn parse_kind(raw: &str) -> Result<SignalKind, CallRelayError> {
        SignalKind::from_str(raw.trim())
            .map_err(|_| CallRelayError::Validation(format!("unknown signal kind '{raw}'")))
    }

    /// Append a signal from `sender_id`.
    ///
    /// Posting to an ended session is accepted; the late peer may still be
    /// draining its mailbox.
    pub async fn post(
        &self,
        session_id: &str,
        sender_id: &str,
        kind: SignalKind,
        payload: &str,
    ) -> Result<SignalMessage, CallRelayError> {
        if payload.is_empty() {
            return Err(CallRelayError::Validation("payload is required".into()));
        }
        if payload.len() > self.config.max_payload_bytes {
            return Err(CallRelayError::Validation(format!(
                "payload exceeds {} bytes",
                self.config.max_payload_bytes
            )));
        }

        self.sessions
            .participant_session(session_id, sender_id)
            .await?;

        let message = self
            .store
            .insert_signal(&NewSignal {
                session_id: session_id.to_string(),
                sender_id: sender_id.to_string(),
                kind,
                payload: payload.to_string(),
                created_at: self.clock.now(),
            })
            .await?;
        debug!(
            session_id,
            sender_id,
            signal_id = message.id,
            %kind,
            bytes = payload.len(),
            "signal relayed"
        );
        Ok(message)
    }

    /// Signals from the other participant with `id > since`, oldest first.
    pub async fn poll(
        &self,
        session_id: &str,
        requester_id: &str,
        since: Option<i64>,
    ) -> Result<PollBatch, CallRelayError> {
        self.sessions
            .participant_session(session_id, requester_id)
            .await?;

        let signals = self
            .store
            .signals_after(session_id, requester_id, since, self.config.max_poll_batch)
            .await?;
        let next_cursor = signals.last().map(|s| s.id).or(since);
        debug!(
            session_id,
            requester_id,
            ?since,
            returned = signals.len(),
            "signals polled"
        );
        Ok(PollBatch {
            signals,
            next_cursor,
        })
    }
}
