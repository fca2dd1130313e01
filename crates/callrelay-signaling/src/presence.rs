// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only presence views for notification UIs.

use std::collections::HashMap;
use std::sync::Arc;

use callrelay_config::model::CallsConfig;
use callrelay_core::{CallRelayError, IdentityProvider, SessionStore, UserProfile};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::session::{to_chrono, SessionManager};

/// A call currently ringing for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomingCall {
    pub session_id: String,
    pub caller_id: String,
    pub started_at: DateTime<Utc>,
    /// `None` when the directory has no profile for the caller.
    pub caller: Option<UserProfile>,
}

/// An ended call the user never meaningfully took part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissedCall {
    pub session_id: String,
    pub caller_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub caller: Option<UserProfile>,
}

pub struct PresenceNotifier {
    sessions: Arc<SessionManager>,
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn IdentityProvider>,
    config: CallsConfig,
}

impl PresenceNotifier {
    pub fn new(
        sessions: Arc<SessionManager>,
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn IdentityProvider>,
        config: CallsConfig,
    ) -> Self {
        Self {
            sessions,
            store,
            directory,
            config,
        }
    }

    /// The call ringing for `user_id`, decorated with the caller's profile.
    pub async fn get_incoming_call(
        &self,
        user_id: &str,
    ) -> Result<Option<IncomingCall>, CallRelayError> {
        let Some(session) = self.sessions.get_incoming(user_id).await? else {
            return Ok(None);
        };
        let caller = self.lookup(&session.caller_id).await;
        Ok(Some(IncomingCall {
            session_id: session.id,
            caller_id: session.caller_id,
            started_at: session.started_at,
            caller,
        }))
    }

    /// Missed calls for `user_id`, newest first.
    ///
    /// `limit` defaults to, and is capped at, the configured
    /// `missed_call_limit`.
    pub async fn get_missed_calls(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MissedCall>, CallRelayError> {
        let cap = self.config.missed_call_limit;
        let limit = limit.unwrap_or(cap).min(cap);
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Rings that timed out only count once the sweep has ended them.
        self.sessions.sweep().await?;
        let threshold = to_chrono(self.config.missed_call_threshold())?;
        let sessions = self.store.missed_calls(user_id, threshold, limit).await?;

        let mut profiles: HashMap<String, Option<UserProfile>> = HashMap::new();
        let mut missed = Vec::with_capacity(sessions.len());
        for session in sessions {
            let caller = match profiles.get(&session.caller_id) {
                Some(cached) => cached.clone(),
                None => {
                    let found = self.lookup(&session.caller_id).await;
                    profiles.insert(session.caller_id.clone(), found.clone());
                    found
                }
            };
            missed.push(MissedCall {
                session_id: session.id,
                caller_id: session.caller_id,
                started_at: session.started_at,
                ended_at: session.ended_at,
                caller,
            });
        }
        debug!(user_id, count = missed.len(), "missed calls derived");
        Ok(missed)
    }

    /// Directory lookup. Failures degrade to an undecorated result.
    async fn lookup(&self, user_id: &str) -> Option<UserProfile> {
        match self.directory.profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, error = %e, "profile lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, fixture_with, secs};
    use callrelay_core::TransitionAction;

    #[tokio::test]
    async fn incoming_call_carries_caller_profile() {
        let fx = fixture().await;
        fx.storage
            .upsert_profile(&UserProfile {
                id: "alice".into(),
                name: "Alice".into(),
                username: Some("alice".into()),
                avatar_url: Some("https://cdn.example.com/alice.png".into()),
            })
            .await
            .unwrap();
        let id = fx.sessions.create_session("alice", "bob").await.unwrap();

        let incoming = fx.presence.get_incoming_call("bob").await.unwrap().unwrap();
        assert_eq!(incoming.session_id, id);
        assert_eq!(incoming.caller.unwrap().name, "Alice");
        assert!(fx.presence.get_incoming_call("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_caller_has_no_profile() {
        let fx = fixture().await;
        fx.sessions.create_session("ghost", "bob").await.unwrap();
        let incoming = fx.presence.get_incoming_call("bob").await.unwrap().unwrap();
        assert_eq!(incoming.caller_id, "ghost");
        assert!(incoming.caller.is_none());
    }

    #[tokio::test]
    async fn missed_calls_exclude_real_conversations() {
        let fx = fixture().await;

        // Declined after 2s.
        let declined = fx.sessions.create_session("alice", "bob").await.unwrap();
        fx.clock.advance(secs(2));
        fx.sessions
            .transition(&declined, "bob", TransitionAction::End)
            .await
            .unwrap();

        // A five minute conversation.
        fx.clock.advance(secs(10));
        let talked = fx.sessions.create_session("alice", "bob").await.unwrap();
        fx.sessions
            .transition(&talked, "bob", TransitionAction::Accept)
            .await
            .unwrap();
        fx.clock.advance(secs(300));
        fx.sessions
            .transition(&talked, "alice", TransitionAction::End)
            .await
            .unwrap();

        // Rang out; nobody read in between so the sweep runs on this query.
        fx.clock.advance(secs(10));
        let rang_out = fx.sessions.create_session("carol", "bob").await.unwrap();
        fx.clock.advance(secs(120));

        let missed = fx.presence.get_missed_calls("bob", None).await.unwrap();
        let ids: Vec<&str> = missed.iter().map(|m| m.session_id.as_str()).collect();
        assert_eq!(ids, vec![rang_out.as_str(), declined.as_str()]);
        assert!(missed.iter().all(|m| m.ended_at.is_some()));
        assert!(fx.presence.get_missed_calls("alice", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missed_call_limit_is_capped() {
        let fx = fixture_with(|calls| calls.missed_call_limit = 2).await;
        for caller in ["a", "b", "c"] {
            let id = fx.sessions.create_session(caller, "bob").await.unwrap();
            fx.clock.advance(secs(1));
            fx.sessions
                .transition(&id, caller, TransitionAction::End)
                .await
                .unwrap();
        }
        assert_eq!(fx.presence.get_missed_calls("bob", None).await.unwrap().len(), 2);
        assert_eq!(fx.presence.get_missed_calls("bob", Some(50)).await.unwrap().len(), 2);
        assert_eq!(fx.presence.get_missed_calls("bob", Some(1)).await.unwrap().len(), 1);
        assert!(fx.presence.get_missed_calls("bob", Some(0)).await.unwrap().is_empty());
    }
}
