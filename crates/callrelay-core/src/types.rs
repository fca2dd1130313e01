// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Callrelay service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a call session.
///
/// `Ringing -> Active -> Ended`, with `Ringing -> Ended` for declined,
/// cancelled, and timed-out calls. `Ended` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Ringing,
    Active,
    Ended,
}

impl SessionStatus {
    /// Canonical storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ringing => "RINGING",
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Ended => "ENDED",
        }
    }

    /// Whether the session still occupies its participant pair.
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionStatus::Ended)
    }

    /// The status reached by applying `action`, or `None` if the action is
    /// not valid from this state.
    pub fn apply(self, action: TransitionAction) -> Option<SessionStatus> {
        match (self, action) {
            (SessionStatus::Ringing, TransitionAction::Accept) => Some(SessionStatus::Active),
            (SessionStatus::Ringing | SessionStatus::Active, TransitionAction::End) => {
                Some(SessionStatus::Ended)
            }
            _ => None,
        }
    }
}

/// An action a participant may request on a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    /// Callee answers a ringing call.
    Accept,
    /// Either participant hangs up, declines, or cancels.
    End,
}

impl TransitionAction {
    /// The statuses from which this action is valid.
    pub fn valid_from(&self) -> &'static [SessionStatus] {
        match self {
            TransitionAction::Accept => &[SessionStatus::Ringing],
            TransitionAction::End => &[SessionStatus::Ringing, SessionStatus::Active],
        }
    }
}

/// Result of a transition request.
///
/// A request whose precondition no longer holds (typically because it lost a
/// race against the other peer or the expiry sweep) is `Unchanged`, never an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The conditional write matched; the session is now in this status.
    Applied(SessionStatus),
    /// Nothing was written; the session is currently in this status.
    Unchanged(SessionStatus),
}

impl TransitionOutcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            TransitionOutcome::Applied(s) | TransitionOutcome::Unchanged(s) => *s,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// The two named roles of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Initiated the call; may only end it.
    Caller,
    /// Was called; may accept or end it.
    Callee,
}

/// One negotiated rendezvous attempt between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    pub id: String,
    pub caller_id: String,
    pub callee_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    /// Set when the callee accepts.
    pub answered_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the status becomes `Ended`.
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// A freshly created, ringing session.
    pub fn ringing(
        id: impl Into<String>,
        caller_id: impl Into<String>,
        callee_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            caller_id: caller_id.into(),
            callee_id: callee_id.into(),
            status: SessionStatus::Ringing,
            started_at,
            answered_at: None,
            ended_at: None,
        }
    }

    /// The role `user_id` plays in this session, if any.
    pub fn role_of(&self, user_id: &str) -> Option<ParticipantRole> {
        if self.caller_id == user_id {
            Some(ParticipantRole::Caller)
        } else if self.callee_id == user_id {
            Some(ParticipantRole::Callee)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.role_of(user_id).is_some()
    }

    /// Order-independent key identifying the participant pair.
    pub fn pair_key(&self) -> String {
        pair_key(&self.caller_id, &self.callee_id)
    }

    /// Wall time between start and end, for ended sessions.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|ended| ended - self.started_at)
    }
}

/// Order-independent key for a pair of users: `a` calling `b` and `b`
/// calling `a` map to the same key.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}\u{1f}{b}")
    } else {
        format!("{b}\u{1f}{a}")
    }
}

/// Kind of relayed negotiation payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Offer,
    Answer,
    /// A network-path candidate. Older clients send `ICE`.
    #[strum(to_string = "CANDIDATE", serialize = "ICE")]
    #[serde(alias = "ICE")]
    Candidate,
}

/// One relayed negotiation payload, immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMessage {
    /// Store-assigned, strictly increasing; doubles as the poll cursor.
    pub id: i64,
    pub session_id: String,
    pub sender_id: String,
    pub kind: SignalKind,
    /// Opaque to the relay.
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// A signal that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSignal {
    pub session_id: String,
    pub sender_id: String,
    pub kind: SignalKind,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Public display attributes of a user, resolved from the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn any_status() -> impl Strategy<Value = SessionStatus> {
        prop_oneof![
            Just(SessionStatus::Ringing),
            Just(SessionStatus::Active),
            Just(SessionStatus::Ended),
        ]
    }

    fn any_action() -> impl Strategy<Value = TransitionAction> {
        prop_oneof![Just(TransitionAction::Accept), Just(TransitionAction::End)]
    }

    proptest! {
        #[test]
        fn ended_is_terminal(actions in proptest::collection::vec(any_action(), 0..8)) {
            for action in actions {
                prop_assert_eq!(SessionStatus::Ended.apply(action), None);
            }
        }

        #[test]
        fn accept_only_leaves_ringing(status in any_status()) {
            let next = status.apply(TransitionAction::Accept);
            if status == SessionStatus::Ringing {
                prop_assert_eq!(next, Some(SessionStatus::Active));
            } else {
                prop_assert_eq!(next, None);
            }
        }

        #[test]
        fn valid_from_agrees_with_apply(status in any_status(), action in any_action()) {
            prop_assert_eq!(
                action.valid_from().contains(&status),
                status.apply(action).is_some()
            );
        }

        #[test]
        fn pair_key_is_order_independent(a in "[a-z0-9]{1,12}", b in "[a-z0-9]{1,12}") {
            prop_assert_eq!(pair_key(&a, &b), pair_key(&b, &a));
        }
    }

    #[test]
    fn status_string_forms_match_storage() {
        for status in [
            SessionStatus::Ringing,
            SessionStatus::Active,
            SessionStatus::Ended,
        ] {
            assert_eq!(status.to_string(), status.as_str());
            assert_eq!(SessionStatus::from_str(status.as_str()).unwrap(), status);
        }
        let json = serde_json::to_string(&SessionStatus::Ringing).unwrap();
        assert_eq!(json, "\"RINGING\"");
    }

    #[test]
    fn signal_kind_accepts_legacy_ice() {
        assert_eq!(SignalKind::from_str("ICE").unwrap(), SignalKind::Candidate);
        assert_eq!(SignalKind::from_str("CANDIDATE").unwrap(), SignalKind::Candidate);
        assert_eq!(SignalKind::Candidate.to_string(), "CANDIDATE");
        let parsed: SignalKind = serde_json::from_str("\"ICE\"").unwrap();
        assert_eq!(parsed, SignalKind::Candidate);
        assert!(SignalKind::from_str("PRANSWER").is_err());
    }

    #[test]
    fn transition_action_parses_lowercase() {
        assert_eq!(
            TransitionAction::from_str("accept").unwrap(),
            TransitionAction::Accept
        );
        assert_eq!(TransitionAction::from_str("end").unwrap(), TransitionAction::End);
        let parsed: TransitionAction = serde_json::from_str("\"end\"").unwrap();
        assert_eq!(parsed, TransitionAction::End);
    }

    #[test]
    fn roles_are_resolved_per_participant() {
        let session = CallSession::ringing("s1", "alice", "bob", Utc::now());
        assert_eq!(session.role_of("alice"), Some(ParticipantRole::Caller));
        assert_eq!(session.role_of("bob"), Some(ParticipantRole::Callee));
        assert_eq!(session.role_of("carol"), None);
        assert!(session.duration().is_none());
    }

    #[test]
    fn outcome_reports_status_either_way() {
        let applied = TransitionOutcome::Applied(SessionStatus::Active);
        let unchanged = TransitionOutcome::Unchanged(SessionStatus::Ended);
        assert!(applied.is_applied());
        assert!(!unchanged.is_applied());
        assert_eq!(unchanged.status(), SessionStatus::Ended);
    }
}
