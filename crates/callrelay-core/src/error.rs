// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Callrelay service.

use thiserror::Error;

/// The error type used across all Callrelay crates.
///
/// A transition whose precondition does not hold is deliberately absent
/// here: it is reported as [`crate::TransitionOutcome::Unchanged`] instead.
#[derive(Debug, Error)]
pub enum CallRelayError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requester is not a participant, or attempted an action reserved
    /// for the other role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A required field is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CallRelayError {
    /// Shorthand for an unknown call session.
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "call_session",
            id: id.into(),
        }
    }
}
