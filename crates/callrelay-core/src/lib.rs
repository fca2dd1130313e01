// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Callrelay call-signaling service.
//!
//! This crate provides the domain types shared by every other crate in the
//! workspace: call sessions and their lifecycle, relayed signal messages,
//! the error type, the clock abstraction, and the collaborator traits that
//! storage and identity backends implement.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CallRelayError;
pub use traits::{IdentityProvider, SessionStore};
pub use types::{
    CallSession, HealthStatus, NewSignal, ParticipantRole, SessionStatus, SignalKind, SignalMessage,
    TransitionAction, TransitionOutcome, UserProfile,
};
