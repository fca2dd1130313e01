// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call signaling core for the Callrelay service.
//!
//! Three services share one [`SessionStore`](callrelay_core::SessionStore):
//!
//! - [`SessionManager`] creates sessions, applies `accept`/`end`, and runs
//!   the ring-timeout sweep.
//! - [`SignalRelay`] is the per-session mailbox for offer/answer/candidate
//!   payloads.
//! - [`PresenceNotifier`] derives incoming and missed calls for UIs.

pub mod presence;
pub mod relay;
pub mod session;

pub use presence::{IncomingCall, MissedCall, PresenceNotifier};
pub use relay::{PollBatch, SignalRelay};
pub use session::SessionManager;
