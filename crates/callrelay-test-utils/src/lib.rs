// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Callrelay integration tests.
//!
//! Provides a fully wired signaling stack over a throwaway SQLite database,
//! with a hand-driven clock so ring timeouts can be crossed instantly.
//!
//! # Components
//!
//! - [`TestHarness`] - temp database, services, clock, and directory
//! - [`StaticDirectory`] - in-memory identity directory
//! - [`ManualClock`] - re-exported from `callrelay-core`

pub mod directory;
pub mod harness;

pub use callrelay_core::ManualClock;
pub use directory::{profile, StaticDirectory};
pub use harness::{TestHarness, TestHarnessBuilder};
