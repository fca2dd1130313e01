// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits implemented by storage and identity backends.
//!
//! Both traits use `#[async_trait]` so they can be held as
//! `Arc<dyn Trait + Send + Sync>` by the signaling services.

pub mod identity;
pub mod store;

pub use identity::IdentityProvider;
pub use store::SessionStore;
