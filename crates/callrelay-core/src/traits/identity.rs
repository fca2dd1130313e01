// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity directory trait used to decorate presence results.

use async_trait::async_trait;

use crate::error::CallRelayError;
use crate::types::UserProfile;

/// Resolves a user id to public display attributes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `None` for users the directory does not know.
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, CallRelayError>;
}
