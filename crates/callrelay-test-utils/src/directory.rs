// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory identity directory for deterministic tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use callrelay_core::{CallRelayError, IdentityProvider, UserProfile};

/// An identity directory backed by a map.
///
/// Can be switched into a failing mode to exercise degraded lookups.
#[derive(Default)]
pub struct StaticDirectory {
    profiles: RwLock<HashMap<String, UserProfile>>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory pre-populated with `profiles`.
    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let map = profiles
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect::<HashMap<_, _>>();
        Self {
            profiles: RwLock::new(map),
            ..Self::default()
        }
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
    }

    /// Make every subsequent lookup fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of lookups served so far, including failed ones.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StaticDirectory {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, CallRelayError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CallRelayError::Internal("directory unavailable".into()));
        }
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}

/// A profile with just a display name.
pub fn profile(id: &str, name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        username: Some(id.to_string()),
        avatar_url: None,
    }
}
