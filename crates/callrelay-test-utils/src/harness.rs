// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete signaling stack over a temp SQLite
//! database: storage, the three services, a [`ManualClock`], and a
//! [`StaticDirectory`]. Tests drive time with [`TestHarness::advance`].

use std::sync::Arc;

use callrelay_config::model::{CallrelayConfig, CallsConfig, StorageConfig};
use callrelay_core::{CallRelayError, ManualClock, SessionStore, UserProfile};
use callrelay_signaling::{PresenceNotifier, SessionManager, SignalRelay};
use callrelay_storage::SqliteStorage;
use chrono::{DateTime, TimeZone, Utc};

use crate::directory::StaticDirectory;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    calls: CallsConfig,
    profiles: Vec<UserProfile>,
    start: Option<DateTime<Utc>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            calls: CallsConfig::default(),
            profiles: Vec::new(),
            start: None,
        }
    }

    /// Replace the call lifecycle settings.
    pub fn with_calls_config(mut self, calls: CallsConfig) -> Self {
        self.calls = calls;
        self
    }

    /// Seed the identity directory.
    pub fn with_profiles(mut self, profiles: Vec<UserProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Start the manual clock at `start` instead of the fixed default.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CallRelayError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CallRelayError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = Arc::new(SqliteStorage::new(storage_config.clone()));
        storage.initialize().await?;
        let store: Arc<dyn SessionStore> = storage.clone();

        let start = match self.start {
            Some(start) => start,
            None => Utc
                .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
                .single()
                .ok_or_else(|| CallRelayError::Internal("invalid harness start time".into()))?,
        };
        let clock = Arc::new(ManualClock::new(start));
        let directory = Arc::new(StaticDirectory::with_profiles(self.profiles));

        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            clock.clone(),
            self.calls.clone(),
        ));
        let relay = Arc::new(SignalRelay::new(
            sessions.clone(),
            store.clone(),
            clock.clone(),
            self.calls.clone(),
        ));
        let presence = Arc::new(PresenceNotifier::new(
            sessions.clone(),
            store.clone(),
            directory.clone(),
            self.calls.clone(),
        ));

        let config = CallrelayConfig {
            storage: storage_config,
            calls: self.calls,
            ..CallrelayConfig::default()
        };

        Ok(TestHarness {
            storage,
            store,
            clock,
            directory,
            sessions,
            relay,
            presence,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete signaling environment over temp storage.
pub struct TestHarness {
    /// Concrete storage, for profile maintenance and direct inspection.
    pub storage: Arc<SqliteStorage>,
    /// The same storage behind the store trait.
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<ManualClock>,
    pub directory: Arc<StaticDirectory>,
    pub sessions: Arc<SessionManager>,
    pub relay: Arc<SignalRelay>,
    pub presence: Arc<PresenceNotifier>,
    /// Effective configuration the services were built from.
    pub config: CallrelayConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Move the manual clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }
}
