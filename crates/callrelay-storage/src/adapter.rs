// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `SessionStore` and `IdentityProvider` traits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use callrelay_config::model::StorageConfig;
use callrelay_core::{
    CallRelayError, CallSession, HealthStatus, IdentityProvider, NewSignal, SessionStore,
    SignalMessage, UserProfile,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// The database is opened by [`SqliteStorage::initialize`]; every other
/// operation fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), CallRelayError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CallRelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Record display attributes for a user in the local directory.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), CallRelayError> {
        queries::profiles::upsert_profile(self.db()?, profile, Utc::now()).await
    }

    fn db(&self) -> Result<&Database, CallRelayError> {
        self.db.get().ok_or_else(|| CallRelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn health_check(&self) -> Result<HealthStatus, CallRelayError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn create_superseding(
        &self,
        session: &CallSession,
    ) -> Result<Vec<String>, CallRelayError> {
        queries::sessions::create_superseding(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<CallSession>, CallRelayError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn mark_active(
        &self,
        id: &str,
        answered_at: DateTime<Utc>,
    ) -> Result<bool, CallRelayError> {
        queries::sessions::mark_active(self.db()?, id, answered_at).await
    }

    async fn mark_ended(&self, id: &str, ended_at: DateTime<Utc>) -> Result<bool, CallRelayError> {
        queries::sessions::mark_ended(self.db()?, id, ended_at).await
    }

    async fn expire_ringing(
        &self,
        now: DateTime<Utc>,
        ring_timeout: Duration,
    ) -> Result<Vec<String>, CallRelayError> {
        queries::sessions::expire_ringing(self.db()?, now, ring_timeout).await
    }

    async fn latest_incoming(
        &self,
        callee_id: &str,
    ) -> Result<Option<CallSession>, CallRelayError> {
        queries::sessions::latest_incoming(self.db()?, callee_id).await
    }

    async fn live_session_for(
        &self,
        user_id: &str,
    ) -> Result<Option<CallSession>, CallRelayError> {
        queries::sessions::live_session_for(self.db()?, user_id).await
    }

    async fn missed_calls(
        &self,
        callee_id: &str,
        threshold: Duration,
        limit: usize,
    ) -> Result<Vec<CallSession>, CallRelayError> {
        queries::sessions::missed_calls(self.db()?, callee_id, threshold, limit).await
    }

    async fn insert_signal(&self, signal: &NewSignal) -> Result<SignalMessage, CallRelayError> {
        queries::signals::insert_signal(self.db()?, signal).await
    }

    async fn signals_after(
        &self,
        session_id: &str,
        exclude_sender: &str,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SignalMessage>, CallRelayError> {
        queries::signals::signals_after(self.db()?, session_id, exclude_sender, after, limit).await
    }

    async fn prune_signals(&self, session_id: &str) -> Result<u64, CallRelayError> {
        queries::signals::prune_signals(self.db()?, session_id).await
    }

    async fn close(&self) -> Result<(), CallRelayError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for SqliteStorage {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, CallRelayError> {
        queries::profiles::get_profile(self.db()?, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callrelay_core::{SessionStatus, SignalKind};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_reflects_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn call_lifecycle_through_store_trait() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        let store: &dyn SessionStore = &storage;

        let started = Utc::now();
        let session = CallSession::ringing("sess-1", "alice", "bob", started);
        store.create_superseding(&session).await.unwrap();
        assert_eq!(
            store.latest_incoming("bob").await.unwrap().map(|s| s.id),
            Some("sess-1".to_string())
        );

        assert!(store.mark_active("sess-1", started).await.unwrap());
        let offer = store
            .insert_signal(&NewSignal {
                session_id: "sess-1".into(),
                sender_id: "alice".into(),
                kind: SignalKind::Offer,
                payload: "v=0".into(),
                created_at: started,
            })
            .await
            .unwrap();
        let polled = store.signals_after("sess-1", "bob", None, 10).await.unwrap();
        assert_eq!(polled, vec![offer]);

        assert!(store.mark_ended("sess-1", started + Duration::seconds(90)).await.unwrap());
        let ended = store.get_session("sess-1").await.unwrap().unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert!(store.live_session_for("alice").await.unwrap().is_none());
        assert_eq!(store.prune_signals("sess-1").await.unwrap(), 1);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn profiles_resolve_through_identity_provider() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profiles.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let profile = UserProfile {
            id: "alice".into(),
            name: "Alice".into(),
            username: Some("alice".into()),
            avatar_url: Some("https://cdn.example.com/a.png".into()),
        };
        storage.upsert_profile(&profile).await.unwrap();

        let directory: &dyn IdentityProvider = &storage;
        assert_eq!(directory.profile("alice").await.unwrap(), Some(profile));
        assert_eq!(directory.profile("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_before_initialize_is_a_no_op() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("never.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.close().await.unwrap();
    }
}
