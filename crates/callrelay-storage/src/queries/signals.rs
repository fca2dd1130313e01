// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal relay operations. Signals are append-only.

use callrelay_core::{CallRelayError, NewSignal, SignalMessage};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{format_ts, signal_from_row, truncate_ts, SIGNAL_COLUMNS};

/// Append a signal, returning it with its assigned id.
pub async fn insert_signal(
    db: &Database,
    signal: &NewSignal,
) -> Result<SignalMessage, CallRelayError> {
    let signal = signal.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO call_signals (session_id, sender_id, kind, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    signal.session_id,
                    signal.sender_id,
                    signal.kind.to_string(),
                    signal.payload,
                    format_ts(signal.created_at),
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(SignalMessage {
                id,
                session_id: signal.session_id,
                sender_id: signal.sender_id,
                kind: signal.kind,
                payload: signal.payload,
                created_at: truncate_ts(signal.created_at),
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Signals of a session not sent by `exclude_sender`, ascending by id.
pub async fn signals_after(
    db: &Database,
    session_id: &str,
    exclude_sender: &str,
    after: Option<i64>,
    limit: usize,
) -> Result<Vec<SignalMessage>, CallRelayError> {
    let session_id = session_id.to_string();
    let exclude_sender = exclude_sender.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SIGNAL_COLUMNS} FROM call_signals
                 WHERE session_id = ?1 AND sender_id != ?2 AND (?3 IS NULL OR id > ?3)
                 ORDER BY id ASC
                 LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![session_id, exclude_sender, after, limit],
                signal_from_row,
            )?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every signal of a session.
pub async fn prune_signals(db: &Database, session_id: &str) -> Result<u64, CallRelayError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM call_signals WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::create_superseding;
    use callrelay_core::{CallSession, SignalKind};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        create_superseding(&db, &CallSession::ringing("s1", "alice", "bob", t0()))
            .await
            .unwrap();
        (db, dir)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn signal(sender: &str, kind: SignalKind, payload: &str) -> NewSignal {
        NewSignal {
            session_id: "s1".into(),
            sender_id: sender.into(),
            kind,
            payload: payload.into(),
            created_at: t0(),
        }
    }

    #[tokio::test]
    async fn ids_are_strictly_increasing() {
        let (db, _dir) = setup_db().await;
        let first = insert_signal(&db, &signal("alice", SignalKind::Offer, "sdp-1"))
            .await
            .unwrap();
        let second = insert_signal(&db, &signal("alice", SignalKind::Candidate, "cand-1"))
            .await
            .unwrap();
        assert!(second.id > first.id);
        assert_eq!(second.kind, SignalKind::Candidate);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn poll_excludes_own_signals_and_honors_cursor() {
        let (db, _dir) = setup_db().await;
        let offer = insert_signal(&db, &signal("alice", SignalKind::Offer, "sdp-offer"))
            .await
            .unwrap();
        insert_signal(&db, &signal("bob", SignalKind::Answer, "sdp-answer"))
            .await
            .unwrap();
        let cand = insert_signal(&db, &signal("alice", SignalKind::Candidate, "c1"))
            .await
            .unwrap();

        let for_bob = signals_after(&db, "s1", "bob", None, 100).await.unwrap();
        let ids: Vec<i64> = for_bob.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![offer.id, cand.id]);

        let newer = signals_after(&db, "s1", "bob", Some(offer.id), 100)
            .await
            .unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].payload, "c1");

        let for_alice = signals_after(&db, "s1", "alice", None, 100).await.unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].kind, SignalKind::Answer);
    }

    #[tokio::test]
    async fn poll_respects_limit() {
        let (db, _dir) = setup_db().await;
        for i in 0..5 {
            insert_signal(&db, &signal("alice", SignalKind::Candidate, &format!("c{i}")))
                .await
                .unwrap();
        }
        let batch = signals_after(&db, "s1", "bob", None, 2).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].payload, "c0");
        let rest = signals_after(&db, "s1", "bob", Some(batch[1].id), 10)
            .await
            .unwrap();
        assert_eq!(rest.len(), 3);
    }

    #[tokio::test]
    async fn signals_cannot_be_updated() {
        let (db, _dir) = setup_db().await;
        insert_signal(&db, &signal("alice", SignalKind::Offer, "sdp"))
            .await
            .unwrap();
        let result = db
            .connection()
            .call(|conn| conn.execute("UPDATE call_signals SET payload = 'tampered'", []))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn signal_for_unknown_session_is_rejected() {
        let (db, _dir) = setup_db().await;
        let mut orphan = signal("alice", SignalKind::Offer, "sdp");
        orphan.session_id = "ghost".into();
        assert!(insert_signal(&db, &orphan).await.is_err());
    }

    #[tokio::test]
    async fn prune_removes_only_that_session() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("s2", "carol", "dave", t0()))
            .await
            .unwrap();
        insert_signal(&db, &signal("alice", SignalKind::Offer, "a"))
            .await
            .unwrap();
        insert_signal(&db, &signal("bob", SignalKind::Answer, "b"))
            .await
            .unwrap();
        let mut other = signal("carol", SignalKind::Offer, "c");
        other.session_id = "s2".into();
        insert_signal(&db, &other).await.unwrap();

        assert_eq!(prune_signals(&db, "s1").await.unwrap(), 2);
        assert!(signals_after(&db, "s1", "nobody", None, 10).await.unwrap().is_empty());
        assert_eq!(signals_after(&db, "s2", "nobody", None, 10).await.unwrap().len(), 1);
    }
}
