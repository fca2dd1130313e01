// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call session operations.
//!
//! Every status change is a conditional `UPDATE` keyed on the expected prior
//! status; the affected-row count decides whether the caller won.

use callrelay_core::{CallRelayError, CallSession};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::models::{format_ts, parse_ts, session_from_row, SESSION_COLUMNS};

/// Supersede stale sessions and insert `session`, all in one transaction.
///
/// Ends (a) every ringing session the caller placed earlier and (b) every
/// live session between the same two users. Returns the ids it ended.
pub async fn create_superseding(
    db: &Database,
    session: &CallSession,
) -> Result<Vec<String>, CallRelayError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = format_ts(session.started_at);
            let pair_key = session.pair_key();

            let superseded: Vec<String> = {
                let mut stmt = tx.prepare(
                    "UPDATE call_sessions SET status = 'ENDED', ended_at = MAX(started_at, ?1)
                     WHERE status IN ('RINGING', 'ACTIVE')
                       AND ((caller_id = ?2 AND status = 'RINGING') OR pair_key = ?3)
                     RETURNING id",
                )?;
                let rows = stmt.query_map(params![now, session.caller_id, pair_key], |row| {
                    row.get(0)
                })?;
                rows.collect::<Result<_, _>>()?
            };
            tx.execute(
                "INSERT INTO call_sessions
                    (id, caller_id, callee_id, pair_key, status, started_at, answered_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL)",
                params![
                    session.id,
                    session.caller_id,
                    session.callee_id,
                    pair_key,
                    session.status.as_str(),
                    now,
                ],
            )?;
            tx.commit()?;
            Ok(superseded)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<CallSession>, CallRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM call_sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// `RINGING -> ACTIVE`, stamping `answered_at`. Returns whether the row matched.
pub async fn mark_active(
    db: &Database,
    id: &str,
    answered_at: DateTime<Utc>,
) -> Result<bool, CallRelayError> {
    let id = id.to_string();
    let answered_at = format_ts(answered_at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE call_sessions SET status = 'ACTIVE', answered_at = MAX(started_at, ?2)
                 WHERE id = ?1 AND status = 'RINGING'",
                params![id, answered_at],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// `RINGING | ACTIVE -> ENDED`, stamping `ended_at`. Returns whether the row matched.
pub async fn mark_ended(
    db: &Database,
    id: &str,
    ended_at: DateTime<Utc>,
) -> Result<bool, CallRelayError> {
    let id = id.to_string();
    let ended_at = format_ts(ended_at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE call_sessions SET status = 'ENDED', ended_at = MAX(started_at, ?2)
                 WHERE id = ?1 AND status IN ('RINGING', 'ACTIVE')",
                params![id, ended_at],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// End every session that started ringing more than `ring_timeout` before
/// `now`. Each is stamped with the instant it expired.
pub async fn expire_ringing(
    db: &Database,
    now: DateTime<Utc>,
    ring_timeout: Duration,
) -> Result<Vec<String>, CallRelayError> {
    let cutoff = format_ts(now - ring_timeout);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let stale: Vec<(String, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, started_at FROM call_sessions
                     WHERE status = 'RINGING' AND started_at < ?1
                     ORDER BY started_at ASC",
                )?;
                let rows = stmt.query_map(params![cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<Result<_, _>>()?
            };

            let mut expired = Vec::with_capacity(stale.len());
            for (id, started_at) in stale {
                let ended_at = match parse_ts(&started_at) {
                    Ok(started) => format_ts(started + ring_timeout),
                    Err(_) => cutoff.clone(),
                };
                let changed = tx.execute(
                    "UPDATE call_sessions SET status = 'ENDED', ended_at = ?2
                     WHERE id = ?1 AND status = 'RINGING'",
                    params![id, ended_at],
                )?;
                if changed == 1 {
                    expired.push(id);
                }
            }
            tx.commit()?;
            Ok(expired)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent ringing session addressed to `callee_id`.
pub async fn latest_incoming(
    db: &Database,
    callee_id: &str,
) -> Result<Option<CallSession>, CallRelayError> {
    let callee_id = callee_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM call_sessions
                     WHERE callee_id = ?1 AND status = 'RINGING'
                     ORDER BY started_at DESC, rowid DESC LIMIT 1"
                ),
                params![callee_id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent ringing or active session `user_id` takes part in.
pub async fn live_session_for(
    db: &Database,
    user_id: &str,
) -> Result<Option<CallSession>, CallRelayError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM call_sessions
                     WHERE (caller_id = ?1 OR callee_id = ?1) AND status IN ('RINGING', 'ACTIVE')
                     ORDER BY started_at DESC, rowid DESC LIMIT 1"
                ),
                params![user_id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Ended calls to `callee_id` that were never answered, have no end time,
/// or lasted less than `threshold`. Newest first.
pub async fn missed_calls(
    db: &Database,
    callee_id: &str,
    threshold: Duration,
    limit: usize,
) -> Result<Vec<CallSession>, CallRelayError> {
    let callee_id = callee_id.to_string();
    let threshold_secs = threshold.num_milliseconds() as f64 / 1000.0;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM call_sessions
                 WHERE callee_id = ?1 AND status = 'ENDED'
                   AND (ended_at IS NULL
                        OR answered_at IS NULL
                        OR (julianday(ended_at) - julianday(started_at)) * 86400.0 < ?2)
                 ORDER BY started_at DESC, rowid DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![callee_id, threshold_secs, limit], session_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use callrelay_core::SessionStatus;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[tokio::test]
    async fn create_and_get_session_roundtrips() {
        let (db, _dir) = setup_db().await;
        let session = CallSession::ringing("s1", "alice", "bob", t0());

        let superseded = create_superseding(&db, &session).await.unwrap();
        assert!(superseded.is_empty());

        let stored = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(stored, session);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_session_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_session(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_call_abandons_callers_ringing_sessions() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("s1", "alice", "bob", t0()))
            .await
            .unwrap();
        create_superseding(&db, &CallSession::ringing("s2", "alice", "carol", t0() + secs(5)))
            .await
            .unwrap();
        let superseded =
            create_superseding(&db, &CallSession::ringing("s3", "alice", "bob", t0() + secs(9)))
                .await
                .unwrap();
        assert_eq!(superseded, vec!["s2".to_string()], "only s2 was still ringing");

        let s1 = get_session(&db, "s1").await.unwrap().unwrap();
        let s2 = get_session(&db, "s2").await.unwrap().unwrap();
        assert_eq!(s1.status, SessionStatus::Ended);
        assert_eq!(s1.ended_at, Some(t0() + secs(5)));
        assert_eq!(s2.status, SessionStatus::Ended);
        assert_eq!(s2.ended_at, Some(t0() + secs(9)));
        let s3 = get_session(&db, "s3").await.unwrap().unwrap();
        assert_eq!(s3.status, SessionStatus::Ringing);
    }

    #[tokio::test]
    async fn reverse_direction_call_replaces_live_pair_session() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("s1", "alice", "bob", t0()))
            .await
            .unwrap();
        assert!(mark_active(&db, "s1", t0() + secs(2)).await.unwrap());

        let superseded =
            create_superseding(&db, &CallSession::ringing("s2", "bob", "alice", t0() + secs(30)))
                .await
                .unwrap();
        assert_eq!(superseded, vec!["s1".to_string()]);

        let s1 = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(s1.status, SessionStatus::Ended);
        assert_eq!(s1.answered_at, Some(t0() + secs(2)));
    }

    #[tokio::test]
    async fn live_pair_index_rejects_second_live_session() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("s1", "alice", "bob", t0()))
            .await
            .unwrap();

        let result = db
            .connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO call_sessions (id, caller_id, callee_id, pair_key, status, started_at)
                     SELECT 's2', callee_id, caller_id, pair_key, 'RINGING', started_at
                     FROM call_sessions WHERE id = 's1'",
                    [],
                )
            })
            .await;
        assert!(result.is_err(), "partial unique index must reject the row");
    }

    #[tokio::test]
    async fn conditional_transitions_only_match_expected_status() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("s1", "alice", "bob", t0()))
            .await
            .unwrap();

        assert!(mark_active(&db, "s1", t0() + secs(3)).await.unwrap());
        assert!(!mark_active(&db, "s1", t0() + secs(4)).await.unwrap());
        assert!(mark_ended(&db, "s1", t0() + secs(60)).await.unwrap());
        assert!(!mark_ended(&db, "s1", t0() + secs(61)).await.unwrap());
        assert!(!mark_active(&db, "s1", t0() + secs(62)).await.unwrap());

        let s1 = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(s1.status, SessionStatus::Ended);
        assert_eq!(s1.ended_at, Some(t0() + secs(60)), "ended_at never changes");
    }

    #[tokio::test]
    async fn status_updates_on_unknown_ids_report_false() {
        let (db, _dir) = setup_db().await;
        assert!(!mark_active(&db, "ghost", t0()).await.unwrap());
        assert!(!mark_ended(&db, "ghost", t0()).await.unwrap());
    }

    #[tokio::test]
    async fn expire_ringing_stamps_expiry_instant() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("old", "alice", "bob", t0()))
            .await
            .unwrap();
        create_superseding(&db, &CallSession::ringing("fresh", "carol", "dave", t0() + secs(30)))
            .await
            .unwrap();

        let expired = expire_ringing(&db, t0() + secs(65), secs(60)).await.unwrap();
        assert_eq!(expired, vec!["old".to_string()]);

        let old = get_session(&db, "old").await.unwrap().unwrap();
        assert_eq!(old.status, SessionStatus::Ended);
        assert_eq!(old.ended_at, Some(t0() + secs(60)));
        let fresh = get_session(&db, "fresh").await.unwrap().unwrap();
        assert_eq!(fresh.status, SessionStatus::Ringing);

        let again = expire_ringing(&db, t0() + secs(66), secs(60)).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn expire_ringing_leaves_active_sessions_alone() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("s1", "alice", "bob", t0()))
            .await
            .unwrap();
        mark_active(&db, "s1", t0() + secs(1)).await.unwrap();

        let expired = expire_ringing(&db, t0() + secs(3600), secs(60)).await.unwrap();
        assert!(expired.is_empty());
    }

    #[tokio::test]
    async fn latest_incoming_and_live_lookup() {
        let (db, _dir) = setup_db().await;
        create_superseding(&db, &CallSession::ringing("a-b", "alice", "bob", t0()))
            .await
            .unwrap();
        create_superseding(&db, &CallSession::ringing("c-b", "carol", "bob", t0() + secs(5)))
            .await
            .unwrap();

        let incoming = latest_incoming(&db, "bob").await.unwrap().unwrap();
        assert_eq!(incoming.id, "c-b");
        assert!(latest_incoming(&db, "alice").await.unwrap().is_none());

        let live = live_session_for(&db, "alice").await.unwrap().unwrap();
        assert_eq!(live.id, "a-b");
        assert!(live_session_for(&db, "zed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missed_calls_selects_short_and_unanswered() {
        let (db, _dir) = setup_db().await;
        // Declined after 3s: missed.
        create_superseding(&db, &CallSession::ringing("declined", "alice", "bob", t0()))
            .await
            .unwrap();
        mark_ended(&db, "declined", t0() + secs(3)).await.unwrap();
        // Answered, talked 5 minutes: not missed.
        create_superseding(&db, &CallSession::ringing("talked", "alice", "bob", t0() + secs(100)))
            .await
            .unwrap();
        mark_active(&db, "talked", t0() + secs(104)).await.unwrap();
        mark_ended(&db, "talked", t0() + secs(400)).await.unwrap();
        // Rang out after 60s: missed.
        create_superseding(&db, &CallSession::ringing("rang-out", "carol", "bob", t0() + secs(500)))
            .await
            .unwrap();
        expire_ringing(&db, t0() + secs(600), secs(60)).await.unwrap();
        // Answered then dropped after 2s: missed.
        create_superseding(&db, &CallSession::ringing("dropped", "dave", "bob", t0() + secs(700)))
            .await
            .unwrap();
        mark_active(&db, "dropped", t0() + secs(701)).await.unwrap();
        mark_ended(&db, "dropped", t0() + secs(702)).await.unwrap();
        // Still ringing: not missed yet.
        create_superseding(&db, &CallSession::ringing("ringing", "erin", "bob", t0() + secs(800)))
            .await
            .unwrap();

        let missed = missed_calls(&db, "bob", secs(10), 10).await.unwrap();
        let ids: Vec<&str> = missed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["dropped", "rang-out", "declined"]);

        let limited = missed_calls(&db, "bob", secs(10), 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "dropped");

        assert!(missed_calls(&db, "alice", secs(10), 10).await.unwrap().is_empty());
    }
}
