// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `callrelay-core`.
//!
//! Timestamps are stored as fixed-width UTC text with millisecond precision,
//! so lexical comparison in SQL matches chronological order.

use std::str::FromStr;

use callrelay_core::{CallSession, SessionStatus, SignalKind, SignalMessage, UserProfile};
use chrono::{DateTime, DurationRound, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// Columns selected for every `CallSession` query, in `session_from_row` order.
pub(crate) const SESSION_COLUMNS: &str =
    "id, caller_id, callee_id, status, started_at, answered_at, ended_at";

/// Columns selected for every `SignalMessage` query, in `signal_from_row` order.
pub(crate) const SIGNAL_COLUMNS: &str = "id, session_id, sender_id, kind, payload, created_at";

/// Render a timestamp in the storage format, e.g. `2026-01-01T00:00:00.000Z`.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drop sub-millisecond precision, matching what a stored timestamp reads back as.
pub fn truncate_ts(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(chrono::Duration::milliseconds(1))
        .unwrap_or(ts)
}

/// Parse a stored timestamp.
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        parse_ts(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<CallSession> {
    Ok(CallSession {
        id: row.get(0)?,
        caller_id: row.get(1)?,
        callee_id: row.get(2)?,
        status: enum_column::<SessionStatus>(row, 3)?,
        started_at: ts_column(row, 4)?,
        answered_at: opt_ts_column(row, 5)?,
        ended_at: opt_ts_column(row, 6)?,
    })
}

pub(crate) fn signal_from_row(row: &Row<'_>) -> rusqlite::Result<SignalMessage> {
    Ok(SignalMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        sender_id: row.get(2)?,
        kind: enum_column::<SignalKind>(row, 3)?,
        payload: row.get(4)?,
        created_at: ts_column(row, 5)?,
    })
}

pub(crate) fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        avatar_url: row.get(3)?,
    })
}
