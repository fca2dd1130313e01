// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local profile directory.

use callrelay_core::{CallRelayError, UserProfile};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{format_ts, profile_from_row};

/// Insert or replace a profile.
pub async fn upsert_profile(
    db: &Database,
    profile: &UserProfile,
    updated_at: DateTime<Utc>,
) -> Result<(), CallRelayError> {
    let profile = profile.clone();
    let updated_at = format_ts(updated_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_profiles (id, name, username, avatar_url, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    username = excluded.username,
                    avatar_url = excluded.avatar_url,
                    updated_at = excluded.updated_at",
                params![
                    profile.id,
                    profile.name,
                    profile.username,
                    profile.avatar_url,
                    updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_profile(db: &Database, id: &str) -> Result<Option<UserProfile>, CallRelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, username, avatar_url FROM user_profiles WHERE id = ?1",
                params![id],
                profile_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
