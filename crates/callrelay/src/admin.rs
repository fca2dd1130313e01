// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot maintenance commands: `sweep` and `profile set|show`.

use callrelay_config::CallrelayConfig;
use callrelay_core::{CallRelayError, IdentityProvider, SessionStore, UserProfile};
use tracing::info;

use crate::serve::Services;

/// End every call that has rung past the ring timeout.
pub async fn run_sweep(config: &CallrelayConfig) -> Result<(), CallRelayError> {
    let services = Services::open(config).await?;
    let swept = services.sessions.sweep().await;
    services.storage.close().await?;

    let swept = swept?;
    info!(swept, "manual sweep complete");
    println!("Expired {swept} ringing call(s).");
    Ok(())
}

/// Create or replace a user's display profile.
pub async fn run_profile_set(
    config: &CallrelayConfig,
    id: String,
    name: String,
    username: Option<String>,
    avatar_url: Option<String>,
) -> Result<(), CallRelayError> {
    let profile = build_profile(id, name, username, avatar_url)?;

    let services = Services::open(config).await?;
    let stored = services.storage.upsert_profile(&profile).await;
    services.storage.close().await?;
    stored?;

    println!("Saved profile for {}.", profile.id);
    Ok(())
}

/// Print a user's display profile.
pub async fn run_profile_show(config: &CallrelayConfig, id: &str) -> Result<(), CallRelayError> {
    let services = Services::open(config).await?;
    let found = services.storage.profile(id).await;
    services.storage.close().await?;

    match found? {
        Some(profile) => println!("{}", describe(&profile)),
        None => println!("No profile for {id}."),
    }
    Ok(())
}

fn build_profile(
    id: String,
    name: String,
    username: Option<String>,
    avatar_url: Option<String>,
) -> Result<UserProfile, CallRelayError> {
    let id = id.trim().to_string();
    let name = name.trim().to_string();
    if id.is_empty() {
        return Err(CallRelayError::Validation("profile id must not be empty".into()));
    }
    if name.is_empty() {
        return Err(CallRelayError::Validation("profile name must not be empty".into()));
    }
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(UserProfile {
        id,
        name,
        username: non_empty(username),
        avatar_url: non_empty(avatar_url),
    })
}

fn describe(profile: &UserProfile) -> String {
    let mut out = format!("id:       {}\nname:     {}", profile.id, profile.name);
    if let Some(username) = &profile.username {
        out.push_str(&format!("\nusername: {username}"));
    }
    if let Some(avatar_url) = &profile.avatar_url {
        out.push_str(&format!("\navatar:   {avatar_url}"));
    }
    out
}
