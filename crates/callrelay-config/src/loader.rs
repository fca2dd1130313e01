// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./callrelay.toml` > `~/.config/callrelay/callrelay.toml`
//! > `/etc/callrelay/callrelay.toml` with environment variable overrides via
//! the `CALLRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CallrelayConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/callrelay/callrelay.toml";

/// Local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "callrelay.toml";

/// Per-user configuration file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("callrelay").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/callrelay/callrelay.toml` (system-wide)
/// 3. `~/.config/callrelay/callrelay.toml` (user XDG config)
/// 4. `./callrelay.toml` (local directory)
/// 5. `CALLRELAY_*` environment variables
pub fn load_config() -> Result<CallrelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CallrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CallrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CallrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CallrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CallrelayConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment variable provider mapping `CALLRELAY_<SECTION>_<KEY>` to
/// `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CALLRELAY_CALLS_RING_TIMEOUT_SECS` must become
/// `calls.ring_timeout_secs`, not `calls.ring.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("CALLRELAY_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("calls_", "calls.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
