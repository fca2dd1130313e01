// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Callrelay service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Callrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallrelayConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Call lifecycle and signaling relay settings.
    #[serde(default)]
    pub calls: CallsConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported by the health endpoint and in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "callrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "callrelay.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Call lifecycle and relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallsConfig {
    /// How long a session may ring before the expiry sweep ends it.
    #[serde(default = "default_ring_timeout_secs")]
    pub ring_timeout_secs: u64,

    /// Ended calls shorter than this count as missed for the callee.
    #[serde(default = "default_missed_call_threshold_secs")]
    pub missed_call_threshold_secs: u64,

    /// Default and maximum number of missed calls returned per request.
    #[serde(default = "default_missed_call_limit")]
    pub missed_call_limit: usize,

    /// Maximum number of signals returned by a single poll.
    #[serde(default = "default_max_poll_batch")]
    pub max_poll_batch: usize,

    /// Maximum size of a single signal payload.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Delete a session's signals once it has ended.
    #[serde(default)]
    pub prune_signals_on_end: bool,

    /// When set, `serve` also runs the expiry sweep on this interval.
    /// The sweep always runs lazily on reads regardless.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            ring_timeout_secs: default_ring_timeout_secs(),
            missed_call_threshold_secs: default_missed_call_threshold_secs(),
            missed_call_limit: default_missed_call_limit(),
            max_poll_batch: default_max_poll_batch(),
            max_payload_bytes: default_max_payload_bytes(),
            prune_signals_on_end: false,
            sweep_interval_secs: None,
        }
    }
}

impl CallsConfig {
    pub fn ring_timeout(&self) -> Duration {
        Duration::from_secs(self.ring_timeout_secs)
    }

    pub fn missed_call_threshold(&self) -> Duration {
        Duration::from_secs(self.missed_call_threshold_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

fn default_ring_timeout_secs() -> u64 {
    60
}

fn default_missed_call_threshold_secs() -> u64 {
    10
}

fn default_missed_call_limit() -> usize {
    10
}

fn default_max_poll_batch() -> usize {
    500
}

fn default_max_payload_bytes() -> usize {
    64 * 1024
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared bearer token. When set, every API request must present it.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Header carrying the authenticated caller identity, set by the
    /// upstream authentication layer.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            identity_header: default_identity_header(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8780
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}
