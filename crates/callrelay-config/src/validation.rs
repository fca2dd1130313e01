// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero timeouts, a usable bind host, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::CallrelayConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CallrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let calls = &config.calls;
    if calls.ring_timeout_secs == 0 {
        fail("calls.ring_timeout_secs must be greater than zero".to_string());
    }
    if calls.missed_call_threshold_secs == 0 {
        fail("calls.missed_call_threshold_secs must be greater than zero".to_string());
    }
    if calls.missed_call_limit == 0 {
        fail("calls.missed_call_limit must be greater than zero".to_string());
    }
    if calls.max_poll_batch == 0 {
        fail("calls.max_poll_batch must be greater than zero".to_string());
    }
    if calls.max_payload_bytes == 0 {
        fail("calls.max_payload_bytes must be greater than zero".to_string());
    }
    if calls.sweep_interval_secs == Some(0) {
        fail("calls.sweep_interval_secs must be greater than zero when set".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be empty when set".to_string());
    }

    let header = config.gateway.identity_header.trim();
    if header.is_empty() {
        fail("gateway.identity_header must not be empty".to_string());
    } else if !header
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        fail(format!(
            "gateway.identity_header `{header}` is not a valid HTTP header name"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
