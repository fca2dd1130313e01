// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `callrelay check` command implementation.
//!
//! Runs quick diagnostic checks against the effective configuration and the
//! call database, then prints one line per check.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use callrelay_config::CallrelayConfig;
use callrelay_core::{CallRelayError, HealthStatus, SessionStore};
use callrelay_gateway::ServerConfig;
use callrelay_storage::SqliteStorage;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `callrelay check` command.
///
/// With `--plain` (or when stdout is not a terminal), prints `[OK]`/`[WARN]`/`[FAIL]`
/// tags instead of colored symbols.
pub async fn run_check(config: &CallrelayConfig, plain: bool) -> Result<(), CallRelayError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_calls(config),
        check_gateway(config),
        check_database(config).await,
    ];

    println!();
    println!("  callrelay check");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", format_line(result, use_color));
    }

    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if results.iter().any(|r| r.status == CheckStatus::Fail) {
        return Err(CallRelayError::Internal("one or more checks failed".into()));
    }
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Summarize call timing and flag settings that defeat expiry.
fn check_calls(config: &CallrelayConfig) -> CheckResult {
    let start = Instant::now();
    let calls = &config.calls;
    let summary = format!(
        "ring timeout {}s, missed threshold {}s",
        calls.ring_timeout_secs, calls.missed_call_threshold_secs
    );

    if calls.missed_call_threshold_secs >= calls.ring_timeout_secs {
        return CheckResult::new(
            "Call timing",
            CheckStatus::Warn,
            format!("{summary} (every timed-out call counts as missed)"),
            start,
        );
    }
    if calls.sweep_interval().is_none() {
        return CheckResult::new(
            "Call timing",
            CheckStatus::Pass,
            format!("{summary}, lazy expiry only"),
            start,
        );
    }
    CheckResult::new("Call timing", CheckStatus::Pass, summary, start)
}

/// Validate the listen address and identity header.
fn check_gateway(config: &CallrelayConfig) -> CheckResult {
    let start = Instant::now();
    let server = match ServerConfig::from_config(&config.gateway) {
        Ok(server) => server,
        Err(e) => return CheckResult::new("Gateway", CheckStatus::Fail, e.to_string(), start),
    };

    let addr = format!("{}:{}", server.host, server.port);
    if server.auth.bearer_token.is_none() && !is_loopback(&server.host) {
        return CheckResult::new(
            "Gateway",
            CheckStatus::Warn,
            format!("{addr} is reachable off-host without a bearer token"),
            start,
        );
    }
    CheckResult::new(
        "Gateway",
        CheckStatus::Pass,
        format!("{addr}, identity from '{}'", server.auth.identity_header),
        start,
    )
}

fn is_loopback(host: &str) -> bool {
    host == "localhost"
        || host
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

/// Open the database, run migrations, and issue a trivial query.
async fn check_database(config: &CallrelayConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;

    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }

    let result = match storage.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Database", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Database", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    };

    if let Err(e) = storage.close().await {
        tracing::warn!(error = %e, "failed to close database after check");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use callrelay_config::model::{GatewayConfig, StorageConfig};

    fn config_with_db(path: String) -> CallrelayConfig {
        CallrelayConfig {
            storage: StorageConfig {
                database_path: path,
                wal_mode: true,
            },
            ..CallrelayConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_database_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db").to_string_lossy().to_string();
        let result = check_database(&config_with_db(path)).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("will be created"));
    }

    #[tokio::test]
    async fn existing_database_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.db").to_string_lossy().to_string();
        let config = config_with_db(path);

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();
        storage.close().await.unwrap();

        let result = check_database(&config).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
    }

    #[test]
    fn default_gateway_passes() {
        let result = check_gateway(&CallrelayConfig::default());
        assert_eq!(result.status, CheckStatus::Pass);
        assert!(result.message.contains("127.0.0.1:8780"));
    }

    #[test]
    fn open_gateway_without_token_warns() {
        let config = CallrelayConfig {
            gateway: GatewayConfig {
                host: "0.0.0.0".into(),
                ..GatewayConfig::default()
            },
            ..CallrelayConfig::default()
        };
        assert_eq!(check_gateway(&config).status, CheckStatus::Warn);
    }

    #[test]
    fn threshold_above_timeout_warns() {
        let mut config = CallrelayConfig::default();
        config.calls.missed_call_threshold_secs = config.calls.ring_timeout_secs;
        assert_eq!(check_calls(&config).status, CheckStatus::Warn);
    }

    #[test]
    fn plain_output_uses_tags() {
        let result = CheckResult {
            name: "Database".into(),
            status: CheckStatus::Fail,
            message: "open failed".into(),
            duration: Duration::from_millis(3),
        };
        let line = format_line(&result, false);
        assert!(line.contains("[FAIL]"));
        assert!(line.contains("open failed (3ms)"));
    }
}
