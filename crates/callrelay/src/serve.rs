// SPDX-FileCopyrightText: 2026 Callrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `callrelay serve` command implementation.
//!
//! Opens SQLite storage, wires the signaling services, optionally starts the
//! periodic expiry sweep, and serves the HTTP gateway until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use callrelay_config::CallrelayConfig;
use callrelay_core::{CallRelayError, SessionStore, SystemClock};
use callrelay_gateway::{start_server, GatewayState, ServerConfig};
use callrelay_signaling::{PresenceNotifier, SessionManager, SignalRelay};
use callrelay_storage::SqliteStorage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Storage plus the three services built on it.
pub struct Services {
    pub storage: Arc<SqliteStorage>,
    pub sessions: Arc<SessionManager>,
    pub relay: Arc<SignalRelay>,
    pub presence: Arc<PresenceNotifier>,
}

impl Services {
    /// Open storage at the configured path and build the services over it.
    pub async fn open(config: &CallrelayConfig) -> Result<Self, CallRelayError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;
        let store: Arc<dyn SessionStore> = storage.clone();
        let clock = Arc::new(SystemClock);

        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            clock.clone(),
            config.calls.clone(),
        ));
        let relay = Arc::new(SignalRelay::new(
            sessions.clone(),
            store.clone(),
            clock,
            config.calls.clone(),
        ));
        let presence = Arc::new(PresenceNotifier::new(
            sessions.clone(),
            store,
            storage.clone(),
            config.calls.clone(),
        ));

        Ok(Self {
            storage,
            sessions,
            relay,
            presence,
        })
    }
}

/// Runs the `callrelay serve` command.
pub async fn run_serve(config: CallrelayConfig) -> Result<(), CallRelayError> {
    info!(service = %config.service.name, "starting callrelay serve");

    let server_config = ServerConfig::from_config(&config.gateway)?;
    let services = Services::open(&config).await?;
    let cancel = install_signal_handler();

    let sweeper = config.calls.sweep_interval().map(|every| {
        info!(interval_secs = every.as_secs(), "periodic expiry sweep enabled");
        spawn_sweeper(services.sessions.clone(), every, cancel.clone())
    });

    let state = GatewayState {
        sessions: services.sessions.clone(),
        relay: services.relay.clone(),
        presence: services.presence.clone(),
        store: services.storage.clone(),
        auth: server_config.auth.clone(),
        service_name: Arc::from(config.service.name.as_str()),
        start_time: std::time::Instant::now(),
    };

    let served = start_server(&server_config, state, cancel.clone()).await;
    if let Err(ref e) = served {
        error!(error = %e, "gateway stopped with an error");
    }

    // Stop background work whether the server exited cleanly or not.
    cancel.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "sweep task did not shut down cleanly");
        }
    }

    services.storage.close().await?;
    info!("callrelay stopped");
    served
}

/// Runs the expiry sweep every `every` until `cancel` fires.
pub fn spawn_sweeper(
    sessions: Arc<SessionManager>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match sessions.sweep().await {
                        Ok(0) => debug!("periodic sweep found nothing to expire"),
                        Ok(swept) => info!(swept, "periodic sweep expired calls"),
                        Err(e) => warn!(error = %e, "periodic sweep failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("sweep task shutting down");
                    break;
                }
            }
        }
    })
}

/// Returns a token cancelled on SIGINT (Ctrl+C) or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `callrelay*` crates log at `log_level` and
/// everything else at `warn`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_filter(log_level: &str) -> String {
    [
        "callrelay",
        "callrelay_core",
        "callrelay_storage",
        "callrelay_signaling",
        "callrelay_gateway",
        "tower_http",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .chain(std::iter::once("warn".to_string()))
    .collect::<Vec<_>>()
    .join(",")
}
