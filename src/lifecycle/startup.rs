//! Startup orchestration.
//!
//! # Responsibilities
//! - Start background tasks (metrics exporter, config watcher)
//! - Bind the listener and run the server until a signal arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Logging is initialised by the caller so config errors can be reported
//! - A watcher failure only disables hot reload

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{watcher::ConfigWatcher, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals::wait_for_signal, Shutdown};
use crate::observability::{init_metrics, MetricsError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("invalid address `{0}`")]
    Address(String),
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// Run the proxy until Ctrl-C or SIGTERM.
///
/// `config_path` enables hot reload of the routing policy.
pub async fn run(config: ProxyConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        init_metrics(addr)?;
    }

    let (updates, _watcher) = match config_path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(&path);
            match watcher.run() {
                Ok(handle) => (rx, Some(handle)),
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Config watcher unavailable, hot reload disabled");
                    (rx, None)
                }
            }
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (rx, None)
        }
    };

    let server = HttpServer::new(config.clone())?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        address = %listener.local_addr()?,
        default_target = config.target.default.as_deref().unwrap_or("<unset>"),
        control_path = %config.control.path,
        control_enabled = config.control.enabled,
        routing_enabled = config.routing.enabled,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, updates, server_shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
