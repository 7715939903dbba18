//! HTTP server for the lr live-reload notifier.
//!
//! This crate serves a directory over HTTP and pushes a `reload` message to
//! every connected browser when something under that directory changes:
//! - Static files from the watched root
//! - A small client script at `/lr-client.js`
//! - WebSocket endpoint (default `/reload`) for reload notifications
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use lr_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         root: PathBuf::from("site"),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! notify ──► FsChangeSource (lr-watch)
//!                 │
//!                 ▼
//!            EventLoop ── debounce ──► broadcast_reload
//!                                           │
//!                                           ▼
//!                                   ConnectionRegistry
//!                                           │
//!                      ┌────────────────────┼────────────────────┐
//!                      ▼                    ▼                    ▼
//!                 Connection task     Connection task      Connection task
//!                      │                    │                    │
//! Browser ◄──WebSocket─┘                    ┘                    ┘
//! ```

mod app;
mod error;
mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use live_reload::{ConnectionRegistry, LiveReload};
use lr_watch::{DEFAULT_IGNORE_PATTERNS, FsChangeSource};
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory to watch and serve.
    pub root: PathBuf,
    /// Glob patterns (relative to `root`) whose changes are ignored.
    pub ignore: Vec<String>,
    /// Path of the WebSocket upgrade endpoint.
    pub endpoint: String,
    /// Quiet window collapsing bursts of changes into one reload.
    pub debounce: Duration,
    /// Deadline for writing a reload frame to one client.
    pub write_timeout: Duration,
    /// Reload signals buffered per client before it is dropped.
    pub send_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
            root: PathBuf::from("."),
            ignore: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            endpoint: "/reload".to_owned(),
            debounce: Duration::from_millis(live_reload::DEFAULT_DEBOUNCE_MS),
            write_timeout: Duration::from_secs(5),
            send_buffer: 8,
        }
    }
}

/// Run the server until Ctrl-C.
///
/// Binds the listener, starts watching `config.root`, then serves until the
/// shutdown signal. On shutdown the watcher stops before any client is
/// disconnected.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be routed, the address cannot be
/// bound, the watcher cannot be started, or serving fails.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    lr_config::validate_endpoint(&config.endpoint)?;

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind { address, source })?;

    let registry = Arc::new(ConnectionRegistry::new());
    let source = FsChangeSource::new(config.root.clone()).with_ignore(&config.ignore);
    let live_reload = LiveReload::start(&source, Arc::clone(&registry), config.debounce)?;

    let state = Arc::new(AppState {
        registry,
        endpoint: config.endpoint,
        write_timeout: config.write_timeout,
        send_buffer: config.send_buffer,
    });
    let app = app::create_router(state, &config.root);

    tracing::info!(
        address = %listener.local_addr()?,
        root = %config.root.display(),
        "Starting server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            live_reload.shutdown().await;
        })
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        // Without a handler there is nothing to wait for; keep serving
        tracing::error!(%error, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from lr config.
#[must_use]
pub fn server_config_from_lr_config(config: &lr_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root: config.watch_resolved.root.clone(),
        ignore: config.watch_resolved.ignore.clone(),
        endpoint: config.live_reload.endpoint.clone(),
        debounce: Duration::from_millis(config.live_reload.debounce_ms),
        write_timeout: Duration::from_millis(config.live_reload.write_timeout_ms),
        send_buffer: config.live_reload.send_buffer,
    }
}
