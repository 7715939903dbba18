//! Server error types.

use lr_config::ConfigError;
use lr_watch::WatchError;

/// Error starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configuration cannot be served as given.
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// The file watcher could not be started.
    #[error("Failed to start file watcher: {0}")]
    Watch(#[from] WatchError),
    /// The listening socket could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address as given in the configuration.
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// I/O error while serving.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
