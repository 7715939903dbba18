//! Live reload: change source → debounced event loop → broadcast to clients.

mod broadcast;
mod connection;
mod debouncer;
mod event_loop;
mod registry;
mod websocket;

use std::sync::Arc;
use std::time::Duration;

use lr_watch::{ChangeStream, FsChangeSource, WatchError, WatchHandle};
use tokio::task::JoinHandle;

pub(crate) use event_loop::DEFAULT_DEBOUNCE_MS;
pub(crate) use registry::ConnectionRegistry;
pub(crate) use websocket::ws_handler;

use event_loop::EventLoop;

/// How long shutdown waits for the event loop to notice the closed source.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Running change source and event loop.
pub(crate) struct LiveReload {
    registry: Arc<ConnectionRegistry>,
    watch: WatchHandle,
    event_loop: JoinHandle<()>,
}

impl LiveReload {
    /// Start watching `source` and broadcasting to `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file watcher cannot be created.
    pub(crate) fn start(
        source: &FsChangeSource,
        registry: Arc<ConnectionRegistry>,
        debounce: Duration,
    ) -> Result<Self, WatchError> {
        let (stream, watch) = source.start()?;
        tracing::debug!(
            root = %source.root().display(),
            debounce_ms = debounce.as_millis(),
            "Live reload started"
        );
        Ok(Self::spawn(stream, watch, registry, debounce))
    }

    /// Run the event loop over an already started change stream.
    pub(crate) fn spawn(
        stream: ChangeStream,
        watch: WatchHandle,
        registry: Arc<ConnectionRegistry>,
        debounce: Duration,
    ) -> Self {
        let event_loop = tokio::spawn(EventLoop::new(Arc::clone(&registry), debounce).run(stream));
        Self {
            registry,
            watch,
            event_loop,
        }
    }

    /// Stop watching, stop the event loop, then disconnect every client.
    pub(crate) async fn shutdown(self) {
        let Self {
            registry,
            watch,
            mut event_loop,
        } = self;

        watch.stop();

        if tokio::time::timeout(SHUTDOWN_GRACE, &mut event_loop)
            .await
            .is_err()
        {
            tracing::warn!("Live reload event loop did not stop in time, aborting");
            event_loop.abort();
        }

        let clients = registry.close_all();
        tracing::info!(clients, "Live reload stopped");
    }
}
