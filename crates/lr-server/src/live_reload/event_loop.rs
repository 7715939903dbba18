//! Turns the change stream into reload broadcasts.

use std::sync::Arc;
use std::time::Duration;

use lr_watch::{ChangeEvent, ChangeStream};
use tokio::time::Instant;

use super::broadcast::broadcast_reload;
use super::debouncer::EventDebouncer;
use super::registry::ConnectionRegistry;

/// Default debounce window in milliseconds.
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Single consumer of a [`ChangeStream`].
///
/// Waits on three inputs at once: the next change, the next watcher error,
/// and the debounce deadline. Queued input is always drained before the
/// deadline is considered, so a zero window still batches whatever arrived
/// together. Broadcasting is synchronous and never waits on a client, so the
/// loop is either idle in `select!` or briefly dispatching.
pub(crate) struct EventLoop {
    registry: Arc<ConnectionRegistry>,
    debouncer: EventDebouncer,
}

impl EventLoop {
    pub(crate) fn new(registry: Arc<ConnectionRegistry>, debounce: Duration) -> Self {
        Self {
            registry,
            debouncer: EventDebouncer::new(debounce),
        }
    }

    /// Run until the change stream's event feed closes.
    ///
    /// Watcher errors are logged and never stop the loop.
    pub(crate) async fn run(mut self, stream: ChangeStream) {
        let ChangeStream {
            mut events,
            mut errors,
        } = stream;
        let mut errors_open = true;

        loop {
            let deadline = self.debouncer.next_deadline();

            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(event) => self.record(event),
                    None => break,
                },
                error = errors.recv(), if errors_open => match error {
                    Some(error) => tracing::warn!(
                        %error,
                        recoverable = error.is_recoverable(),
                        "File watcher error"
                    ),
                    None => errors_open = false,
                },
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.dispatch();
                }
            }
        }

        tracing::debug!(
            discarded = self.debouncer.pending_len(),
            "Live reload event loop stopped"
        );
    }

    fn record(&mut self, event: ChangeEvent) {
        tracing::debug!(path = %event.path.display(), kind = ?event.kind, "File changed");
        self.debouncer.record(event, Instant::now());
    }

    fn dispatch(&mut self) {
        let changes = self.debouncer.drain_ready(Instant::now());
        if changes.is_empty() {
            return;
        }

        let start = std::time::Instant::now();
        let report = broadcast_reload(&self.registry);

        tracing::info!(
            changes = changes.len(),
            clients = report.delivered,
            dropped = report.evicted,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Live reload broadcast"
        );
    }
}
