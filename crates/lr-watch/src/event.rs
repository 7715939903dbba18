//! Change event types and the channel pair connecting a source to its consumer.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::WatchError;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File or directory was created.
    Create,
    /// File content or metadata was written.
    Write,
    /// File or directory was removed.
    Remove,
    /// File or directory was renamed (either side of the rename).
    Rename,
}

/// A single filesystem mutation notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Consumer side of a change source: one feed of events, one feed of errors.
///
/// Both feeds close once the producing side (the OS watcher, or a
/// [`ChangeSender`] held by a test) is dropped. The receivers are exposed
/// separately so a consumer can `select!` over them.
pub struct ChangeStream {
    /// Filesystem change events.
    pub events: mpsc::Receiver<ChangeEvent>,
    /// Errors reported by the watch while running.
    pub errors: mpsc::Receiver<WatchError>,
}

/// Producer side of a change source.
///
/// Never blocks: when a feed is full the item is dropped. A full event feed
/// already holds a pending change, so the consumer still reacts.
#[derive(Clone)]
pub struct ChangeSender {
    events: mpsc::Sender<ChangeEvent>,
    errors: mpsc::Sender<WatchError>,
}

impl ChangeSender {
    /// Push an event. Returns `false` if it was dropped.
    pub fn send_event(&self, event: ChangeEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::debug!(path = %event.path.display(), "Change feed full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Push a runtime error. Returns `false` if it was dropped.
    pub fn send_error(&self, error: WatchError) -> bool {
        self.errors.try_send(error).is_ok()
    }

    /// Returns `true` once the consumer has dropped the stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Create a connected sender/stream pair with the given per-feed capacity.
///
/// Used by [`FsChangeSource`](crate::FsChangeSource) internally, and by tests
/// or embedders that want to drive a consumer without touching the filesystem.
#[must_use]
pub fn channel(capacity: usize) -> (ChangeSender, ChangeStream) {
    let (event_tx, event_rx) = mpsc::channel(capacity);
    let (error_tx, error_rx) = mpsc::channel(capacity);
    (
        ChangeSender {
            events: event_tx,
            errors: error_tx,
        },
        ChangeStream {
            events: event_rx,
            errors: error_rx,
        },
    )
}

/// Handle to stop watching for changes.
///
/// Uses RAII pattern - dropping the handle drops the OS watcher, which in turn
/// drops its [`ChangeSender`] and closes the [`ChangeStream`].
pub struct WatchHandle {
    watcher: Option<notify::RecommendedWatcher>,
}

impl WatchHandle {
    pub(crate) fn new(watcher: notify::RecommendedWatcher) -> Self {
        Self {
            watcher: Some(watcher),
        }
    }

    /// Create a handle that owns no watcher.
    ///
    /// For sources not backed by the OS, where closing the stream is done by
    /// dropping the [`ChangeSender`].
    #[must_use]
    pub fn no_op() -> Self {
        Self { watcher: None }
    }

    /// Stop watching immediately (consumes the handle).
    pub fn stop(mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!("Filesystem watcher stopped");
        }
    }
}
