//! Handle to one connected live reload client.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Text frame sent to clients when they should reload.
pub(crate) const RELOAD_MESSAGE: &str = "reload";

/// Unique identity of a connection.
pub(crate) type ConnectionId = Uuid;

/// Content-free "reload now" notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ReloadSignal;

/// Why a signal could not be handed to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("send buffer full")]
    Full,
}

/// Registry-side handle of a client connection.
///
/// The socket itself is owned by the connection task, which is the only
/// writer to it. This handle carries the bounded queue feeding that task and
/// a close latch that flips exactly once.
#[derive(Debug)]
pub(crate) struct Connection {
    id: ConnectionId,
    outbox: mpsc::Sender<ReloadSignal>,
    closed: watch::Sender<bool>,
}

impl Connection {
    /// Create a connection with room for `buffer` undelivered signals.
    ///
    /// Returns the handle and the receiving end for the connection task.
    pub(crate) fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<ReloadSignal>) {
        let (outbox, inbox) = mpsc::channel(buffer.max(1));
        let (closed, _) = watch::channel(false);
        let conn = Self {
            id: Uuid::new_v4(),
            outbox,
            closed,
        };
        (Arc::new(conn), inbox)
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a reload signal without waiting.
    pub(crate) fn send(&self, signal: ReloadSignal) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        self.outbox.try_send(signal).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Mark the connection closed.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub(crate) fn close(&self) -> bool {
        self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub(crate) async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives as long as `self`, so this only returns once closed
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
