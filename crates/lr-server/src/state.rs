//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::live_reload::ConnectionRegistry;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Live reload clients.
    pub(crate) registry: Arc<ConnectionRegistry>,
    /// Path of the WebSocket upgrade endpoint.
    pub(crate) endpoint: String,
    /// Deadline for writing one reload frame.
    pub(crate) write_timeout: Duration,
    /// Reload signals buffered per client.
    pub(crate) send_buffer: usize,
}
