//! Reload fan-out to every registered connection.

use super::connection::ReloadSignal;
use super::registry::ConnectionRegistry;

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BroadcastReport {
    /// Connections the signal was queued for.
    pub(crate) delivered: usize,
    /// Connections closed and removed because the signal could not be queued.
    pub(crate) evicted: usize,
}

/// Send a reload signal to every registered connection.
///
/// Works on a snapshot so the registry lock is never held while delivering.
/// A connection that cannot take the signal is closed and removed; the
/// remaining members are still served. There is no retry, clients reconnect.
pub(crate) fn broadcast_reload(registry: &ConnectionRegistry) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for conn in registry.snapshot() {
        match conn.send(ReloadSignal) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::debug!(client = %conn.id(), error = %e, "Dropping live reload client");
                conn.close();
                if registry.remove(conn.id()).is_some() {
                    report.evicted += 1;
                }
            }
        }
    }

    report
}
