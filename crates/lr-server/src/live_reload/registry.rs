//! Set of live client connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::connection::{Connection, ConnectionId};

/// Concurrency-safe set of connections that should receive reload signals.
///
/// Membership is the only source of truth for who gets notified. The lock
/// guards the map alone and is never held while talking to a client.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
        // The map is never left half-updated, so a poisoned lock is still usable
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection. Re-adding a registered connection is a no-op.
    ///
    /// Returns `true` if the connection was not registered before.
    pub(crate) fn add(&self, conn: Arc<Connection>) -> bool {
        let mut connections = self.lock();
        if connections.contains_key(&conn.id()) {
            return false;
        }
        connections.insert(conn.id(), conn);
        true
    }

    /// Unregister a connection. Removing an absent connection is a no-op.
    pub(crate) fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.lock().remove(&id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current members, copied out so callers can work without the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.lock().values().cloned().collect()
    }

    /// Remove and close every member. Returns how many were registered.
    pub(crate) fn close_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().map(|(_, conn)| conn).collect();
        for conn in &drained {
            conn.close();
        }
        drained.len()
    }
}
