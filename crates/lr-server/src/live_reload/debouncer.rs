//! Event debouncing for live reload.
//!
//! Collapses a burst of filesystem changes into a single reload. Changes are
//! coalesced per path, and the whole batch is released once no new change has
//! arrived for the debounce window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use lr_watch::{ChangeEvent, ChangeKind};
use tokio::time::Instant;

/// A burst never holds a reload back for longer than this many windows.
const MAX_DELAY_WINDOWS: u32 = 5;

/// Changes waiting for the window to close.
///
/// Owned by the event loop; not shared between tasks.
pub(crate) struct EventDebouncer {
    pending: HashMap<PathBuf, ChangeKind>,
    window: Duration,
    first_recorded: Option<Instant>,
    deadline: Option<Instant>,
}

impl EventDebouncer {
    /// Create a new debouncer with the specified quiet window.
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
            first_recorded: None,
            deadline: None,
        }
    }

    /// Record an event observed at `now`.
    pub(crate) fn record(&mut self, event: ChangeEvent, now: Instant) {
        use std::collections::hash_map::Entry;

        match self.pending.entry(event.path) {
            Entry::Vacant(entry) => {
                entry.insert(event.kind);
            }
            Entry::Occupied(mut entry) => {
                if let Some(kind) = Self::coalesce(*entry.get(), event.kind) {
                    entry.insert(kind);
                } else {
                    // Created + Removed = file never existed for us
                    entry.remove();
                }
            }
        }

        if self.pending.is_empty() {
            self.first_recorded = None;
            self.deadline = None;
            return;
        }

        let first = *self.first_recorded.get_or_insert(now);
        let cap = first + self.window * MAX_DELAY_WINDOWS;
        self.deadline = Some((now + self.window).min(cap));
    }

    /// Coalesce two change kinds for the same path.
    ///
    /// Returns `None` if both changes should be discarded (Create + Remove).
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
        use ChangeKind::{Create, Remove, Rename, Write};

        match (existing, new) {
            // A rename on either side leaves the path ambiguous
            (Rename, _) | (_, Rename) => Some(Rename),

            (Create, Create) => Some(Create), // Duplicate
            (Create, Write) => Some(Create),  // Content included in create
            (Create, Remove) => None,         // Temp file, never existed for us

            (Write, Create) => Some(Create), // File was recreated
            (Write, Write) => Some(Write),   // Normal debounce
            (Write, Remove) => Some(Remove), // File is gone

            (Remove, Create) => Some(Write),  // File was replaced
            (Remove, Write) => Some(Remove),  // Invalid state, ignore new
            (Remove, Remove) => Some(Remove), // Duplicate
        }
    }

    /// When the pending batch becomes ready, if anything is pending.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending batch if its deadline has passed at `now`.
    pub(crate) fn drain_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.first_recorded = None;
                self.deadline = None;
                self.pending
                    .drain()
                    .map(|(path, kind)| ChangeEvent { path, kind })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
