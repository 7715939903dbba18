//! Change source errors.

use std::path::PathBuf;

/// Error raised by a change source.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watch could not be established. Nothing will be observed.
    #[error("Failed to watch {}: {source}", path.display())]
    Init {
        /// Root directory that could not be watched.
        path: PathBuf,
        /// Underlying notify error.
        #[source]
        source: notify::Error,
    },
    /// An ignore pattern is not a valid glob.
    #[error("Invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },
    /// The OS watch reported an error while already running.
    #[error("Watch error: {0}")]
    Runtime(#[source] notify::Error),
}

impl WatchError {
    /// Returns `true` if the watch keeps running after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }
}
