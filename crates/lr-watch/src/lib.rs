//! Filesystem change source for the lr live-reload server.
//!
//! Wraps OS-level filesystem notifications (via [`notify`]) into a sequential
//! stream of typed [`ChangeEvent`]s plus a parallel feed of runtime
//! [`WatchError`]s. The source knows nothing about clients or broadcasting;
//! consumers receive a [`ChangeStream`] and decide what a change means.
//!
//! # Example
//!
//! ```ignore
//! use lr_watch::FsChangeSource;
//!
//! let source = FsChangeSource::new("site").with_ignore(&["**/*.tmp".to_owned()]);
//! let (mut stream, handle) = source.start()?;
//!
//! while let Some(event) = stream.events.recv().await {
//!     println!("{} {:?}", event.path.display(), event.kind);
//! }
//!
//! // Dropping the handle stops watching and closes the stream.
//! drop(handle);
//! ```

mod error;
mod event;
mod filter;
mod source;

pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind, ChangeSender, ChangeStream, WatchHandle, channel};
pub use filter::DEFAULT_IGNORE_PATTERNS;
pub use source::FsChangeSource;
