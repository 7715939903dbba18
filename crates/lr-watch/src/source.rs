//! `notify`-backed change source.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};

use crate::event::{ChangeSender, channel};
use crate::filter::{DEFAULT_IGNORE_PATTERNS, IgnoreFilter};
use crate::{ChangeEvent, ChangeKind, ChangeStream, WatchError, WatchHandle};

/// Per-feed buffer between the OS watcher and the consumer.
const CHANNEL_CAPACITY: usize = 256;

/// Watches one root directory, recursively, through the platform's
/// recommended notify backend.
#[derive(Clone, Debug)]
pub struct FsChangeSource {
    root: PathBuf,
    ignore: Vec<String>,
}

impl FsChangeSource {
    /// Create a source for `root` with the default ignore patterns.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }

    /// Replace the ignore patterns (globs relative to the root).
    #[must_use]
    pub fn with_ignore(mut self, patterns: &[String]) -> Self {
        self.ignore = patterns.to_vec();
        self
    }

    /// Root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start watching.
    ///
    /// Events are delivered on the returned stream until the handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Init`] if the root cannot be resolved or the OS
    /// watch cannot be established, and [`WatchError::Pattern`] for an invalid
    /// ignore pattern.
    pub fn start(&self) -> Result<(ChangeStream, WatchHandle), WatchError> {
        let init_error = |source| WatchError::Init {
            path: self.root.clone(),
            source,
        };

        // Backends report canonical paths; match them when filtering
        let root = std::fs::canonicalize(&self.root)
            .map_err(|e| init_error(notify::Error::io(e)))?;
        let filter = IgnoreFilter::new(root.clone(), &self.ignore)?;
        let (tx, stream) = channel(CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res| {
            forward_notify_event(res, &filter, &tx);
        })
        .map_err(init_error)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(init_error)?;

        tracing::info!(root = %root.display(), "Watching for changes");

        Ok((stream, WatchHandle::new(watcher)))
    }
}

/// Convert a `notify::EventKind` to a `ChangeKind`.
///
/// Returns `None` for event kinds that are not mutations (e.g., Access).
fn change_kind(kind: EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
        EventKind::Modify(_) => Some(ChangeKind::Write),
        EventKind::Remove(_) => Some(ChangeKind::Remove),
        _ => None,
    }
}

/// Translate one notify callback result onto the change feeds.
fn forward_notify_event(
    res: Result<notify::Event, notify::Error>,
    filter: &IgnoreFilter,
    tx: &ChangeSender,
) {
    // Consumer is gone; the handle is about to be dropped
    if tx.is_closed() {
        return;
    }

    let event = match res {
        Ok(event) => event,
        Err(e) => {
            tx.send_error(WatchError::Runtime(e));
            return;
        }
    };

    let Some(kind) = change_kind(event.kind) else {
        return;
    };

    for path in event.paths {
        if filter.is_ignored(&path) {
            tracing::trace!(path = %path.display(), "Ignored change");
            continue;
        }
        tx.send_event(ChangeEvent { path, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn site_filter() -> IgnoreFilter {
        IgnoreFilter::new("/site", &["**/*.swp".to_owned()]).unwrap()
    }

    #[test]
    fn test_change_kind_mapping() {
        assert_eq!(
            change_kind(EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Create)
        );
        assert_eq!(
            change_kind(EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Write)
        );
        assert_eq!(
            change_kind(EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(ChangeKind::Rename)
        );
        assert_eq!(
            change_kind(EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Remove)
        );
        assert_eq!(change_kind(EventKind::Access(AccessKind::Read)), None);
        assert_eq!(change_kind(EventKind::Any), None);
    }

    #[tokio::test]
    async fn test_forward_event_per_path() {
        let (tx, mut stream) = channel(8);
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/site/a.html"))
            .add_path(PathBuf::from("/site/b.html"));

        forward_notify_event(Ok(event), &site_filter(), &tx);
        drop(tx);

        let mut paths = Vec::new();
        while let Some(event) = stream.events.recv().await {
            assert_eq!(event.kind, ChangeKind::Create);
            paths.push(event.path);
        }
        assert_eq!(
            paths,
            vec![PathBuf::from("/site/a.html"), PathBuf::from("/site/b.html")]
        );
    }

    #[tokio::test]
    async fn test_forward_skips_ignored_paths() {
        let (tx, mut stream) = channel(8);
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/site/.index.html.swp"));

        forward_notify_event(Ok(event), &site_filter(), &tx);

        assert!(stream.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forward_skips_access_events() {
        let (tx, mut stream) = channel(8);
        let event = notify::Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/site/index.html"));

        forward_notify_event(Ok(event), &site_filter(), &tx);

        assert!(stream.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forward_error_to_error_feed() {
        let (tx, mut stream) = channel(8);

        forward_notify_event(Err(notify::Error::generic("overflow")), &site_filter(), &tx);

        let err = stream.errors.try_recv().unwrap();
        assert!(matches!(err, WatchError::Runtime(_)));
        assert!(stream.events.try_recv().is_err());
    }

    #[test]
    fn test_forward_after_consumer_dropped() {
        let (tx, stream) = channel(8);
        drop(stream);
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/site/a.html"));

        forward_notify_event(Ok(event), &site_filter(), &tx);
        forward_notify_event(Err(notify::Error::generic("overflow")), &site_filter(), &tx);

        assert!(tx.is_closed());
    }

    #[test]
    fn test_start_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let source = FsChangeSource::new(temp.path().join("missing"));

        let result = source.start();

        assert!(matches!(result, Err(WatchError::Init { .. })));
    }

    #[test]
    fn test_start_invalid_pattern_fails() {
        let temp = TempDir::new().unwrap();
        let source = FsChangeSource::new(temp.path()).with_ignore(&["[".to_owned()]);

        let result = source.start();

        assert!(matches!(result, Err(WatchError::Pattern { .. })));
    }

    #[tokio::test]
    async fn test_start_reports_file_changes() {
        let temp = TempDir::new().unwrap();
        let source = FsChangeSource::new(temp.path());
        let (mut stream, _handle) = source.start().unwrap();

        std::fs::write(temp.path().join("index.html"), "<h1>hi</h1>").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), stream.events.recv())
            .await
            .expect("timed out waiting for change")
            .expect("stream closed");
        assert!(event.path.ends_with("index.html"));
    }
}
