//! Ignore rules applied before events leave the change source.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::WatchError;

/// Patterns ignored when none are configured.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[".git/**", "**/*.swp", "**/*~"];

/// Glob-based path filter, relative to a watch root.
#[derive(Clone, Debug)]
pub(crate) struct IgnoreFilter {
    root: PathBuf,
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    /// Compile `patterns` against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] for the first pattern that is not a valid glob.
    pub(crate) fn new(
        root: impl Into<PathBuf>,
        patterns: &[String],
    ) -> Result<Self, WatchError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| WatchError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            root: root.into(),
            patterns,
        })
    }

    /// Check whether `path` matches any ignore pattern.
    ///
    /// Paths outside the root are never ignored.
    pub(crate) fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        self.patterns.iter().any(|p| p.matches_path(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_filter() -> IgnoreFilter {
        let patterns: Vec<String> = DEFAULT_IGNORE_PATTERNS
            .iter()
            .map(|p| (*p).to_owned())
            .collect();
        IgnoreFilter::new("/site", &patterns).unwrap()
    }

    #[test]
    fn test_ignores_git_directory() {
        let filter = default_filter();

        assert!(filter.is_ignored(Path::new("/site/.git/HEAD")));
        assert!(filter.is_ignored(Path::new("/site/.git/objects/ab/cdef")));
    }

    #[test]
    fn test_ignores_editor_temp_files() {
        let filter = default_filter();

        assert!(filter.is_ignored(Path::new("/site/.index.html.swp")));
        assert!(filter.is_ignored(Path::new("/site/css/.main.css.swp")));
        assert!(filter.is_ignored(Path::new("/site/index.html~")));
    }

    #[test]
    fn test_keeps_regular_files() {
        let filter = default_filter();

        assert!(!filter.is_ignored(Path::new("/site/index.html")));
        assert!(!filter.is_ignored(Path::new("/site/js/app.js")));
    }

    #[test]
    fn test_outside_root_not_ignored() {
        let filter = default_filter();

        assert!(!filter.is_ignored(Path::new("/other/.git/HEAD")));
    }

    #[test]
    fn test_empty_patterns_ignore_nothing() {
        let filter = IgnoreFilter::new("/site", &[]).unwrap();

        assert!(!filter.is_ignored(Path::new("/site/.git/HEAD")));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = IgnoreFilter::new("/site", &["[".to_owned()]).unwrap_err();

        assert!(matches!(err, WatchError::Pattern { ref pattern, .. } if pattern == "["));
    }
}
