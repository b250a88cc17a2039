//! Per-event scratch file naming and cleanup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

/// Turns an event id into a file stem that cannot escape its directory.
pub fn safe_file_stem(event_id: &str) -> String {
    event_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// Where the decoded thumbnail of `event_id` is written.
pub fn thumbnail_path(dir: &Path, event_id: &str) -> PathBuf {
    dir.join(format!("{}.jpg", safe_file_stem(event_id)))
}

/// Where the downloaded clip of `event_id` is written.
pub fn clip_path(dir: &Path, event_id: &str) -> PathBuf {
    dir.join(format!("{}.mp4", safe_file_stem(event_id)))
}

/// Files removed when the guard is dropped.
///
/// Missing files are ignored; other removal failures are logged.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file for removal.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Releases the guard without removing anything.
    pub fn keep(mut self) {
        self.paths.clear();
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => trace!(path = %path.display(), "removed temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
            }
        }
    }
}
