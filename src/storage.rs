//! Local persistence for the player's display name.
//!
//! The only thing this client persists. The name is written as a single
//! line to a configurable path on every successful name submission and
//! loaded once at session start. A missing file or any read/write
//! failure is non-fatal and degrades to an empty name.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// File-backed store for the display name.
#[derive(Debug, Clone)]
pub struct NameStore {
    path: PathBuf,
}

impl NameStore {
    /// Create a store backed by `path`. The file and its parent directory
    /// are created lazily on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved name. Returns `None` when the file is absent,
    /// unreadable, or holds only whitespace.
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let name = contents.trim();
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_owned())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), "failed to load player name: {e}");
                None
            }
        }
    }

    /// Persist `name`. Failures are logged and swallowed.
    pub fn save(&self, name: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %self.path.display(), "failed to create name store directory: {e}");
                return;
            }
        }
        if let Err(e) = fs::write(&self.path, name) {
            warn!(path = %self.path.display(), "failed to save player name: {e}");
        }
    }
}
