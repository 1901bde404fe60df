//! Storage configuration and path management for the canvas engine.
//!
//! Every path the engine, daemon and CLI touch is derived here so tests can
//! inject a temp root with `StorageConfig::with_root()`.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{CanvasError, Result};

pub const SOCKET_ENV: &str = "CANVAS_DAEMON_SOCKET";
const ROOT_DIR_NAME: &str = ".canvas-sync";
const SOCKET_NAME: &str = "canvasd.sock";

/// Central configuration for all canvas storage paths.
///
/// Production code uses `StorageConfig::from_home()` which points to
/// `~/.canvas-sync/`.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(CanvasError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(ROOT_DIR_NAME),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Engine configuration (debounce window, Follow AI default, limits).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("canvas.json")
    }

    /// Persisted canvas projection restored on start.
    pub fn canvas_state_file(&self) -> PathBuf {
        self.root.join("canvas-state.json")
    }

    pub fn daemon_config_file(&self) -> PathBuf {
        self.root.join("canvasd.toml")
    }

    /// Daemon socket; `CANVAS_DAEMON_SOCKET` wins when set.
    pub fn socket_path(&self) -> PathBuf {
        match env::var(SOCKET_ENV) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => self.root.join(SOCKET_NAME),
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_root() {
        let storage = StorageConfig::with_root(PathBuf::from("/tmp/canvas-test"));
        assert_eq!(
            storage.config_file(),
            PathBuf::from("/tmp/canvas-test/canvas.json")
        );
        assert_eq!(
            storage.canvas_state_file(),
            PathBuf::from("/tmp/canvas-test/canvas-state.json")
        );
        assert_eq!(
            storage.daemon_config_file(),
            PathBuf::from("/tmp/canvas-test/canvasd.toml")
        );
        assert_eq!(storage.logs_dir(), PathBuf::from("/tmp/canvas-test/logs"));
    }
}
