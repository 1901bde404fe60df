//! Daemon paths and `canvasd.toml`.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const ROOT_DIR: &str = ".canvas-sync";
const SOCKET_NAME: &str = "canvasd.sock";
const CONFIG_NAME: &str = "canvasd.toml";
const SOCKET_ENV: &str = "CANVAS_DAEMON_SOCKET";

const DEFAULT_EVENT_LOG_LIMIT: usize = 500;
const DEFAULT_COMMAND_QUEUE_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Canvas event records kept for `get_canvas_events`
    pub event_log_limit: usize,
    /// Queued commands kept before the oldest are dropped
    pub command_queue_limit: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            event_log_limit: DEFAULT_EVENT_LOG_LIMIT,
            command_queue_limit: DEFAULT_COMMAND_QUEUE_LIMIT,
        }
    }
}

fn root_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(ROOT_DIR))
}

pub fn socket_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var(SOCKET_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(root_dir()?.join(SOCKET_NAME))
}

pub fn config_path() -> Result<PathBuf, String> {
    Ok(root_dir()?.join(CONFIG_NAME))
}

/// Missing file → defaults. Unparseable file → error.
pub fn load_config(path: &Path) -> Result<DaemonConfig, String> {
    if !path.exists() {
        return Ok(DaemonConfig::default());
    }

    let content = fs_err::read_to_string(path)
        .map_err(|err| format!("Failed to read daemon config {}: {}", path.display(), err))?;
    toml::from_str::<DaemonConfig>(&content)
        .map_err(|err| format!("Failed to parse daemon config {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(&dir.path().join("canvasd.toml")).expect("load");
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("canvasd.toml");
        fs_err::write(&path, "event_log_limit = 20\n").expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.event_log_limit, 20);
        assert_eq!(config.command_queue_limit, DEFAULT_COMMAND_QUEUE_LIMIT);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("canvasd.toml");
        fs_err::write(&path, "event_log_limit = \"lots\"\n").expect("write");
        assert!(load_config(&path).is_err());
    }
}
