//! Engine configuration loading and saving.
//!
//! A missing file yields defaults; a malformed file is an error so a typo
//! does not silently reset the user's Follow AI preference.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CanvasError, Result};

const DEFAULT_DEBOUNCE_MS: u64 = 100;
const DEFAULT_ACTIVITY_LIMIT: usize = 200;
const DEFAULT_HISTORY_LIMIT: usize = 50;
const DEFAULT_COMMAND_POLL_MS: u64 = 250;
const DEFAULT_COMMAND_POLL_MAX_BACKOFF_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub debounce_ms: u64,
    pub follow_ai: bool,
    pub activity_limit: usize,
    pub history_limit: usize,
    pub command_poll_ms: u64,
    pub command_poll_max_backoff_ms: u64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            follow_ai: true,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            command_poll_ms: DEFAULT_COMMAND_POLL_MS,
            command_poll_max_backoff_ms: DEFAULT_COMMAND_POLL_MAX_BACKOFF_MS,
        }
    }
}

impl CanvasConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_millis(self.command_poll_ms.max(1))
    }

    pub fn command_poll_max_backoff(&self) -> Duration {
        Duration::from_millis(
            self.command_poll_max_backoff_ms
                .max(self.command_poll_ms.max(1)),
        )
    }
}

pub fn load_config(path: &Path) -> Result<CanvasConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CanvasConfig::default())
        }
        Err(source) => {
            return Err(CanvasError::Io {
                context: format!("reading {}", path.display()),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(CanvasConfig::default());
    }

    serde_json::from_str(&content).map_err(|err| CanvasError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

pub fn save_config(path: &Path, config: &CanvasConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CanvasError::Io {
            context: "creating config directory".to_string(),
            source,
        })?;
    }
    let content = serde_json::to_string_pretty(config).map_err(|source| CanvasError::Json {
        context: "serializing config".to_string(),
        source,
    })?;
    fs::write(path, content).map_err(|source| CanvasError::Io {
        context: format!("writing {}", path.display()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(&dir.path().join("canvas.json")).expect("config");
        assert_eq!(config, CanvasConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert!(config.follow_ai);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("canvas.json");
        fs::write(&path, r#"{"follow_ai": false, "debounce_ms": 40}"#).expect("write");

        let config = load_config(&path).expect("config");
        assert!(!config.follow_ai);
        assert_eq!(config.debounce_ms, 40);
        assert_eq!(config.activity_limit, 200);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("canvas.json");
        fs::write(&path, "{not json").expect("write");

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, CanvasError::ConfigMalformed { .. }));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("canvas.json");
        let config = CanvasConfig {
            follow_ai: false,
            history_limit: 5,
            ..CanvasConfig::default()
        };
        save_config(&path, &config).expect("save");
        assert_eq!(load_config(&path).expect("load"), config);
    }

    #[test]
    fn backoff_never_below_poll_interval() {
        let config = CanvasConfig {
            command_poll_ms: 800,
            command_poll_max_backoff_ms: 100,
            ..CanvasConfig::default()
        };
        assert_eq!(config.command_poll_max_backoff(), Duration::from_millis(800));
    }
}
