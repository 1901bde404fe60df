//! Error types for canvas-core operations.
//!
//! Invariant violations (switching to or closing an unknown id) are not errors:
//! those operations are no-ops that report `false`.

use std::path::PathBuf;

use canvas_protocol::ErrorInfo;

/// All errors that can occur in canvas-core operations.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // Inbound Event Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unknown remote event: {0}")]
    UnknownEvent(String),

    #[error("Malformed remote event {event}: {details}")]
    MalformedEvent { event: String, details: String },

    #[error("Invalid drift key: {0}")]
    InvalidDriftKey(String),

    // ─────────────────────────────────────────────────────────────────────
    // Daemon Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("Daemon rejected request: {code}: {message}")]
    Daemon { code: String, message: String },

    #[error("Canvas runtime has stopped")]
    RuntimeStopped,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ErrorInfo> for CanvasError {
    fn from(info: ErrorInfo) -> Self {
        CanvasError::Daemon {
            code: info.code,
            message: info.message,
        }
    }
}

/// Convenience type alias for Results using CanvasError.
pub type Result<T> = std::result::Result<T, CanvasError>;

impl From<CanvasError> for String {
    fn from(err: CanvasError) -> String {
        err.to_string()
    }
}
