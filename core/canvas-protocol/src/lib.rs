//! IPC protocol types and validation for canvasd.
//!
//! This crate is shared by the canvas engine, the daemon and the CLI so the
//! snapshot, hint and envelope shapes cannot drift apart. The daemon remains
//! the authority on validation, but clients reuse the same types to build
//! valid requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod actor;
mod drift;
pub mod envelope;
mod snapshot;

pub use actor::Actor;
pub use drift::{DriftKey, DriftReviewStatus};
pub use envelope::{EventEnvelope, RemoteEventName};
pub use snapshot::{CanvasEventHint, CanvasStateSnapshot, TabSummary, TabType, TemplateSummary};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    GetHealth,
    SyncCanvasState,
    GetCanvasState,
    GetCanvasEvents,
    SetDriftReviewDecision,
    GetDriftReviewDecisions,
    CanvasCommand,
    DrainCanvasCommands,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(method: Method, id: Option<String>, params: Option<Value>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            method,
            id,
            params,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

/// Params of `sync_canvas_state`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SyncCanvasStateParams {
    pub snapshot: CanvasStateSnapshot,
    pub event_hint: CanvasEventHint,
    pub actor: Actor,
}

/// Params of `set_drift_review_decision`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetDriftReviewDecisionParams {
    pub collection_id: String,
    pub method: String,
    pub path: String,
    pub status: DriftReviewStatus,
    #[serde(default)]
    pub actor: Actor,
}

impl SetDriftReviewDecisionParams {
    pub fn key(&self) -> DriftKey {
        DriftKey::new(&self.collection_id, &self.method, &self.path)
    }
}

/// One inbound canvas command, as queued by the daemon and drained by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasCommand {
    pub event: String,
    pub envelope: EventEnvelope,
}

impl CanvasCommand {
    pub fn validate(&self) -> Result<RemoteEventName, ErrorInfo> {
        let name = RemoteEventName::parse(&self.event).ok_or_else(|| {
            ErrorInfo::new("unknown_event", format!("unknown event {:?}", self.event))
        })?;
        self.envelope.validate()?;
        Ok(name)
    }
}

/// Audit record the daemon keeps for each accepted sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasEventRecord {
    pub event_type: String,
    pub detail: CanvasEventHint,
    pub actor: Actor,
    pub active_tab_id: Option<String>,
    pub recorded_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriftDecisionRecord {
    pub key: String,
    pub status: DriftReviewStatus,
    pub actor: Actor,
    pub updated_at: String,
}

pub fn parse_sync_params(params: Value) -> Result<SyncCanvasStateParams, ErrorInfo> {
    serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("sync payload is invalid JSON: {}", err),
        )
    })
}

pub fn parse_drift_params(params: Value) -> Result<SetDriftReviewDecisionParams, ErrorInfo> {
    let parsed: SetDriftReviewDecisionParams = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("drift decision payload is invalid JSON: {}", err),
        )
    })?;
    require_non_empty(&parsed.collection_id, "collection_id")?;
    require_non_empty(&parsed.method, "method")?;
    Ok(parsed)
}

pub fn parse_canvas_command(params: Value) -> Result<CanvasCommand, ErrorInfo> {
    let command: CanvasCommand = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("canvas command is invalid JSON: {}", err),
        )
    })?;
    command.validate()?;
    Ok(command)
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "missing_field",
            format!("{} is required", field),
        ));
    }
    Ok(())
}
