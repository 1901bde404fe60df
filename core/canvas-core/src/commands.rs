//! Typed inbound remote events, decoded from `(event name, envelope)` pairs.

use canvas_protocol::envelope::{
    ContextTargetPayload, DriftDecisionPayload, OpenCollectionRequestPayload,
    OpenRequestTabPayload,
};
use canvas_protocol::{
    CanvasCommand, DriftKey, DriftReviewStatus, ErrorInfo, EventEnvelope, RemoteEventName,
};

use crate::error::{CanvasError, Result};
use crate::gating::CommandKind;

/// A tab command subject to gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    SwitchTab { context_id: String },
    OpenRequestTab { label: Option<String> },
    CloseTab { context_id: String },
    OpenCollectionRequest(OpenCollectionRequestPayload),
}

impl RemoteCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            RemoteCommand::SwitchTab { .. } => CommandKind::SwitchTab,
            RemoteCommand::OpenRequestTab { .. } => CommandKind::OpenRequestTab,
            RemoteCommand::CloseTab { .. } => CommandKind::CloseTab,
            RemoteCommand::OpenCollectionRequest(_) => CommandKind::OpenCollectionRequest,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Canvas {
        command: RemoteCommand,
        envelope: EventEnvelope,
    },
    /// Daemon confirmation of a drift decision. Never pushed back out.
    DriftConfirmed {
        key: DriftKey,
        status: DriftReviewStatus,
        envelope: EventEnvelope,
    },
}

impl RemoteEvent {
    pub fn envelope(&self) -> &EventEnvelope {
        match self {
            RemoteEvent::Canvas { envelope, .. } | RemoteEvent::DriftConfirmed { envelope, .. } => {
                envelope
            }
        }
    }
}

/// Decodes one named event. Unknown names and payloads that do not match the
/// event's shape are errors for the caller to log and drop.
pub fn parse_remote_event(event: &str, envelope: EventEnvelope) -> Result<RemoteEvent> {
    let name =
        RemoteEventName::parse(event).ok_or_else(|| CanvasError::UnknownEvent(event.to_string()))?;
    envelope
        .validate()
        .map_err(|info| malformed(event, info))?;

    let command = match name {
        RemoteEventName::SwitchTab => {
            let payload: ContextTargetPayload =
                envelope.payload_as().map_err(|info| malformed(event, info))?;
            RemoteCommand::SwitchTab {
                context_id: payload.context_id,
            }
        }
        RemoteEventName::CloseTab => {
            let payload: ContextTargetPayload =
                envelope.payload_as().map_err(|info| malformed(event, info))?;
            RemoteCommand::CloseTab {
                context_id: payload.context_id,
            }
        }
        RemoteEventName::OpenRequestTab => {
            let payload: OpenRequestTabPayload = if envelope.payload.is_null() {
                OpenRequestTabPayload::default()
            } else {
                envelope.payload_as().map_err(|info| malformed(event, info))?
            };
            RemoteCommand::OpenRequestTab {
                label: payload.label,
            }
        }
        RemoteEventName::OpenCollectionRequest => {
            let payload: OpenCollectionRequestPayload =
                envelope.payload_as().map_err(|info| malformed(event, info))?;
            RemoteCommand::OpenCollectionRequest(payload)
        }
        RemoteEventName::DriftChangeAccepted | RemoteEventName::DriftChangeDismissed => {
            let payload: DriftDecisionPayload =
                envelope.payload_as().map_err(|info| malformed(event, info))?;
            if payload.collection_id.is_empty() || payload.method.is_empty() {
                return Err(CanvasError::InvalidDriftKey(format!(
                    "{}:{}:{}",
                    payload.collection_id, payload.method, payload.path
                )));
            }
            let status = if name == RemoteEventName::DriftChangeAccepted {
                DriftReviewStatus::Accepted
            } else {
                DriftReviewStatus::Ignored
            };
            return Ok(RemoteEvent::DriftConfirmed {
                key: DriftKey::new(payload.collection_id, payload.method, payload.path),
                status,
                envelope,
            });
        }
    };

    Ok(RemoteEvent::Canvas { command, envelope })
}

impl TryFrom<CanvasCommand> for RemoteEvent {
    type Error = CanvasError;

    fn try_from(command: CanvasCommand) -> Result<Self> {
        parse_remote_event(&command.event, command.envelope)
    }
}

fn malformed(event: &str, info: ErrorInfo) -> CanvasError {
    CanvasError::MalformedEvent {
        event: event.to_string(),
        details: info.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_protocol::envelope::{DRIFT_CHANGE_DISMISSED, OPEN_REQUEST_TAB, SWITCH_TAB};
    use canvas_protocol::Actor;
    use serde_json::{json, Value};

    fn envelope(payload: Value) -> EventEnvelope {
        EventEnvelope::new(Actor::ai(Some("m".into()), None), payload)
    }

    #[test]
    fn decodes_switch_tab() {
        let event = parse_remote_event(SWITCH_TAB, envelope(json!({"contextId": "request-1"})))
            .unwrap();
        match event {
            RemoteEvent::Canvas { command, envelope } => {
                assert_eq!(
                    command,
                    RemoteCommand::SwitchTab {
                        context_id: "request-1".into()
                    }
                );
                assert!(envelope.actor.is_ai());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn open_request_tab_accepts_missing_payload() {
        let event = parse_remote_event(OPEN_REQUEST_TAB, envelope(Value::Null)).unwrap();
        assert!(matches!(
            event,
            RemoteEvent::Canvas {
                command: RemoteCommand::OpenRequestTab { label: None },
                ..
            }
        ));
    }

    #[test]
    fn dismissed_maps_to_ignored() {
        let event = parse_remote_event(
            DRIFT_CHANGE_DISMISSED,
            envelope(json!({"collectionId": "col_1", "method": "GET", "path": "/a:b"})),
        )
        .unwrap();
        match event {
            RemoteEvent::DriftConfirmed { key, status, .. } => {
                assert_eq!(status, DriftReviewStatus::Ignored);
                assert_eq!(key.path, "/a:b");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = parse_remote_event("canvas:teleport", envelope(json!({}))).unwrap_err();
        assert!(matches!(err, CanvasError::UnknownEvent(_)));
    }

    #[test]
    fn wrong_payload_shape_is_malformed() {
        let err = parse_remote_event(SWITCH_TAB, envelope(json!({"tab": 3}))).unwrap_err();
        assert!(matches!(err, CanvasError::MalformedEvent { .. }));
    }

    #[test]
    fn drift_event_without_collection_is_invalid_key() {
        let err = parse_remote_event(
            DRIFT_CHANGE_DISMISSED,
            envelope(json!({"collection_id": "", "method": "GET", "path": "/"})),
        )
        .unwrap_err();
        assert!(matches!(err, CanvasError::InvalidDriftKey(_)));
    }

    #[test]
    fn converts_from_daemon_command() {
        let command = CanvasCommand {
            event: SWITCH_TAB.to_string(),
            envelope: envelope(json!({"contextId": "openapi"})),
        };
        let event = RemoteEvent::try_from(command).unwrap();
        assert!(event.envelope().actor.is_ai());
    }
}
