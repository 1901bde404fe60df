//! Inbound remote events: names, the provenance envelope and payload shapes.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{Actor, ErrorInfo};

pub const SWITCH_TAB: &str = "canvas:switch_tab";
pub const OPEN_REQUEST_TAB: &str = "canvas:open_request_tab";
pub const CLOSE_TAB: &str = "canvas:close_tab";
pub const OPEN_COLLECTION_REQUEST: &str = "canvas:open_collection_request";
pub const DRIFT_CHANGE_ACCEPTED: &str = "drift:change-accepted";
pub const DRIFT_CHANGE_DISMISSED: &str = "drift:change-dismissed";

const MAX_CORRELATION_ID_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteEventName {
    SwitchTab,
    OpenRequestTab,
    CloseTab,
    OpenCollectionRequest,
    DriftChangeAccepted,
    DriftChangeDismissed,
}

impl RemoteEventName {
    pub const ALL: [RemoteEventName; 6] = [
        RemoteEventName::SwitchTab,
        RemoteEventName::OpenRequestTab,
        RemoteEventName::CloseTab,
        RemoteEventName::OpenCollectionRequest,
        RemoteEventName::DriftChangeAccepted,
        RemoteEventName::DriftChangeDismissed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteEventName::SwitchTab => SWITCH_TAB,
            RemoteEventName::OpenRequestTab => OPEN_REQUEST_TAB,
            RemoteEventName::CloseTab => CLOSE_TAB,
            RemoteEventName::OpenCollectionRequest => OPEN_COLLECTION_REQUEST,
            RemoteEventName::DriftChangeAccepted => DRIFT_CHANGE_ACCEPTED,
            RemoteEventName::DriftChangeDismissed => DRIFT_CHANGE_DISMISSED,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == value)
    }
}

/// Provenance wrapper around every inbound command payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    pub actor: Actor,
    pub timestamp: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub lamport: Option<u64>,
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    pub fn new(actor: Actor, payload: Value) -> Self {
        Self {
            actor,
            timestamp: chrono::Utc::now().to_rfc3339(),
            correlation_id: None,
            lamport: None,
            payload,
        }
    }

    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if DateTime::parse_from_rfc3339(&self.timestamp).is_err() {
            return Err(ErrorInfo::new(
                "invalid_timestamp",
                "timestamp must be RFC3339",
            ));
        }
        if let Some(correlation_id) = &self.correlation_id {
            if correlation_id.len() > MAX_CORRELATION_ID_LEN {
                return Err(ErrorInfo::new(
                    "invalid_correlation_id",
                    "correlation_id must be 128 characters or fewer",
                ));
            }
        }
        Ok(())
    }

    /// Decodes the payload into the shape expected for `T`.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ErrorInfo> {
        serde_json::from_value(self.payload.clone()).map_err(|err| {
            ErrorInfo::new("invalid_payload", format!("payload is invalid: {}", err))
        })
    }
}

/// Payload of `canvas:switch_tab` and `canvas:close_tab`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextTargetPayload {
    #[serde(rename = "contextId")]
    pub context_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenRequestTabPayload {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenCollectionRequestPayload {
    pub collection_id: String,
    pub request_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Payload of the `drift:*` confirmation events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriftDecisionPayload {
    #[serde(alias = "collectionId")]
    pub collection_id: String,
    pub method: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_names_round_trip_through_parse() {
        for name in RemoteEventName::ALL {
            assert_eq!(RemoteEventName::parse(name.as_str()), Some(name));
        }
        assert_eq!(RemoteEventName::parse("canvas:explode"), None);
    }

    #[test]
    fn envelope_defaults_optional_fields() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "actor": {"type": "ai"},
            "timestamp": "2026-02-01T10:00:00Z",
            "payload": {"contextId": "request-1"}
        }))
        .unwrap();
        assert!(envelope.correlation_id.is_none());
        assert!(envelope.lamport.is_none());
        assert!(envelope.validate().is_ok());
        let target: ContextTargetPayload = envelope.payload_as().unwrap();
        assert_eq!(target.context_id, "request-1");
    }

    #[test]
    fn envelope_rejects_bad_timestamp() {
        let mut envelope = EventEnvelope::new(Actor::User, json!({}));
        envelope.timestamp = "yesterday".to_string();
        assert!(envelope.validate().is_err());
    }

    #[test]
    fn envelope_rejects_long_correlation_id() {
        let mut envelope = EventEnvelope::new(Actor::User, json!({}));
        envelope.correlation_id = Some("c".repeat(200));
        assert!(envelope.validate().is_err());
    }

    #[test]
    fn collection_request_payload_defaults_headers_and_body() {
        let envelope = EventEnvelope::new(
            Actor::ai(None, None),
            json!({"collection_id": "col_1", "request_id": "req_1", "name": "List users"}),
        );
        let payload: OpenCollectionRequestPayload = envelope.payload_as().unwrap();
        assert!(payload.headers.is_empty());
        assert!(payload.body.is_none());
        assert_eq!(payload.name, "List users");
    }

    #[test]
    fn switch_payload_requires_context_id() {
        let envelope = EventEnvelope::new(Actor::User, json!({"tab_id": "x"}));
        assert!(envelope.payload_as::<ContextTargetPayload>().is_err());
    }
}
