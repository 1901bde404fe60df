use std::collections::BTreeMap;

use canvas_core::{DaemonClient, RemoteEvent, StorageConfig, SyncBoundary};
use canvas_protocol::envelope::{
    CLOSE_TAB, OPEN_COLLECTION_REQUEST, OPEN_REQUEST_TAB, SWITCH_TAB,
};
use canvas_protocol::{Actor, CanvasCommand, DriftKey, DriftReviewStatus, EventEnvelope};
use serde_json::{json, Value};

use crate::ActorArgs;

pub struct OpenRequest {
    pub collection_id: String,
    pub request_id: String,
    pub name: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<String>,
    pub body: Option<String>,
}

fn client() -> Result<DaemonClient, String> {
    let storage = StorageConfig::from_home().map_err(|err| err.to_string())?;
    Ok(DaemonClient::from_storage(&storage))
}

fn print(value: &Value) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{}", rendered);
    Ok(())
}

pub fn health() -> Result<(), String> {
    print(&client()?.health().map_err(|err| err.to_string())?)
}

pub fn state() -> Result<(), String> {
    print(&client()?.canvas_state().map_err(|err| err.to_string())?)
}

pub fn events(limit: Option<usize>) -> Result<(), String> {
    print(&client()?.canvas_events(limit).map_err(|err| err.to_string())?)
}

pub fn drift_list() -> Result<(), String> {
    print(&client()?.drift_decisions().map_err(|err| err.to_string())?)
}

pub fn switch_tab(context_id: &str, actor: &ActorArgs) -> Result<(), String> {
    send(SWITCH_TAB, json!({ "contextId": context_id }), actor)
}

pub fn open_tab(label: Option<String>, actor: &ActorArgs) -> Result<(), String> {
    send(OPEN_REQUEST_TAB, json!({ "label": label }), actor)
}

pub fn close_tab(context_id: &str, actor: &ActorArgs) -> Result<(), String> {
    send(CLOSE_TAB, json!({ "contextId": context_id }), actor)
}

pub fn open_request(request: OpenRequest, actor: &ActorArgs) -> Result<(), String> {
    let headers = parse_headers(&request.headers)?;
    let payload = json!({
        "collection_id": request.collection_id,
        "request_id": request.request_id,
        "name": request.name,
        "method": request.method.to_uppercase(),
        "url": request.url,
        "headers": headers,
        "body": request.body,
    });
    send(OPEN_COLLECTION_REQUEST, payload, actor)
}

pub fn drift_set(
    collection_id: &str,
    method: &str,
    path: &str,
    status: &str,
    actor: &ActorArgs,
) -> Result<(), String> {
    let status = DriftReviewStatus::parse(status)
        .ok_or_else(|| format!("Unknown drift status {:?} (pending, accepted, ignored)", status))?;
    let key = DriftKey::new(collection_id, method.to_uppercase(), path);
    client()?
        .set_drift_review_decision(&key, status, &resolve_actor(actor))
        .map_err(|err| err.to_string())?;
    tracing::info!(key = %key.encode(), status = status.as_str(), "Drift decision sent");
    print(&json!({ "key": key.encode(), "status": status.as_str() }))
}

fn resolve_actor(args: &ActorArgs) -> Actor {
    if args.as_user {
        Actor::User
    } else {
        Actor::ai(args.model.clone(), args.session.clone())
    }
}

/// Checks the command decodes the way the engine will decode it, then queues it.
fn send(event: &str, payload: Value, actor: &ActorArgs) -> Result<(), String> {
    let command = build_command(event, payload, actor)?;
    let response = client()?
        .send_canvas_command(&command)
        .map_err(|err| err.to_string())?;
    tracing::info!(
        event,
        correlation_id = ?command.envelope.correlation_id,
        lamport = ?response.get("lamport"),
        "Canvas command queued"
    );
    print(&response)
}

fn build_command(event: &str, payload: Value, actor: &ActorArgs) -> Result<CanvasCommand, String> {
    let mut envelope = EventEnvelope::new(resolve_actor(actor), payload);
    envelope.correlation_id = Some(uuid::Uuid::new_v4().to_string());
    let command = CanvasCommand {
        event: event.to_string(),
        envelope,
    };
    RemoteEvent::try_from(command.clone()).map_err(|err| err.to_string())?;
    Ok(command)
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    raw.iter()
        .map(|header| {
            let (name, value) = header
                .split_once(':')
                .ok_or_else(|| format!("Header {:?} must look like 'Name: value'", header))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("Header {:?} has an empty name", header));
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_default_to_ai_attribution() {
        let command = build_command(
            SWITCH_TAB,
            json!({"contextId": "request-1"}),
            &ActorArgs {
                model: Some("assistant".into()),
                ..ActorArgs::default()
            },
        )
        .unwrap();
        assert!(command.envelope.actor.is_ai());
        assert!(command.envelope.correlation_id.is_some());

        let user = build_command(
            CLOSE_TAB,
            json!({"contextId": "request-1"}),
            &ActorArgs {
                as_user: true,
                ..ActorArgs::default()
            },
        )
        .unwrap();
        assert_eq!(user.envelope.actor, Actor::User);
    }

    #[test]
    fn malformed_payload_is_rejected_before_sending() {
        let err = build_command(SWITCH_TAB, json!({"id": "x"}), &ActorArgs::default());
        assert!(err.is_err());
    }

    #[test]
    fn headers_split_on_first_colon() {
        let headers = parse_headers(&[
            "Accept: application/json".to_string(),
            "X-Url: http://a:b".to_string(),
        ])
        .unwrap();
        assert_eq!(headers["Accept"], "application/json");
        assert_eq!(headers["X-Url"], "http://a:b");
        assert!(parse_headers(&["nope".to_string()]).is_err());
    }
}
