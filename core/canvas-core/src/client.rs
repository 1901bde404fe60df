//! Client for the canvasd socket, and the boundary traits the runtime talks to.
//!
//! One request per connection: write a JSON line, read a JSON line back.
//! Failures are returned to the caller; the runtime logs them and moves on.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canvas_protocol::{
    Actor, CanvasCommand, CanvasEventHint, CanvasStateSnapshot, DriftKey, DriftReviewStatus,
    Method, Request, Response, SetDriftReviewDecisionParams, SyncCanvasStateParams,
    MAX_REQUEST_BYTES,
};
use serde_json::Value;

use crate::error::{CanvasError, Result};
use crate::storage::StorageConfig;

const READ_TIMEOUT_MS: u64 = 600;
const WRITE_TIMEOUT_MS: u64 = 600;

/// Outbound calls made from the background worker.
pub trait SyncBoundary: Send + Sync {
    fn sync_canvas_state(&self, params: &SyncCanvasStateParams) -> Result<()>;

    fn set_drift_review_decision(
        &self,
        key: &DriftKey,
        status: DriftReviewStatus,
        actor: &Actor,
    ) -> Result<()>;
}

/// Where queued inbound commands are drained from.
pub trait CommandSource: Send + Sync {
    fn drain_commands(&self) -> Result<Vec<CanvasCommand>>;
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket: PathBuf,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket: PathBuf) -> Self {
        Self {
            socket,
            read_timeout: Duration::from_millis(READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(WRITE_TIMEOUT_MS),
        }
    }

    pub fn from_storage(storage: &StorageConfig) -> Self {
        Self::new(storage.socket_path())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    /// Sends one request and returns the response `data` (or `null`).
    pub fn request(&self, method: Method, params: Option<Value>) -> Result<Value> {
        let request = Request::new(method, Some(uuid::Uuid::new_v4().to_string()), params);
        let response = self.send_request(&request)?;
        if response.ok {
            return Ok(response.data.unwrap_or(Value::Null));
        }
        match response.error {
            Some(info) => Err(info.into()),
            None => Err(CanvasError::Daemon {
                code: "unknown".to_string(),
                message: "Unknown daemon error".to_string(),
            }),
        }
    }

    pub fn health(&self) -> Result<Value> {
        self.request(Method::GetHealth, None)
    }

    pub fn canvas_state(&self) -> Result<Value> {
        self.request(Method::GetCanvasState, None)
    }

    pub fn canvas_events(&self, limit: Option<usize>) -> Result<Value> {
        let params = limit.map(|limit| serde_json::json!({ "limit": limit }));
        self.request(Method::GetCanvasEvents, params)
    }

    pub fn drift_decisions(&self) -> Result<Value> {
        self.request(Method::GetDriftReviewDecisions, None)
    }

    pub fn send_canvas_command(&self, command: &CanvasCommand) -> Result<Value> {
        self.request(Method::CanvasCommand, Some(to_params(command, "canvas command")?))
    }

    pub fn push_snapshot(
        &self,
        snapshot: CanvasStateSnapshot,
        event_hint: CanvasEventHint,
        actor: Actor,
    ) -> Result<()> {
        self.sync_canvas_state(&SyncCanvasStateParams {
            snapshot,
            event_hint,
            actor,
        })
    }

    fn send_request(&self, request: &Request) -> Result<Response> {
        let mut stream = UnixStream::connect(&self.socket).map_err(|err| {
            CanvasError::DaemonUnavailable(format!(
                "Failed to connect to {}: {}",
                self.socket.display(),
                err
            ))
        })?;
        let _ = stream.set_read_timeout(Some(self.read_timeout));
        let _ = stream.set_write_timeout(Some(self.write_timeout));

        let mut payload = serde_json::to_vec(request).map_err(|source| CanvasError::Json {
            context: "serializing daemon request".to_string(),
            source,
        })?;
        payload.push(b'\n');
        stream.write_all(&payload).map_err(|source| CanvasError::Io {
            context: "writing daemon request".to_string(),
            source,
        })?;
        stream.flush().ok();

        read_response(&mut stream)
    }
}

impl SyncBoundary for DaemonClient {
    fn sync_canvas_state(&self, params: &SyncCanvasStateParams) -> Result<()> {
        self.request(Method::SyncCanvasState, Some(to_params(params, "sync params")?))
            .map(|_| ())
    }

    fn set_drift_review_decision(
        &self,
        key: &DriftKey,
        status: DriftReviewStatus,
        actor: &Actor,
    ) -> Result<()> {
        let params = SetDriftReviewDecisionParams {
            collection_id: key.collection_id.clone(),
            method: key.method.clone(),
            path: key.path.clone(),
            status,
            actor: actor.clone(),
        };
        self.request(
            Method::SetDriftReviewDecision,
            Some(to_params(&params, "drift decision")?),
        )
        .map(|_| ())
    }
}

impl CommandSource for DaemonClient {
    fn drain_commands(&self) -> Result<Vec<CanvasCommand>> {
        let data = self.request(Method::DrainCanvasCommands, None)?;
        let commands = data.get("commands").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(commands).map_err(|source| CanvasError::Json {
            context: "parsing drained canvas commands".to_string(),
            source,
        })
    }
}

fn to_params<T: serde::Serialize>(value: &T, label: &str) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| CanvasError::Json {
        context: format!("serializing {}", label),
        source,
    })
}

fn read_response(stream: &mut UnixStream) -> Result<Response> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(CanvasError::DaemonUnavailable(
                        "Response exceeded maximum size".to_string(),
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err(CanvasError::DaemonUnavailable(
                    "Timed out waiting for daemon response".to_string(),
                ));
            }
            Err(source) => {
                return Err(CanvasError::Io {
                    context: "reading daemon response".to_string(),
                    source,
                })
            }
        }
    }

    let response_bytes = match buffer.iter().position(|b| *b == b'\n') {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };
    if response_bytes.is_empty() {
        return Err(CanvasError::DaemonUnavailable(
            "Daemon response was empty".to_string(),
        ));
    }

    serde_json::from_slice(response_bytes).map_err(|source| CanvasError::Json {
        context: "parsing daemon response".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_protocol::EventEnvelope;
    use serde_json::json;
    use std::os::unix::net::UnixListener;
    use std::thread;

    fn read_request(stream: &mut UnixStream) -> Request {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if buffer.contains(&b'\n') {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        let end = buffer.iter().position(|b| *b == b'\n').unwrap_or(buffer.len());
        serde_json::from_slice(&buffer[..end]).unwrap()
    }

    /// Serves one connection with `respond` and returns the request it saw.
    fn serve_once(
        listener: UnixListener,
        respond: impl FnOnce(&Request) -> Response + Send + 'static,
    ) -> thread::JoinHandle<Request> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let mut payload = serde_json::to_vec(&respond(&request)).unwrap();
            payload.push(b'\n');
            stream.write_all(&payload).unwrap();
            request
        })
    }

    #[test]
    fn sync_sends_snapshot_hint_and_actor() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("canvasd.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let server = serve_once(listener, |request| {
            Response::ok(request.id.clone(), json!({"accepted": true}))
        });

        let client = DaemonClient::new(socket);
        client
            .push_snapshot(
                CanvasStateSnapshot::default(),
                CanvasEventHint::StateSync,
                Actor::ai(Some("m".into()), None),
            )
            .unwrap();

        let request = server.join().unwrap();
        assert_eq!(request.method, Method::SyncCanvasState);
        let params = request.params.unwrap();
        assert_eq!(params["event_hint"]["kind"], "state_sync");
        assert_eq!(params["actor"]["type"], "ai");
        assert_eq!(params["snapshot"]["activeTabIndex"], Value::Null);
    }

    #[test]
    fn daemon_error_maps_to_error_variant() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("canvasd.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let server = serve_once(listener, |request| {
            Response::error(request.id.clone(), "invalid_params", "nope")
        });

        let err = DaemonClient::new(socket).health().unwrap_err();
        server.join().unwrap();
        match err {
            CanvasError::Daemon { code, .. } => assert_eq!(code, "invalid_params"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_socket_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DaemonClient::new(dir.path().join("absent.sock"))
            .health()
            .unwrap_err();
        assert!(matches!(err, CanvasError::DaemonUnavailable(_)));
    }

    #[test]
    fn drain_parses_commands() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("canvasd.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let command = CanvasCommand {
            event: "canvas:close_tab".to_string(),
            envelope: EventEnvelope::new(Actor::User, json!({"contextId": "request-1"})),
        };
        let queued = command.clone();
        let server = serve_once(listener, move |request| {
            Response::ok(request.id.clone(), json!({"commands": [queued]}))
        });

        let drained = DaemonClient::new(socket).drain_commands().unwrap();
        server.join().unwrap();
        assert_eq!(drained, vec![command]);
    }
}
