//! canvasd entrypoint.
//!
//! Single-writer service at the engine's backend boundary: it keeps the latest
//! synced canvas snapshot with an audit log of canvas events, stores drift
//! review decisions, and queues canvas commands from external callers until
//! the engine drains them.

use fs_err as fs;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use canvas_protocol::{
    parse_canvas_command, parse_drift_params, parse_sync_params, ErrorInfo, Method, Request,
    Response, MAX_REQUEST_BYTES, PROTOCOL_VERSION,
};
use serde::Serialize;
use serde_json::Value;

mod config;
mod state;

use state::SharedState;

const READ_TIMEOUT_SECS: u64 = 2;
const READ_CHUNK_SIZE: usize = 4096;
const DEFAULT_EVENTS_LIMIT: usize = 100;

fn main() {
    init_logging();

    let socket_path = match config::socket_path() {
        Ok(path) => path,
        Err(err) => {
            error!(error = %err, "Failed to resolve daemon socket path");
            std::process::exit(1);
        }
    };

    if let Err(err) = prepare_socket_dir(&socket_path) {
        error!(error = %err, "Failed to prepare daemon socket directory");
        std::process::exit(1);
    }

    if let Err(err) = remove_existing_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to remove existing socket");
        std::process::exit(1);
    }

    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    let daemon_config = match config::config_path().and_then(|path| config::load_config(&path)) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load daemon config; using defaults");
            config::DaemonConfig::default()
        }
    };
    info!(
        path = %socket_path.display(),
        event_log_limit = daemon_config.event_log_limit,
        command_queue_limit = daemon_config.command_queue_limit,
        "canvasd started"
    );

    let shared_state = Arc::new(SharedState::new(daemon_config));

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&shared_state);
                thread::spawn(|| handle_connection(stream, state));
            }
            Err(err) => {
                warn!(error = %err, "Failed to accept daemon connection");
            }
        }
    }
}

fn init_logging() {
    let debug_enabled = env::var("CANVAS_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn prepare_socket_dir(socket_path: &Path) -> Result<(), String> {
    let parent = socket_path
        .parent()
        .ok_or_else(|| "Socket path has no parent".to_string())?;
    fs::create_dir_all(parent).map_err(|err| format!("Failed to create socket directory: {}", err))
}

fn remove_existing_socket(socket_path: &Path) -> Result<(), String> {
    if socket_path.exists() {
        fs::remove_file(socket_path)
            .map_err(|err| format!("Failed to remove existing socket: {}", err))?;
    }
    Ok(())
}

fn handle_connection(mut stream: UnixStream, state: Arc<SharedState>) {
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Failed to read request");
            let response = Response::error_with_info(None, err);
            let _ = write_response(&mut stream, response);
            return;
        }
    };

    tracing::debug!(method = ?request.method, id = ?request.id, "Daemon request received");
    let response = handle_request(request, &state);
    let _ = write_response(&mut stream, response);
}

fn read_request(stream: &mut UnixStream) -> Result<Request, ErrorInfo> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(READ_TIMEOUT_SECS)));

    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ErrorInfo::new(
                        "request_too_large",
                        "request exceeded maximum size",
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
                return Err(ErrorInfo::new("read_timeout", "request timed out"));
            }
            Err(err) => {
                return Err(ErrorInfo::new(
                    "read_error",
                    format!("failed to read request: {}", err),
                ));
            }
        }
    }

    let request_bytes = match buffer.iter().position(|b| *b == b'\n') {
        Some(index) => {
            if buffer[index + 1..].iter().any(|b| !b.is_ascii_whitespace()) {
                warn!("Extra bytes detected after newline; ignoring trailing data");
            }
            &buffer[..index]
        }
        None => buffer.as_slice(),
    };

    if request_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_request", "request body was empty"));
    }

    serde_json::from_slice(request_bytes).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("request was not valid JSON: {}", err),
        )
    })
}

fn handle_request(request: Request, state: &SharedState) -> Response {
    if request.protocol_version != PROTOCOL_VERSION {
        return Response::error(
            request.id,
            "protocol_mismatch",
            "unsupported protocol version",
        );
    }

    let id = request.id;
    let result = match request.method {
        Method::GetHealth => Ok(serde_json::json!({
            "status": "ok",
            "pid": std::process::id(),
            "version": env!("CARGO_PKG_VERSION"),
            "protocol_version": PROTOCOL_VERSION,
        })),
        Method::SyncCanvasState => handle_sync(request.params, state),
        Method::GetCanvasState => state
            .canvas_state()
            .map_err(state_error)
            .and_then(|view| to_data(&view, "canvas state")),
        Method::GetCanvasEvents => parse_limit(request.params).and_then(|limit| {
            state
                .canvas_events(limit)
                .map_err(state_error)
                .and_then(|events| to_data(&events, "canvas events"))
        }),
        Method::SetDriftReviewDecision => handle_drift_decision(request.params, state),
        Method::GetDriftReviewDecisions => state
            .drift_decisions()
            .map_err(state_error)
            .and_then(|decisions| to_data(&decisions, "drift decisions")),
        Method::CanvasCommand => handle_canvas_command(request.params, state),
        Method::DrainCanvasCommands => state.drain_commands().map_err(state_error).and_then(
            |commands| {
                if !commands.is_empty() {
                    tracing::debug!(commands = commands.len(), "Canvas commands drained");
                }
                to_data(&serde_json::json!({ "commands": commands }), "canvas commands")
            },
        ),
    };

    match result {
        Ok(data) => Response::ok(id, data),
        Err(err) => Response::error_with_info(id, err),
    }
}

fn require_params(params: Option<Value>, what: &str) -> Result<Value, ErrorInfo> {
    params.ok_or_else(|| ErrorInfo::new("invalid_params", format!("{} is required", what)))
}

fn handle_sync(params: Option<Value>, state: &SharedState) -> Result<Value, ErrorInfo> {
    let params = parse_sync_params(require_params(params, "sync payload")?)?;
    let tabs = params.snapshot.tabs.len();
    let record = state.record_sync(params).map_err(state_error)?;

    info!(
        event_type = %record.event_type,
        actor = record.actor.as_str(),
        active_tab = ?record.active_tab_id,
        tabs,
        "Canvas state synced"
    );
    Ok(serde_json::json!({ "accepted": true }))
}

fn handle_drift_decision(params: Option<Value>, state: &SharedState) -> Result<Value, ErrorInfo> {
    let params = parse_drift_params(require_params(params, "drift decision")?)?;
    let record = state.set_drift_decision(params).map_err(state_error)?;

    info!(
        key = %record.key,
        status = record.status.as_str(),
        actor = record.actor.as_str(),
        "Drift review decision stored"
    );
    to_data(&record, "drift decision")
}

fn handle_canvas_command(params: Option<Value>, state: &SharedState) -> Result<Value, ErrorInfo> {
    let command = parse_canvas_command(require_params(params, "canvas command")?)?;
    let event = command.event.clone();
    let actor = command.envelope.actor.as_str();
    let lamport = state.enqueue_command(command).map_err(state_error)?;

    info!(event = %event, actor, lamport, "Canvas command queued");
    Ok(serde_json::json!({ "queued": true, "lamport": lamport }))
}

fn parse_limit(params: Option<Value>) -> Result<usize, ErrorInfo> {
    let Some(params) = params else {
        return Ok(DEFAULT_EVENTS_LIMIT);
    };
    if !params.is_object() {
        return Err(ErrorInfo::new("invalid_params", "params must be an object"));
    }
    Ok(params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|limit| limit.min(1000) as usize)
        .unwrap_or(DEFAULT_EVENTS_LIMIT))
}

fn to_data<T: Serialize>(value: &T, what: &str) -> Result<Value, ErrorInfo> {
    serde_json::to_value(value).map_err(|err| {
        ErrorInfo::new(
            "serialization_error",
            format!("Failed to serialize {}: {}", what, err),
        )
    })
}

fn state_error(message: String) -> ErrorInfo {
    ErrorInfo::new("state_error", message)
}

fn write_response(stream: &mut UnixStream, response: Response) -> std::io::Result<()> {
    serde_json::to_writer(&mut *stream, &response)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}
