//! Single-threaded canvas runtime.
//!
//! One thread owns the `Canvas` and the `SyncScheduler`. UI actions, remote
//! events, sync completions and queries all arrive on one `mpsc` channel, so
//! they are applied in delivery order. The debounce deadline is serviced
//! with `recv_timeout`.
//!
//! Remote calls run on a background worker: best-effort, never awaited by the
//! mutation path, no retry. An optional poller drains the daemon's command
//! queue onto the event bus.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use canvas_protocol::{Actor, DriftKey, DriftReviewStatus, EventEnvelope, SyncCanvasStateParams};

use crate::bus::{EventBus, ListenerSet, RemoteListeners};
use crate::canvas::{Canvas, OpenRequestOptions};
use crate::client::{CommandSource, SyncBoundary};
use crate::commands::RemoteEvent;
use crate::config::CanvasConfig;
use crate::drift::DriftPush;
use crate::error::{CanvasError, Result};
use crate::hint::{derive_hint, CanvasFrame};
use crate::persist::PersistedCanvas;
use crate::registry::{ContextDescriptor, TemplateDescriptor};
use crate::scheduler::SyncScheduler;
use crate::state::ContextStatePatch;

/// A mutation requested by the local user.
pub enum UserAction {
    RegisterContext(ContextDescriptor),
    RegisterTemplate(TemplateDescriptor),
    UnregisterTemplate(String),
    CloseContext(String),
    SetActiveContext(String),
    GoBack,
    OpenRequestTab {
        options: OpenRequestOptions,
        reply: Option<Sender<String>>,
    },
    UpdateContextState {
        id: String,
        patch: ContextStatePatch,
    },
    SetActiveLayout {
        context_id: String,
        layout_id: String,
    },
    SetFollowAi(bool),
    SetDriftDecision {
        key: DriftKey,
        status: DriftReviewStatus,
    },
}

type Query = Box<dyn FnOnce(&Canvas) + Send>;

pub enum CanvasInput {
    User(UserAction),
    Remote(RemoteEvent),
    SyncFinished { frame: CanvasFrame, ok: bool },
    Query(Query),
    Shutdown,
}

/// A sync attempt ready for the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub params: SyncCanvasStateParams,
    pub frame: CanvasFrame,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session: canvas + scheduler, no threads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CanvasSession {
    canvas: Canvas,
    scheduler: SyncScheduler,
}

impl CanvasSession {
    pub fn new(canvas: Canvas, debounce: Duration) -> Self {
        Self {
            canvas,
            scheduler: SyncScheduler::new(debounce),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }

    /// Schedules a sync of whatever the canvas holds now.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.scheduler.record_mutation(now);
    }

    /// Applies a user action. Returns a drift push for the worker, if any.
    pub fn apply_user(&mut self, action: UserAction, now: Instant) -> Option<DriftPush> {
        let before = self.canvas.revision();
        let mut push = None;

        match action {
            UserAction::RegisterContext(descriptor) => {
                self.canvas.register_context(descriptor);
            }
            UserAction::RegisterTemplate(template) => {
                self.canvas.register_template(template);
            }
            UserAction::UnregisterTemplate(id) => {
                self.canvas.unregister_template(&id);
            }
            UserAction::CloseContext(id) => {
                self.canvas.close_context(&id);
            }
            UserAction::SetActiveContext(id) => {
                self.canvas.set_active_context(&id);
            }
            UserAction::GoBack => {
                self.canvas.go_back();
            }
            UserAction::OpenRequestTab { options, reply } => {
                let id = self.canvas.open_request_tab(options);
                if let Some(reply) = reply {
                    let _ = reply.send(id);
                }
            }
            UserAction::UpdateContextState { id, patch } => {
                self.canvas.update_context_state(&id, patch);
            }
            UserAction::SetActiveLayout {
                context_id,
                layout_id,
            } => {
                self.canvas.set_active_layout(&context_id, &layout_id);
            }
            UserAction::SetFollowAi(follow_ai) => self.canvas.set_follow_ai(follow_ai),
            UserAction::SetDriftDecision { key, status } => {
                push = self.canvas.set_drift_decision(key, status);
            }
        }

        self.after_mutation(before, Actor::User, now);
        push
    }

    /// Applies a decoded remote event, attributed to its envelope's actor.
    pub fn apply_remote(&mut self, event: RemoteEvent, now: Instant) {
        let before = self.canvas.revision();
        let actor = event.envelope().actor.clone();

        match event {
            RemoteEvent::Canvas { command, envelope } => {
                self.canvas.apply_remote(command, &envelope);
            }
            RemoteEvent::DriftConfirmed { key, status, .. } => {
                self.canvas.confirm_drift_decision(key, status);
            }
        }

        self.after_mutation(before, actor, now);
    }

    fn after_mutation(&mut self, before: u64, actor: Actor, now: Instant) {
        if self.canvas.revision() != before {
            self.scheduler.attribute(actor);
            self.scheduler.record_mutation(now);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Builds the sync request once the debounce window has expired.
    pub fn tick(&mut self, now: Instant) -> Option<SyncRequest> {
        let ticket = self.scheduler.poll(now)?;
        let frame = self.canvas.frame();
        let event_hint = derive_hint(
            self.scheduler.last_synced(),
            &frame,
            self.canvas.registry().contexts(),
        );
        tracing::debug!(
            event_type = event_hint.event_type(),
            actor = ticket.actor.as_str(),
            tabs = frame.context_order.len(),
            "Canvas sync due"
        );
        Some(SyncRequest {
            params: SyncCanvasStateParams {
                snapshot: self.canvas.snapshot(),
                event_hint,
                actor: ticket.actor,
            },
            frame,
        })
    }

    pub fn complete(&mut self, frame: CanvasFrame, ok: bool, now: Instant) {
        self.scheduler.complete(frame, ok, now);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Threaded runtime
// ─────────────────────────────────────────────────────────────────────────────

enum WorkerJob {
    Sync(SyncRequest),
    Drift { push: DriftPush, actor: Actor },
}

#[derive(Default)]
pub struct RuntimeOptions {
    pub config: CanvasConfig,
    /// Persisted canvas file; restored on start, written on shutdown.
    pub state_file: Option<PathBuf>,
    /// Drained every `command_poll_ms` when set.
    pub commands: Option<Arc<dyn CommandSource>>,
}

/// Cloneable sender side of the runtime.
#[derive(Clone)]
pub struct CanvasHandle {
    tx: Sender<CanvasInput>,
    bus: EventBus,
}

impl CanvasHandle {
    fn send(&self, input: CanvasInput) -> Result<()> {
        self.tx.send(input).map_err(|_| CanvasError::RuntimeStopped)
    }

    pub fn dispatch(&self, action: UserAction) -> Result<()> {
        self.send(CanvasInput::User(action))
    }

    pub fn register_context(&self, descriptor: ContextDescriptor) -> Result<()> {
        self.dispatch(UserAction::RegisterContext(descriptor))
    }

    pub fn register_template(&self, template: TemplateDescriptor) -> Result<()> {
        self.dispatch(UserAction::RegisterTemplate(template))
    }

    pub fn close_context(&self, id: &str) -> Result<()> {
        self.dispatch(UserAction::CloseContext(id.to_string()))
    }

    pub fn set_active_context(&self, id: &str) -> Result<()> {
        self.dispatch(UserAction::SetActiveContext(id.to_string()))
    }

    pub fn go_back(&self) -> Result<()> {
        self.dispatch(UserAction::GoBack)
    }

    /// Blocks until the runtime has opened (or reused) the tab.
    pub fn open_request_tab(&self, options: OpenRequestOptions) -> Result<String> {
        let (reply, rx) = mpsc::channel();
        self.dispatch(UserAction::OpenRequestTab {
            options,
            reply: Some(reply),
        })?;
        rx.recv().map_err(|_| CanvasError::RuntimeStopped)
    }

    pub fn update_context_state(&self, id: &str, patch: ContextStatePatch) -> Result<()> {
        self.dispatch(UserAction::UpdateContextState {
            id: id.to_string(),
            patch,
        })
    }

    pub fn set_active_layout(&self, context_id: &str, layout_id: &str) -> Result<()> {
        self.dispatch(UserAction::SetActiveLayout {
            context_id: context_id.to_string(),
            layout_id: layout_id.to_string(),
        })
    }

    pub fn set_follow_ai(&self, follow_ai: bool) -> Result<()> {
        self.dispatch(UserAction::SetFollowAi(follow_ai))
    }

    pub fn set_drift_decision(&self, key: DriftKey, status: DriftReviewStatus) -> Result<()> {
        self.dispatch(UserAction::SetDriftDecision { key, status })
    }

    /// Publishes a named remote event on the bus, as the poller does.
    pub fn emit_remote(&self, event: &str, envelope: &EventEnvelope) -> usize {
        self.bus.emit(event, envelope)
    }

    /// Runs `f` against the canvas on the runtime thread.
    pub fn query<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Canvas) -> R + Send + 'static,
    {
        let (reply, rx) = mpsc::channel();
        self.send(CanvasInput::Query(Box::new(move |canvas| {
            let _ = reply.send(f(canvas));
        })))?;
        rx.recv().map_err(|_| CanvasError::RuntimeStopped)
    }
}

pub struct CanvasRuntime {
    handle: CanvasHandle,
    thread: Option<JoinHandle<Canvas>>,
    worker: Option<JoinHandle<()>>,
    poller: Option<(Sender<()>, JoinHandle<()>)>,
    _listeners: RemoteListeners,
    _listener_set: ListenerSet,
}

impl CanvasRuntime {
    /// Restores persisted state into `canvas` (when configured) and starts the
    /// runtime, worker and optional poller threads.
    pub fn spawn(
        mut canvas: Canvas,
        boundary: Arc<dyn SyncBoundary>,
        options: RuntimeOptions,
    ) -> Result<Self> {
        if let Some(path) = &options.state_file {
            if let Some(persisted) = PersistedCanvas::load(path) {
                persisted.restore_into(&mut canvas);
            }
        }

        let (tx, rx) = mpsc::channel::<CanvasInput>();
        let (job_tx, job_rx) = mpsc::channel::<WorkerJob>();
        let bus = EventBus::new();

        let listeners = RemoteListeners::new(bus.clone());
        let remote_tx = tx.clone();
        let listener_set = listeners.init(move |event| {
            let _ = remote_tx.send(CanvasInput::Remote(event));
        });

        let worker_tx = tx.clone();
        let worker = thread::Builder::new()
            .name("canvas-sync-worker".to_string())
            .spawn(move || run_worker(job_rx, boundary, worker_tx))
            .map_err(|source| CanvasError::Io {
                context: "spawning sync worker".to_string(),
                source,
            })?;

        let poller = match options.commands {
            Some(source) => {
                let (stop_tx, stop_rx) = mpsc::channel::<()>();
                let poll_bus = bus.clone();
                let interval = options.config.command_poll_interval();
                let max_backoff = options.config.command_poll_max_backoff();
                let handle = thread::Builder::new()
                    .name("canvas-command-poller".to_string())
                    .spawn(move || run_poller(source, poll_bus, stop_rx, interval, max_backoff))
                    .map_err(|source| CanvasError::Io {
                        context: "spawning command poller".to_string(),
                        source,
                    })?;
                Some((stop_tx, handle))
            }
            None => None,
        };

        let debounce = options.config.debounce();
        let state_file = options.state_file;
        let thread = thread::Builder::new()
            .name("canvas-runtime".to_string())
            .spawn(move || run_loop(CanvasSession::new(canvas, debounce), rx, job_tx, state_file))
            .map_err(|source| CanvasError::Io {
                context: "spawning canvas runtime".to_string(),
                source,
            })?;

        tracing::info!(debounce_ms = debounce.as_millis() as u64, "Canvas runtime started");

        Ok(Self {
            handle: CanvasHandle { tx, bus },
            thread: Some(thread),
            worker: Some(worker),
            poller,
            _listeners: listeners,
            _listener_set: listener_set,
        })
    }

    pub fn handle(&self) -> CanvasHandle {
        self.handle.clone()
    }

    /// Stops every thread, persists, and hands the canvas back.
    pub fn shutdown(mut self) -> Result<Canvas> {
        self.stop().ok_or(CanvasError::RuntimeStopped)
    }

    fn stop(&mut self) -> Option<Canvas> {
        if let Some((stop_tx, handle)) = self.poller.take() {
            drop(stop_tx);
            let _ = handle.join();
        }
        let _ = self.handle.tx.send(CanvasInput::Shutdown);
        let canvas = self.thread.take().and_then(|thread| thread.join().ok());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        canvas
    }
}

impl Drop for CanvasRuntime {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop();
        }
    }
}

fn run_loop(
    mut session: CanvasSession,
    rx: Receiver<CanvasInput>,
    jobs: Sender<WorkerJob>,
    state_file: Option<PathBuf>,
) -> Canvas {
    if !session.canvas().registry().is_empty() {
        session.mark_dirty(Instant::now());
    }

    loop {
        let received = match session.deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                rx.recv_timeout(wait)
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let now = Instant::now();
        match received {
            Ok(CanvasInput::User(action)) => {
                if let Some(push) = session.apply_user(action, now) {
                    let _ = jobs.send(WorkerJob::Drift {
                        push,
                        actor: Actor::User,
                    });
                }
            }
            Ok(CanvasInput::Remote(event)) => session.apply_remote(event, now),
            Ok(CanvasInput::SyncFinished { frame, ok }) => session.complete(frame, ok, now),
            Ok(CanvasInput::Query(query)) => query(session.canvas()),
            Ok(CanvasInput::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(request) = session.tick(Instant::now()) {
            if jobs.send(WorkerJob::Sync(request.clone())).is_err() {
                tracing::warn!("Sync worker gone; dropping sync");
                session.complete(request.frame, false, Instant::now());
            }
        }
    }

    drop(jobs);
    let canvas = session.into_canvas();
    if let Some(path) = state_file {
        if let Err(err) = PersistedCanvas::capture(&canvas).save(&path) {
            tracing::warn!(error = %err, path = %path.display(), "Failed to persist canvas state");
        }
    }
    tracing::info!("Canvas runtime stopped");
    canvas
}

fn run_worker(jobs: Receiver<WorkerJob>, boundary: Arc<dyn SyncBoundary>, tx: Sender<CanvasInput>) {
    for job in jobs {
        match job {
            WorkerJob::Sync(request) => {
                let ok = match boundary.sync_canvas_state(&request.params) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            event_type = request.params.event_hint.event_type(),
                            "Canvas sync failed"
                        );
                        false
                    }
                };
                let _ = tx.send(CanvasInput::SyncFinished {
                    frame: request.frame,
                    ok,
                });
            }
            WorkerJob::Drift { push, actor } => {
                if let Err(err) = boundary.set_drift_review_decision(&push.key, push.status, &actor)
                {
                    tracing::warn!(
                        error = %err,
                        key = %push.key.encode(),
                        "Drift decision push failed"
                    );
                }
            }
        }
    }
}

fn run_poller(
    source: Arc<dyn CommandSource>,
    bus: EventBus,
    stop: Receiver<()>,
    interval: Duration,
    max_backoff: Duration,
) {
    let mut delay = interval;
    loop {
        match stop.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }

        match source.drain_commands() {
            Ok(commands) => {
                delay = interval;
                for command in commands {
                    let delivered = bus.emit(&command.event, &command.envelope);
                    if delivered == 0 {
                        tracing::warn!(event = %command.event, "No listener for drained command");
                    }
                }
            }
            Err(err) => {
                delay = (delay * 2).min(max_backoff);
                tracing::debug!(
                    error = %err,
                    retry_ms = delay.as_millis() as u64,
                    "Command drain failed; backing off"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RemoteCommand;
    use canvas_protocol::{CanvasCommand, CanvasEventHint};
    use serde_json::json;
    use std::sync::Mutex;

    const WINDOW: Duration = Duration::from_millis(100);

    fn session() -> CanvasSession {
        CanvasSession::new(Canvas::default(), WINDOW)
    }

    fn open(session: &mut CanvasSession, label: &str, now: Instant) {
        session.apply_user(
            UserAction::OpenRequestTab {
                options: OpenRequestOptions {
                    label: Some(label.to_string()),
                    ..OpenRequestOptions::default()
                },
                reply: None,
            },
            now,
        );
    }

    #[test]
    fn rapid_mutations_produce_one_sync_with_final_state() {
        let start = Instant::now();
        let mut session = session();
        open(&mut session, "one", start);
        open(&mut session, "two", start + Duration::from_millis(30));
        open(&mut session, "three", start + Duration::from_millis(60));

        assert!(session.tick(start + Duration::from_millis(100)).is_none());
        let request = session.tick(start + Duration::from_millis(160)).unwrap();
        assert_eq!(request.params.snapshot.tabs.len(), 3);
        assert_eq!(request.params.snapshot.active_tab_index, Some(2));
        assert_eq!(request.params.event_hint, CanvasEventHint::StateSync);
        assert!(session.tick(start + Duration::from_millis(400)).is_none());
    }

    #[test]
    fn hint_is_relative_to_last_successful_sync() {
        let start = Instant::now();
        let mut session = session();
        open(&mut session, "one", start);
        let first = session.tick(start + WINDOW).unwrap();
        session.complete(first.frame, true, start + WINDOW);

        open(&mut session, "two", start + WINDOW * 2);
        let second = session.tick(start + WINDOW * 3).unwrap();
        assert_eq!(second.params.event_hint.event_type(), "canvas:tab_opened");
        session.complete(second.frame, false, start + WINDOW * 3);

        open(&mut session, "three", start + WINDOW * 4);
        let third = session.tick(start + WINDOW * 5).unwrap();
        // Failed attempt is not the base: still one tab vs three.
        assert_eq!(third.params.event_hint.event_type(), "canvas:tab_opened");
        assert_eq!(
            session.scheduler().last_synced().map(|f| f.context_order.len()),
            Some(1)
        );
    }

    #[test]
    fn remote_mutation_is_attributed_to_its_actor() {
        let start = Instant::now();
        let mut session = session();
        session.apply_remote(
            RemoteEvent::Canvas {
                command: RemoteCommand::OpenRequestTab {
                    label: Some("ai tab".into()),
                },
                envelope: EventEnvelope::new(Actor::ai(Some("m".into()), None), json!({})),
            },
            start,
        );
        let request = session.tick(start + WINDOW).unwrap();
        assert!(request.params.actor.is_ai());

        session.complete(request.frame, true, start + WINDOW);
        assert_eq!(session.scheduler().actor(), &Actor::User);
    }

    #[test]
    fn gated_remote_switch_does_not_schedule_sync() {
        let start = Instant::now();
        let mut canvas = Canvas::default();
        canvas.set_follow_ai(false);
        let mut session = CanvasSession::new(canvas, WINDOW);
        open(&mut session, "one", start);
        let request = session.tick(start + WINDOW).unwrap();
        session.complete(request.frame, true, start + WINDOW);

        let target = session.canvas().context_order()[0].clone();
        open(&mut session, "two", start + WINDOW * 2);
        let request = session.tick(start + WINDOW * 3).unwrap();
        session.complete(request.frame, true, start + WINDOW * 3);

        session.apply_remote(
            RemoteEvent::Canvas {
                command: RemoteCommand::SwitchTab { context_id: target },
                envelope: EventEnvelope::new(Actor::ai(None, None), json!({})),
            },
            start + WINDOW * 4,
        );
        assert!(session.deadline().is_none());
        assert_eq!(session.canvas().activity().len(), 1);
    }

    #[test]
    fn local_drift_decision_returns_push_once() {
        let mut session = session();
        let key = DriftKey::new("col_1", "GET", "/users");
        let push = session.apply_user(
            UserAction::SetDriftDecision {
                key: key.clone(),
                status: DriftReviewStatus::Accepted,
            },
            Instant::now(),
        );
        assert!(push.is_some());
        assert!(session.deadline().is_none());

        session.apply_remote(
            RemoteEvent::DriftConfirmed {
                key: key.clone(),
                status: DriftReviewStatus::Ignored,
                envelope: EventEnvelope::new(Actor::ai(None, None), json!({})),
            },
            Instant::now(),
        );
        assert_eq!(
            session.canvas().drift_status(&key),
            DriftReviewStatus::Ignored
        );
    }

    #[derive(Default)]
    struct RecordingBoundary {
        syncs: Mutex<Vec<SyncCanvasStateParams>>,
        drifts: Mutex<Vec<(DriftKey, DriftReviewStatus)>>,
    }

    impl SyncBoundary for RecordingBoundary {
        fn sync_canvas_state(&self, params: &SyncCanvasStateParams) -> Result<()> {
            self.syncs.lock().unwrap().push(params.clone());
            Ok(())
        }

        fn set_drift_review_decision(
            &self,
            key: &DriftKey,
            status: DriftReviewStatus,
            _actor: &Actor,
        ) -> Result<()> {
            self.drifts.lock().unwrap().push((key.clone(), status));
            Ok(())
        }
    }

    struct QueuedCommands(Mutex<Vec<CanvasCommand>>);

    impl CommandSource for QueuedCommands {
        fn drain_commands(&self) -> Result<Vec<CanvasCommand>> {
            Ok(std::mem::take(&mut *self.0.lock().unwrap()))
        }
    }

    fn options() -> RuntimeOptions {
        RuntimeOptions {
            config: CanvasConfig {
                debounce_ms: 40,
                command_poll_ms: 10,
                ..CanvasConfig::default()
            },
            ..RuntimeOptions::default()
        }
    }

    #[test]
    fn runtime_coalesces_burst_into_one_sync() {
        let boundary = Arc::new(RecordingBoundary::default());
        let runtime = CanvasRuntime::spawn(Canvas::default(), boundary.clone(), options()).unwrap();
        let handle = runtime.handle();

        for label in ["a", "b", "c"] {
            handle
                .open_request_tab(OpenRequestOptions {
                    label: Some(label.into()),
                    ..OpenRequestOptions::default()
                })
                .unwrap();
        }
        thread::sleep(Duration::from_millis(300));

        let tabs = handle.query(|canvas| canvas.context_order().len()).unwrap();
        assert_eq!(tabs, 3);
        runtime.shutdown().unwrap();

        let syncs = boundary.syncs.lock().unwrap();
        assert_eq!(syncs.len(), 1);
        assert_eq!(syncs[0].snapshot.tabs.len(), 3);
    }

    #[test]
    fn runtime_pushes_local_drift_decisions() {
        let boundary = Arc::new(RecordingBoundary::default());
        let runtime = CanvasRuntime::spawn(Canvas::default(), boundary.clone(), options()).unwrap();
        runtime
            .handle()
            .set_drift_decision(
                DriftKey::new("col_1", "GET", "/a"),
                DriftReviewStatus::Accepted,
            )
            .unwrap();
        runtime.shutdown().unwrap();

        assert_eq!(boundary.drifts.lock().unwrap().len(), 1);
    }

    #[test]
    fn poller_delivers_drained_commands() {
        let boundary = Arc::new(RecordingBoundary::default());
        let commands = Arc::new(QueuedCommands(Mutex::new(vec![CanvasCommand {
            event: "canvas:open_request_tab".into(),
            envelope: EventEnvelope::new(Actor::ai(None, None), json!({"label": "from ai"})),
        }])));
        let runtime = CanvasRuntime::spawn(
            Canvas::default(),
            boundary,
            RuntimeOptions {
                commands: Some(commands),
                ..options()
            },
        )
        .unwrap();

        let handle = runtime.handle();
        let mut opened = 0;
        for _ in 0..50 {
            opened = handle.query(|canvas| canvas.context_order().len()).unwrap();
            if opened > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        let canvas = runtime.shutdown().unwrap();
        assert_eq!(opened, 1);
        assert_eq!(canvas.activity().len(), 1);
    }

    #[test]
    fn runtime_persists_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("canvas-state.json");
        let boundary = Arc::new(RecordingBoundary::default());

        let runtime = CanvasRuntime::spawn(
            Canvas::default(),
            boundary.clone(),
            RuntimeOptions {
                state_file: Some(state_file.clone()),
                ..options()
            },
        )
        .unwrap();
        let id = runtime
            .handle()
            .open_request_tab(OpenRequestOptions::default())
            .unwrap();
        runtime.shutdown().unwrap();

        let runtime = CanvasRuntime::spawn(
            Canvas::default(),
            boundary,
            RuntimeOptions {
                state_file: Some(state_file),
                ..options()
            },
        )
        .unwrap();
        let active = runtime
            .handle()
            .query(|canvas| canvas.active_context_id().map(str::to_string))
            .unwrap();
        runtime.shutdown().unwrap();
        assert_eq!(active, Some(id));
    }
}
