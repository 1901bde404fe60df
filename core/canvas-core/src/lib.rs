//! # canvas-core
//!
//! Canvas state synchronization engine: the tab registry, per-context state,
//! actor gating for remote commands, and the debounced sync to canvasd.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. `CanvasRuntime` owns the canvas on one
//!   thread; remote calls run on a worker and never block a mutation.
//! - **Best effort**: A failed sync or drift push is logged and dropped; the
//!   next mutation syncs the latest state.
//! - **Graceful degradation**: Missing config or canvas state files yield
//!   defaults, not errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use canvas_core::{Canvas, CanvasRuntime, DaemonClient, RuntimeOptions, StorageConfig};
//!
//! let storage = StorageConfig::from_home()?;
//! let client = Arc::new(DaemonClient::from_storage(&storage));
//! let runtime = CanvasRuntime::spawn(Canvas::default(), client.clone(), RuntimeOptions {
//!     state_file: Some(storage.canvas_state_file()),
//!     commands: Some(client),
//!     ..RuntimeOptions::default()
//! })?;
//! let tab = runtime.handle().open_request_tab(Default::default())?;
//! ```

pub mod activity;
pub mod bus;
pub mod canvas;
pub mod client;
pub mod commands;
pub mod config;
pub mod drift;
pub mod error;
pub mod gating;
pub mod hint;
pub mod history;
pub mod persist;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod storage;

pub use activity::{ActivityEntry, ActivityLog};
pub use bus::{EventBus, ListenerSet, RemoteListeners, Subscription};
pub use canvas::{Canvas, OpenRequestOptions};
pub use client::{CommandSource, DaemonClient, SyncBoundary};
pub use commands::{parse_remote_event, RemoteCommand, RemoteEvent};
pub use config::{load_config, save_config, CanvasConfig};
pub use drift::{DriftPush, DriftReviewStore};
pub use error::{CanvasError, Result};
pub use gating::{CommandKind, GateEffect, GatingPolicy};
pub use hint::{derive_hint, CanvasFrame};
pub use history::ContextHistory;
pub use persist::{PersistedCanvas, CANVAS_STATE_VERSION};
pub use registry::{
    ContextDescriptor, ContextRegistry, LayoutDescriptor, LiveContext, TemplateDescriptor,
};
pub use runtime::{
    CanvasHandle, CanvasInput, CanvasRuntime, CanvasSession, RuntimeOptions, SyncRequest,
    UserAction,
};
pub use scheduler::{SyncPhase, SyncScheduler};
pub use snapshot::build_snapshot;
pub use source::{Source, SourceIndex};
pub use state::{
    ContextState, ContextStatePatch, ContextStateStore, RequestTabPatch, RequestTabState,
    ResponseSnapshot, TemplateState,
};
pub use storage::StorageConfig;

pub use canvas_protocol::{
    Actor, CanvasEventHint, CanvasStateSnapshot, DriftKey, DriftReviewStatus, EventEnvelope,
};
