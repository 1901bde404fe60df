//! The canvas: registry, per-tab state, source index, gating, activity and
//! drift decisions behind one explicitly owned value.
//!
//! Every visible mutation bumps `revision()`; the runtime compares revisions
//! to decide whether to (re)start the sync debounce.

use canvas_protocol::{CanvasStateSnapshot, DriftKey, DriftReviewStatus, EventEnvelope};

use crate::activity::{ActivityEntry, ActivityLog};
use crate::commands::RemoteCommand;
use crate::config::CanvasConfig;
use crate::drift::{DriftPush, DriftReviewStore};
use crate::gating::{GateEffect, GatingPolicy};
use crate::hint::CanvasFrame;
use crate::registry::{
    new_request_id, ContextDescriptor, ContextRegistry, LayoutDescriptor, TemplateDescriptor,
    REQUEST_TEMPLATE_ID,
};
use crate::snapshot::build_snapshot;
use crate::source::{Source, SourceIndex};
use crate::state::{
    ContextState, ContextStatePatch, ContextStateStore, RequestTabPatch, RequestTabState,
};

const DEFAULT_REQUEST_LABEL: &str = "Request";

/// How to open a request tab.
#[derive(Debug, Clone)]
pub struct OpenRequestOptions {
    pub label: Option<String>,
    /// Dedup identity. An open tab with an equal source is reused.
    pub source: Option<Source>,
    /// Seed state for a new tab. Ignored when an existing tab is reused.
    pub initial: Option<RequestTabState>,
    pub activate: bool,
}

impl Default for OpenRequestOptions {
    fn default() -> Self {
        Self {
            label: None,
            source: None,
            initial: None,
            activate: true,
        }
    }
}

#[derive(Debug)]
pub struct Canvas {
    registry: ContextRegistry,
    store: ContextStateStore,
    sources: SourceIndex,
    activity: ActivityLog,
    policy: GatingPolicy,
    drift: DriftReviewStore,
    revision: u64,
}

impl Canvas {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            registry: ContextRegistry::new(config.history_limit),
            store: ContextStateStore::new(),
            sources: SourceIndex::new(),
            activity: ActivityLog::new(config.activity_limit),
            policy: GatingPolicy::new(config.follow_ai),
            drift: DriftReviewStore::new(),
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.revision += 1;
        }
        changed
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Contexts
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn register_context(&mut self, descriptor: ContextDescriptor) -> bool {
        let inserted = self.registry.register_context(descriptor);
        self.touch(true);
        inserted
    }

    /// Removes a context with its state and source binding. Closing the active
    /// context activates the previous neighbour, else the next, else nothing.
    pub fn close_context(&mut self, id: &str) -> bool {
        let Some(removed) = self.registry.unregister_context(id) else {
            return false;
        };
        self.store.remove(id);
        self.sources.unbind(id);
        tracing::info!(
            context_id = %id,
            label = %removed.label(),
            active = ?self.registry.active_context_id(),
            "Context closed"
        );
        self.touch(true)
    }

    pub fn set_active_context(&mut self, id: &str) -> bool {
        let changed = self.registry.set_active_context(id);
        self.touch(changed)
    }

    pub fn go_back(&mut self) -> bool {
        let changed = self.registry.go_back();
        self.touch(changed)
    }

    pub fn register_template(&mut self, template: TemplateDescriptor) -> bool {
        let inserted = self.registry.register_template(template);
        self.touch(true);
        inserted
    }

    pub fn unregister_template(&mut self, id: &str) -> bool {
        let removed = self.registry.unregister_template(id);
        self.touch(removed)
    }

    pub fn set_active_layout(&mut self, context_id: &str, layout_id: &str) -> bool {
        let changed = self.registry.set_active_layout(context_id, layout_id);
        self.touch(changed)
    }

    pub fn active_layout(&self, context_id: &str) -> Option<LayoutDescriptor> {
        self.registry.active_layout(context_id)
    }

    pub fn active_context_id(&self) -> Option<&str> {
        self.registry.active_context_id()
    }

    pub fn context_order(&self) -> &[String] {
        self.registry.context_order()
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ContextRegistry {
        &mut self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Per-context state
    // ─────────────────────────────────────────────────────────────────────────────

    /// Merges `patch` into a registered context's state. Unknown ids are a
    /// no-op. A request patch carrying a source rebinds the dedup index.
    pub fn set_context_state(&mut self, id: &str, patch: ContextStatePatch) -> bool {
        self.update_context_state(id, patch)
    }

    pub fn update_context_state(&mut self, id: &str, patch: ContextStatePatch) -> bool {
        if !self.registry.contains(id) {
            tracing::debug!(context_id = %id, "Ignoring state write for unknown context");
            return false;
        }
        if let ContextStatePatch::Request(RequestTabPatch {
            source: Some(source),
            ..
        }) = &patch
        {
            self.rebind_source(id, source.clone());
        }
        self.store.update_context_state(id, patch);
        self.touch(true)
    }

    pub fn get_context_state(&self, id: &str) -> ContextState {
        self.store.get_context_state(id)
    }

    pub fn state_store(&self) -> &ContextStateStore {
        &self.store
    }

    pub(crate) fn state_store_mut(&mut self) -> &mut ContextStateStore {
        &mut self.store
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Request tabs
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn find_context_by_source(&self, source: &Source) -> Option<&str> {
        self.sources.lookup(source)
    }

    /// Opens a request tab, or reuses the live tab carrying the same source.
    /// Returns the tab id either way.
    pub fn open_request_tab(&mut self, options: OpenRequestOptions) -> String {
        if let Some(source) = &options.source {
            if let Some(existing) = self.sources.lookup(source).map(str::to_string) {
                tracing::debug!(context_id = %existing, "Reusing tab for source");
                if options.activate {
                    self.set_active_context(&existing);
                }
                return existing;
            }
        }

        let id = new_request_id();
        let mut initial = options.initial.unwrap_or_default();
        if options.source.is_some() {
            initial.source = options.source.clone();
        }
        let label = options
            .label
            .filter(|label| !label.trim().is_empty())
            .or_else(|| initial.display_label())
            .unwrap_or_else(|| DEFAULT_REQUEST_LABEL.to_string());

        let template = self.registry.template(REQUEST_TEMPLATE_ID).cloned();
        self.registry
            .register_context(ContextDescriptor::request_tab(&id, label, template.as_ref()));

        if let Some(source) = initial.source.clone() {
            self.sources.bind(&id, source);
        }
        self.store.set_context_state(
            &id,
            ContextStatePatch::Request(RequestTabPatch::from(initial)),
        );

        if options.activate {
            self.registry.set_active_context(&id);
        }
        tracing::info!(context_id = %id, activated = options.activate, "Request tab opened");
        self.touch(true);
        id
    }

    fn rebind_source(&mut self, id: &str, source: Source) {
        let previous_owner = self.sources.lookup(&source).map(str::to_string);
        self.sources.bind(id, source);
        if let Some(owner) = previous_owner.filter(|owner| owner != id) {
            self.store.clear_source(&owner);
        }
    }

    pub(crate) fn bind_source(&mut self, id: &str, source: Source) {
        self.sources.bind(id, source);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Remote commands
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn follow_ai(&self) -> bool {
        self.policy.follow_ai
    }

    pub fn set_follow_ai(&mut self, follow_ai: bool) {
        if self.policy.follow_ai != follow_ai {
            tracing::info!(follow_ai, "Follow AI toggled");
        }
        self.policy.follow_ai = follow_ai;
    }

    /// Applies a remote tab command through the gating policy. Exactly one
    /// activity entry is appended whatever the outcome; it is returned.
    pub fn apply_remote(
        &mut self,
        command: RemoteCommand,
        envelope: &EventEnvelope,
    ) -> ActivityEntry {
        let kind = command.kind();
        let actor = envelope.actor.clone();
        let effect = self.policy.decide(kind, &actor);

        let (target, applied) = match command {
            RemoteCommand::SwitchTab { context_id } => {
                let known = self.registry.contains(&context_id);
                let applied = known && effect == GateEffect::Activate;
                if applied {
                    self.set_active_context(&context_id);
                } else if !known {
                    tracing::warn!(context_id = %context_id, "Remote switch to unknown context");
                }
                (Some(context_id), applied)
            }
            RemoteCommand::OpenRequestTab { label } => {
                let id = self.open_request_tab(OpenRequestOptions {
                    label,
                    activate: effect == GateEffect::OpenActivated,
                    ..OpenRequestOptions::default()
                });
                (Some(id), effect.applied())
            }
            RemoteCommand::OpenCollectionRequest(payload) => {
                let initial = RequestTabState {
                    method: payload.method,
                    url: payload.url,
                    headers: payload.headers,
                    body: payload.body.unwrap_or_default(),
                    ..RequestTabState::default()
                };
                let id = self.open_request_tab(OpenRequestOptions {
                    label: Some(payload.name),
                    source: Some(Source::collection(payload.collection_id, payload.request_id)),
                    initial: Some(initial),
                    activate: effect == GateEffect::OpenActivated,
                });
                (Some(id), effect.applied())
            }
            RemoteCommand::CloseTab { context_id } => {
                let closed = self.close_context(&context_id);
                if !closed {
                    tracing::warn!(context_id = %context_id, "Remote close of unknown context");
                }
                (Some(context_id), closed)
            }
        };

        if !applied {
            tracing::info!(
                action = kind.label(),
                actor = actor.as_str(),
                target = ?target,
                "Remote command recorded without visible effect"
            );
        }

        let entry = ActivityEntry::new(
            kind.label(),
            actor,
            target,
            applied,
            envelope.correlation_id.clone(),
        );
        self.activity.append(entry.clone());
        entry
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Drift review
    // ─────────────────────────────────────────────────────────────────────────────

    /// Local decision. Returns the push for the daemon when the status changed.
    pub fn set_drift_decision(
        &mut self,
        key: DriftKey,
        status: DriftReviewStatus,
    ) -> Option<DriftPush> {
        self.drift.set_decision(key, status, false)
    }

    /// Decision confirmed by the daemon; never echoed back.
    pub fn confirm_drift_decision(&mut self, key: DriftKey, status: DriftReviewStatus) {
        self.drift.set_decision(key, status, true);
    }

    pub fn drift_status(&self, key: &DriftKey) -> DriftReviewStatus {
        self.drift.status(key)
    }

    pub fn drift(&self) -> &DriftReviewStore {
        &self.drift
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Projections
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> CanvasStateSnapshot {
        build_snapshot(
            &self.registry,
            &self.store,
            self.registry.context_order(),
            self.registry.active_context_id(),
        )
    }

    pub fn frame(&self) -> CanvasFrame {
        CanvasFrame::capture(&self.registry)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}
