//! Per-context state: a tagged union keyed by context kind, and its store.
//!
//! Writes are shallow merges. A patch whose kind differs from what is stored
//! replaces the stored state outright.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::source::Source;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextState {
    #[default]
    Empty,
    Request(RequestTabState),
    Template(TemplateState),
}

impl ContextState {
    pub fn kind(&self) -> &'static str {
        match self {
            ContextState::Empty => "empty",
            ContextState::Request(_) => "request",
            ContextState::Template(_) => "template",
        }
    }

    pub fn as_request(&self) -> Option<&RequestTabState> {
        match self {
            ContextState::Request(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<&TemplateState> {
        match self {
            ContextState::Template(state) => Some(state),
            _ => None,
        }
    }

    /// Copy without transient fields, as written to disk.
    pub fn persisted(&self) -> ContextState {
        match self {
            ContextState::Request(state) => ContextState::Request(RequestTabState {
                response: None,
                ..state.clone()
            }),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTabState {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_dirty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Last execution result. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,
}

impl RequestTabState {
    /// `"<METHOD> <url>"` when both are known.
    pub fn display_label(&self) -> Option<String> {
        let method = self.method.trim();
        let url = self.url.trim();
        if method.is_empty() || url.is_empty() {
            return None;
        }
        Some(format!("{} {}", method.to_uppercase(), url))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Opaque per-template field bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateState {
    #[serde(default)]
    pub fields: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Patches
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update. `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestTabPatch {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    pub is_dirty: Option<bool>,
    pub source: Option<Source>,
    pub response: Option<ResponseSnapshot>,
}

impl RequestTabPatch {
    fn apply(self, state: &mut RequestTabState) {
        if let Some(method) = self.method {
            state.method = method;
        }
        if let Some(url) = self.url {
            state.url = url;
        }
        if let Some(headers) = self.headers {
            state.headers = headers;
        }
        if let Some(body) = self.body {
            state.body = body;
        }
        if let Some(is_dirty) = self.is_dirty {
            state.is_dirty = is_dirty;
        }
        if let Some(source) = self.source {
            state.source = Some(source);
        }
        if let Some(response) = self.response {
            state.response = Some(response);
        }
    }
}

impl From<RequestTabState> for RequestTabPatch {
    fn from(state: RequestTabState) -> Self {
        Self {
            method: Some(state.method),
            url: Some(state.url),
            headers: Some(state.headers),
            body: Some(state.body),
            is_dirty: Some(state.is_dirty),
            source: state.source,
            response: state.response,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextStatePatch {
    Request(RequestTabPatch),
    /// Keys are merged into the stored field bag one level deep.
    Template(Map<String, Value>),
}

impl ContextStatePatch {
    fn kind(&self) -> &'static str {
        match self {
            ContextStatePatch::Request(_) => "request",
            ContextStatePatch::Template(_) => "template",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ContextStateStore {
    states: HashMap<String, ContextState>,
}

impl ContextStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same merge semantics as `update_context_state`; kept as the entry
    /// point used when a tab is first seeded.
    pub fn set_context_state(&mut self, id: &str, patch: ContextStatePatch) {
        self.update_context_state(id, patch);
    }

    pub fn update_context_state(&mut self, id: &str, patch: ContextStatePatch) {
        let entry = self.states.entry(id.to_string()).or_default();

        if !matches!(entry, ContextState::Empty) && entry.kind() != patch.kind() {
            tracing::debug!(
                context_id = %id,
                stored = entry.kind(),
                incoming = patch.kind(),
                "Context state kind changed; replacing"
            );
            *entry = ContextState::Empty;
        }

        match patch {
            ContextStatePatch::Request(patch) => {
                if !matches!(entry, ContextState::Request(_)) {
                    *entry = ContextState::Request(RequestTabState::default());
                }
                if let ContextState::Request(state) = entry {
                    patch.apply(state);
                }
            }
            ContextStatePatch::Template(fields) => {
                if !matches!(entry, ContextState::Template(_)) {
                    *entry = ContextState::Template(TemplateState::default());
                }
                if let ContextState::Template(state) = entry {
                    state.fields.extend(fields);
                }
            }
        }
    }

    /// Merged state, or `ContextState::Empty` when nothing was written.
    pub fn get_context_state(&self, id: &str) -> ContextState {
        self.states.get(id).cloned().unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&ContextState> {
        self.states.get(id)
    }

    /// Drops the source of a request tab whose source moved to another tab.
    pub(crate) fn clear_source(&mut self, id: &str) {
        if let Some(ContextState::Request(state)) = self.states.get_mut(id) {
            state.source = None;
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<ContextState> {
        self.states.remove(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Every stored state minus transient fields, keyed deterministically.
    pub fn persisted_projection(&self) -> BTreeMap<String, ContextState> {
        self.states
            .iter()
            .map(|(id, state)| (id.clone(), state.persisted()))
            .collect()
    }

    pub(crate) fn restore(&mut self, states: BTreeMap<String, ContextState>) {
        self.states = states.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_patch(method: &str, url: &str) -> ContextStatePatch {
        ContextStatePatch::Request(RequestTabPatch {
            method: Some(method.to_string()),
            url: Some(url.to_string()),
            ..RequestTabPatch::default()
        })
    }

    #[test]
    fn missing_state_is_empty() {
        let store = ContextStateStore::new();
        assert_eq!(store.get_context_state("request-1"), ContextState::Empty);
    }

    #[test]
    fn updates_merge_shallowly() {
        let mut store = ContextStateStore::new();
        store.set_context_state("request-1", request_patch("GET", "/users"));
        store.update_context_state(
            "request-1",
            ContextStatePatch::Request(RequestTabPatch {
                is_dirty: Some(true),
                ..RequestTabPatch::default()
            }),
        );

        let state = store.get_context_state("request-1");
        let request = state.as_request().unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "/users");
        assert!(request.is_dirty);
    }

    #[test]
    fn template_fields_merge_one_level() {
        let mut store = ContextStateStore::new();
        let mut first = Map::new();
        first.insert("filter".into(), json!({"tag": "users"}));
        first.insert("expanded".into(), json!(true));
        store.update_context_state("openapi", ContextStatePatch::Template(first));

        let mut second = Map::new();
        second.insert("filter".into(), json!({"method": "GET"}));
        store.update_context_state("openapi", ContextStatePatch::Template(second));

        let state = store.get_context_state("openapi");
        let fields = &state.as_template().unwrap().fields;
        assert_eq!(fields["filter"], json!({"method": "GET"}));
        assert_eq!(fields["expanded"], json!(true));
    }

    #[test]
    fn kind_mismatch_replaces_state() {
        let mut store = ContextStateStore::new();
        store.update_context_state("x", request_patch("POST", "/orders"));
        store.update_context_state("x", ContextStatePatch::Template(Map::new()));
        assert_eq!(store.get_context_state("x").kind(), "template");

        store.update_context_state(
            "x",
            ContextStatePatch::Request(RequestTabPatch {
                url: Some("/items".into()),
                ..RequestTabPatch::default()
            }),
        );
        let state = store.get_context_state("x");
        let request = state.as_request().unwrap();
        assert_eq!(request.method, "");
        assert_eq!(request.url, "/items");
    }

    #[test]
    fn persisted_projection_never_contains_response() {
        let mut store = ContextStateStore::new();
        store.update_context_state(
            "request-1",
            ContextStatePatch::Request(RequestTabPatch {
                method: Some(String::new()),
                is_dirty: Some(false),
                response: Some(ResponseSnapshot {
                    status: 200,
                    headers: BTreeMap::new(),
                    body: "{}".into(),
                    duration_ms: 12,
                }),
                ..RequestTabPatch::default()
            }),
        );
        assert!(store
            .get_context_state("request-1")
            .as_request()
            .unwrap()
            .response
            .is_some());

        let projection = serde_json::to_value(store.persisted_projection()).unwrap();
        let persisted = &projection["request-1"];
        assert!(persisted.get("response").is_none());
        assert_eq!(persisted["method"], json!(""));
        assert_eq!(persisted["isDirty"], json!(false));
    }

    #[test]
    fn display_label_requires_method_and_url() {
        let state = RequestTabState {
            method: "get".into(),
            url: "https://api.example.com/users".into(),
            ..RequestTabState::default()
        };
        assert_eq!(
            state.display_label().as_deref(),
            Some("GET https://api.example.com/users")
        );
        assert!(RequestTabState::default().display_label().is_none());
    }
}
