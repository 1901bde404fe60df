//! Durable projection of the canvas, written on shutdown and restored on start.
//!
//! - Missing file → fresh canvas
//! - Corrupt or version-mismatched file → warning, fresh canvas
//! - Writes are atomic (temp file + rename)
//!
//! Templates and non-request contexts are not persisted; the application
//! registers them again before restoring.

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::canvas::Canvas;
use crate::error::{CanvasError, Result};
use crate::registry::{is_request_id, ContextDescriptor, REQUEST_TEMPLATE_ID};
use crate::state::ContextState;

pub const CANVAS_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRequestTab {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCanvas {
    pub version: u32,
    #[serde(default)]
    pub request_tabs: Vec<PersistedRequestTab>,
    #[serde(default)]
    pub context_order: Vec<String>,
    #[serde(default)]
    pub active_context_id: Option<String>,
    #[serde(default)]
    pub active_layouts: BTreeMap<String, String>,
    /// Persisted projection: no transient response data.
    #[serde(default)]
    pub context_state: BTreeMap<String, ContextState>,
    #[serde(default = "default_follow_ai")]
    pub follow_ai: bool,
}

fn default_follow_ai() -> bool {
    true
}

impl PersistedCanvas {
    pub fn capture(canvas: &Canvas) -> Self {
        let registry = canvas.registry();
        let request_tabs = registry
            .context_order()
            .iter()
            .filter_map(|id| registry.get(id))
            .filter(|context| context.is_request())
            .map(|context| PersistedRequestTab {
                id: context.id().to_string(),
                label: context.label().to_string(),
            })
            .collect();

        Self {
            version: CANVAS_STATE_VERSION,
            request_tabs,
            context_order: registry.context_order().to_vec(),
            active_context_id: registry.active_context_id().map(str::to_string),
            active_layouts: registry
                .active_layouts()
                .iter()
                .map(|(context, layout)| (context.clone(), layout.clone()))
                .collect(),
            context_state: canvas.state_store().persisted_projection(),
            follow_ai: canvas.follow_ai(),
        }
    }

    /// Returns `None` when there is nothing usable on disk.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read canvas state");
                return None;
            }
        };

        let persisted: PersistedCanvas = match serde_json::from_str(&content) {
            Ok(persisted) => persisted,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Canvas state corrupt; starting fresh");
                return None;
            }
        };

        if persisted.version != CANVAS_STATE_VERSION {
            tracing::warn!(
                path = %path.display(),
                version = persisted.version,
                expected = CANVAS_STATE_VERSION,
                "Canvas state version mismatch; starting fresh"
            );
            return None;
        }

        Some(persisted)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| CanvasError::Json {
            context: "Failed to serialize canvas state".to_string(),
            source: e,
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| CanvasError::Io {
            context: "Failed to create canvas state directory".to_string(),
            source: e,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CanvasError::Io {
            context: "Failed to create temp file".to_string(),
            source: e,
        })?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| CanvasError::Io {
                context: "Failed to write temp file".to_string(),
                source: e,
            })?;
        tmp.persist(path).map_err(|e| CanvasError::Io {
            context: "Failed to persist canvas state".to_string(),
            source: e.error,
        })?;

        tracing::debug!(
            path = %path.display(),
            request_tabs = self.request_tabs.len(),
            "Canvas state saved"
        );
        Ok(())
    }

    /// Re-opens persisted request tabs in their saved order, then restores
    /// state, source bindings, layouts, activation and Follow AI. Entries for
    /// contexts that are not registered are dropped.
    pub fn restore_into(self, canvas: &mut Canvas) {
        let position = |id: &str| {
            self.context_order
                .iter()
                .position(|candidate| candidate == id)
                .unwrap_or(usize::MAX)
        };
        let mut tabs = self.request_tabs;
        tabs.sort_by_key(|tab| position(&tab.id));

        let template = canvas.registry().template(REQUEST_TEMPLATE_ID).cloned();
        for tab in tabs.iter().filter(|tab| is_request_id(&tab.id)) {
            canvas.registry_mut().register_context(ContextDescriptor::request_tab(
                &tab.id,
                &tab.label,
                template.as_ref(),
            ));
        }

        let states: BTreeMap<String, ContextState> = self
            .context_state
            .into_iter()
            .filter(|(id, _)| canvas.registry().contains(id))
            .collect();
        for (id, state) in &states {
            if let Some(source) = state.as_request().and_then(|state| state.source.clone()) {
                canvas.bind_source(id, source);
            }
        }
        canvas.state_store_mut().restore(states);

        for (context_id, layout_id) in &self.active_layouts {
            canvas.registry_mut().set_active_layout(context_id, layout_id);
        }
        if let Some(active) = &self.active_context_id {
            if !canvas.registry_mut().restore_active(active) {
                tracing::debug!(context_id = %active, "Persisted active context no longer registered");
            }
        }
        canvas.set_follow_ai(self.follow_ai);

        tracing::info!(
            request_tabs = tabs.len(),
            active = ?canvas.active_context_id(),
            "Canvas state restored"
        );
    }
}
