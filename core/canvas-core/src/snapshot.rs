//! Pure projection of the canvas into the backend snapshot shape.

use canvas_protocol::{CanvasStateSnapshot, TabSummary, TabType, TemplateSummary};

use crate::registry::{is_request_id, ContextRegistry, LiveContext};
use crate::state::ContextStateStore;

const UNTITLED_REQUEST_LABEL: &str = "Request";

/// Builds the snapshot for `order` and `active_id`.
///
/// Ids missing from the registry are skipped. `activeTabIndex` indexes the
/// emitted tabs and is `None` when `active_id` is absent or dangling.
pub fn build_snapshot(
    registry: &ContextRegistry,
    store: &ContextStateStore,
    order: &[String],
    active_id: Option<&str>,
) -> CanvasStateSnapshot {
    let tabs: Vec<TabSummary> = order
        .iter()
        .filter_map(|id| registry.get(id))
        .map(|context| TabSummary {
            id: context.id().to_string(),
            label: tab_label(context, store),
            tab_type: if is_request_id(context.id()) {
                TabType::Request
            } else {
                TabType::Template
            },
        })
        .collect();

    let active_tab_index =
        active_id.and_then(|active| tabs.iter().position(|tab| tab.id == active));

    let templates = registry
        .templates()
        .iter()
        .map(|template| TemplateSummary {
            id: template.id().to_string(),
            name: template.context.label.clone(),
            template_type: template.template_type.clone(),
        })
        .collect();

    CanvasStateSnapshot {
        tabs,
        active_tab_index,
        templates,
    }
}

fn tab_label(context: &LiveContext, store: &ContextStateStore) -> String {
    if !context.label().trim().is_empty() || !context.is_request() {
        return context.label().to_string();
    }
    store
        .get(context.id())
        .and_then(|state| state.as_request())
        .and_then(|state| state.display_label())
        .unwrap_or_else(|| UNTITLED_REQUEST_LABEL.to_string())
}
