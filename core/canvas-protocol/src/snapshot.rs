//! Backend-shaped canvas snapshot and the event hint that accompanies it.

use serde::{Deserialize, Serialize};

/// Immutable view of the canvas pushed to the daemon on every sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanvasStateSnapshot {
    pub tabs: Vec<TabSummary>,
    pub active_tab_index: Option<usize>,
    pub templates: Vec<TemplateSummary>,
}

impl CanvasStateSnapshot {
    pub fn active_tab(&self) -> Option<&TabSummary> {
        self.active_tab_index.and_then(|index| self.tabs.get(index))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
    pub id: String,
    pub label: String,
    pub tab_type: TabType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TabType {
    Template,
    Request,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub template_type: String,
}

/// Single classification of what changed between two synced frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanvasEventHint {
    TabOpened { tab_id: String, label: String },
    TabClosed { tab_id: String, label: String },
    TabSwitched { tab_id: String, label: String },
    LayoutChanged { context_id: String, layout_id: String },
    StateSync,
}

impl CanvasEventHint {
    /// Event name recorded in the daemon audit log.
    pub fn event_type(&self) -> &'static str {
        match self {
            CanvasEventHint::TabOpened { .. } => "canvas:tab_opened",
            CanvasEventHint::TabClosed { .. } => "canvas:tab_closed",
            CanvasEventHint::TabSwitched { .. } => "canvas:tab_switched",
            CanvasEventHint::LayoutChanged { .. } => "canvas:layout_changed",
            CanvasEventHint::StateSync => "canvas:state_sync",
        }
    }

    pub fn tab_id(&self) -> Option<&str> {
        match self {
            CanvasEventHint::TabOpened { tab_id, .. }
            | CanvasEventHint::TabClosed { tab_id, .. }
            | CanvasEventHint::TabSwitched { tab_id, .. } => Some(tab_id),
            CanvasEventHint::LayoutChanged { context_id, .. } => Some(context_id),
            CanvasEventHint::StateSync => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tab(id: &str, tab_type: TabType) -> TabSummary {
        TabSummary {
            id: id.to_string(),
            label: id.to_uppercase(),
            tab_type,
        }
    }

    #[test]
    fn empty_snapshot_serializes_with_null_index() {
        let value = serde_json::to_value(CanvasStateSnapshot::default()).unwrap();
        assert_eq!(
            value,
            json!({"tabs": [], "activeTabIndex": null, "templates": []})
        );
    }

    #[test]
    fn active_tab_follows_index() {
        let snapshot = CanvasStateSnapshot {
            tabs: vec![tab("a", TabType::Template), tab("b", TabType::Request)],
            active_tab_index: Some(1),
            templates: vec![],
        };
        assert_eq!(snapshot.active_tab().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn active_tab_none_when_index_out_of_range() {
        let snapshot = CanvasStateSnapshot {
            tabs: vec![tab("a", TabType::Template)],
            active_tab_index: Some(7),
            templates: vec![],
        };
        assert!(snapshot.active_tab().is_none());
    }

    #[test]
    fn tab_summary_uses_camel_case_and_lowercase_type() {
        let json = serde_json::to_string(&tab("request-1", TabType::Request)).unwrap();
        assert!(json.contains("\"tabType\":\"request\""));
    }

    #[test]
    fn hint_is_tagged_by_kind() {
        let hint = CanvasEventHint::TabOpened {
            tab_id: "b".to_string(),
            label: "B".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&hint).unwrap(),
            json!({"kind": "tab_opened", "tab_id": "b", "label": "B"})
        );
        assert_eq!(hint.event_type(), "canvas:tab_opened");
        assert_eq!(
            serde_json::to_value(CanvasEventHint::StateSync).unwrap(),
            json!({"kind": "state_sync"})
        );
    }

    #[test]
    fn layout_changed_hint_decodes_and_names_its_event() {
        let hint: CanvasEventHint = serde_json::from_value(json!({
            "kind": "layout_changed",
            "context_id": "ctx",
            "layout_id": "lay"
        }))
        .unwrap();
        assert_eq!(
            hint,
            CanvasEventHint::LayoutChanged {
                context_id: "ctx".to_string(),
                layout_id: "lay".to_string(),
            }
        );
        assert_eq!(hint.event_type(), "canvas:layout_changed");
        assert_eq!(hint.tab_id(), Some("ctx"));
    }
}
