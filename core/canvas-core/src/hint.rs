//! Classifies the difference between two synced frames as one event hint.

use std::collections::{HashMap, HashSet};

use canvas_protocol::CanvasEventHint;

use crate::registry::{ContextRegistry, LiveContext};

/// The part of the canvas the hint deriver compares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanvasFrame {
    pub context_order: Vec<String>,
    pub active_context_id: Option<String>,
}

impl CanvasFrame {
    pub fn capture(registry: &ContextRegistry) -> Self {
        Self {
            context_order: registry.context_order().to_vec(),
            active_context_id: registry.active_context_id().map(str::to_string),
        }
    }
}

/// Length delta wins over an active-id change; no previous frame, or no
/// visible difference, is `StateSync`. Labels are read from `contexts` now;
/// a tab that no longer exists is labelled with its id.
pub fn derive_hint(
    prev: Option<&CanvasFrame>,
    next: &CanvasFrame,
    contexts: &HashMap<String, LiveContext>,
) -> CanvasEventHint {
    let Some(prev) = prev else {
        return CanvasEventHint::StateSync;
    };

    let label_of = |id: &str| {
        contexts
            .get(id)
            .map(|context| context.label().to_string())
            .unwrap_or_else(|| id.to_string())
    };

    let prev_len = prev.context_order.len();
    let next_len = next.context_order.len();

    if next_len > prev_len {
        if let Some(tab_id) = first_missing(&next.context_order, &prev.context_order) {
            let label = label_of(&tab_id);
            return CanvasEventHint::TabOpened { tab_id, label };
        }
    } else if next_len < prev_len {
        if let Some(tab_id) = first_missing(&prev.context_order, &next.context_order) {
            let label = label_of(&tab_id);
            return CanvasEventHint::TabClosed { tab_id, label };
        }
    } else if prev.active_context_id != next.active_context_id {
        if let Some(tab_id) = next.active_context_id.clone() {
            let label = label_of(&tab_id);
            return CanvasEventHint::TabSwitched { tab_id, label };
        }
    }

    CanvasEventHint::StateSync
}

/// First id of `from` that is not in `other`, in `from`'s order.
fn first_missing(from: &[String], other: &[String]) -> Option<String> {
    let other: HashSet<&str> = other.iter().map(String::as_str).collect();
    from.iter().find(|id| !other.contains(id.as_str())).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ContextDescriptor;

    fn frame(order: &[&str], active: Option<&str>) -> CanvasFrame {
        CanvasFrame {
            context_order: order.iter().map(|id| id.to_string()).collect(),
            active_context_id: active.map(str::to_string),
        }
    }

    fn contexts(ids: &[(&str, &str)]) -> HashMap<String, LiveContext> {
        let mut registry = ContextRegistry::new(10);
        for (order, (id, label)) in ids.iter().enumerate() {
            registry.register_context(ContextDescriptor::new(*id, *label, order as i32));
        }
        registry.contexts().clone()
    }

    #[test]
    fn first_frame_is_state_sync() {
        let hint = derive_hint(None, &frame(&["a"], Some("a")), &HashMap::new());
        assert_eq!(hint, CanvasEventHint::StateSync);
    }

    #[test]
    fn opened_tab_carries_current_label() {
        let hint = derive_hint(
            Some(&frame(&["a"], Some("a"))),
            &frame(&["a", "b"], Some("b")),
            &contexts(&[("a", "Alpha"), ("b", "Bravo")]),
        );
        assert_eq!(
            hint,
            CanvasEventHint::TabOpened {
                tab_id: "b".into(),
                label: "Bravo".into()
            }
        );
    }

    #[test]
    fn closed_tab_falls_back_to_id_for_label() {
        let hint = derive_hint(
            Some(&frame(&["a", "b"], Some("b"))),
            &frame(&["a"], Some("a")),
            &contexts(&[("a", "Alpha")]),
        );
        assert_eq!(
            hint,
            CanvasEventHint::TabClosed {
                tab_id: "b".into(),
                label: "b".into()
            }
        );
    }

    #[test]
    fn same_length_with_new_active_is_switch() {
        let hint = derive_hint(
            Some(&frame(&["a", "b"], Some("a"))),
            &frame(&["a", "b"], Some("b")),
            &contexts(&[("a", "Alpha"), ("b", "Bravo")]),
        );
        assert_eq!(hint.event_type(), "canvas:tab_switched");
        assert_eq!(hint.tab_id(), Some("b"));
    }

    #[test]
    fn open_takes_precedence_over_switch() {
        let hint = derive_hint(
            Some(&frame(&["a", "b"], Some("a"))),
            &frame(&["a", "b", "c"], Some("b")),
            &contexts(&[("a", "A"), ("b", "B"), ("c", "C")]),
        );
        assert_eq!(hint.tab_id(), Some("c"));
        assert_eq!(hint.event_type(), "canvas:tab_opened");
    }

    #[test]
    fn unchanged_frame_is_state_sync() {
        let same = frame(&["a"], Some("a"));
        let hint = derive_hint(Some(&same), &same, &contexts(&[("a", "A")]));
        assert_eq!(hint, CanvasEventHint::StateSync);
    }
}
