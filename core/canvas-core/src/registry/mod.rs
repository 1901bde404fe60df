//! Context registry: descriptors, ordering, activation, history and layouts.
//!
//! # Invariants
//!
//! - Every id in the order has a registry entry and vice versa.
//! - The active id is `None` only when nothing is registered.
//! - Order is a stable sort on each descriptor's `order` key; ties keep
//!   first-registration sequence (replacing a descriptor keeps its slot).
//!
//! Unknown ids are never errors: operations on them return `false`/`None` so
//! stale UI callbacks and malformed remote commands cannot corrupt state.

mod descriptor;
mod layouts;

pub use descriptor::{
    is_request_id, new_request_id, ContextDescriptor, LayoutDescriptor, LiveContext, PanelSlot,
    TemplateDescriptor, ToolbarDescriptor, FALLBACK_REQUEST_ORDER, REQUEST_ID_PREFIX,
    REQUEST_TEMPLATE_ID,
};
pub use layouts::generic_layout;

use std::collections::HashMap;

use crate::history::ContextHistory;

#[derive(Debug, Clone)]
pub struct ContextRegistry {
    contexts: HashMap<String, LiveContext>,
    order: Vec<String>,
    active: Option<String>,
    history: ContextHistory,
    templates: Vec<TemplateDescriptor>,
    active_layouts: HashMap<String, String>,
    next_seq: u64,
}

impl ContextRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            contexts: HashMap::new(),
            order: Vec::new(),
            active: None,
            history: ContextHistory::new(history_limit),
            templates: Vec::new(),
            active_layouts: HashMap::new(),
            next_seq: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Contexts
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts or replaces a descriptor. Activates it only when nothing is active.
    /// Returns `true` when the id was not registered before.
    pub fn register_context(&mut self, descriptor: ContextDescriptor) -> bool {
        let id = descriptor.id.clone();
        let seq = match self.contexts.get(&id) {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        let inserted = self
            .contexts
            .insert(id.clone(), LiveContext::new(descriptor, seq))
            .is_none();
        self.recompute_order();

        if self.active.is_none() {
            self.active = Some(id.clone());
        }

        tracing::debug!(context_id = %id, inserted, "Context registered");
        inserted
    }

    /// Removes a context. If it was active, activation moves to the previous
    /// neighbour in order, else the next one, else `None`.
    pub fn unregister_context(&mut self, id: &str) -> Option<LiveContext> {
        if !self.contexts.contains_key(id) {
            tracing::debug!(context_id = %id, "Ignoring unregister of unknown context");
            return None;
        }

        let was_active = self.active.as_deref() == Some(id);
        let replacement = if was_active {
            self.adjacent_to(id)
        } else {
            None
        };

        let removed = self.contexts.remove(id);
        self.order.retain(|candidate| candidate != id);
        self.active_layouts.remove(id);

        if was_active {
            self.active = replacement;
        }

        tracing::debug!(
            context_id = %id,
            active = ?self.active,
            "Context unregistered"
        );
        removed
    }

    /// Activates a registered context, pushing the previous one onto history.
    /// The newly active id never stays in history.
    /// Returns `false` for unknown ids and for the already-active id.
    pub fn set_active_context(&mut self, id: &str) -> bool {
        if !self.contexts.contains_key(id) {
            tracing::debug!(context_id = %id, "Ignoring switch to unknown context");
            return false;
        }
        if self.active.as_deref() == Some(id) {
            return false;
        }
        if let Some(previous) = self.active.take() {
            self.history.push(&previous);
        }
        self.history.remove(id);
        self.active = Some(id.to_string());
        true
    }

    /// Pops the most recent history entry and activates it if it still exists.
    /// A stale entry is consumed without falling through to older ones.
    pub fn go_back(&mut self) -> bool {
        let Some(target) = self.history.pop() else {
            return false;
        };
        if !self.contexts.contains_key(&target) || self.active.as_deref() == Some(&target) {
            tracing::debug!(context_id = %target, "History entry no longer applicable");
            return false;
        }
        self.history.remove(&target);
        self.active = Some(target);
        true
    }

    /// Activates without touching history. Used when restoring persisted state.
    pub(crate) fn restore_active(&mut self, id: &str) -> bool {
        if !self.contexts.contains_key(id) {
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    pub fn get(&self, id: &str) -> Option<&LiveContext> {
        self.contexts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.contexts.contains_key(id)
    }

    pub fn contexts(&self) -> &HashMap<String, LiveContext> {
        &self.contexts
    }

    pub fn context_order(&self) -> &[String] {
        &self.order
    }

    pub fn active_context_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn history(&self) -> &ContextHistory {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn recompute_order(&mut self) {
        let mut entries: Vec<(&String, &LiveContext)> = self.contexts.iter().collect();
        entries.sort_by_key(|(_, context)| (context.descriptor().order, context.seq));
        self.order = entries.into_iter().map(|(id, _)| id.clone()).collect();
    }

    fn adjacent_to(&self, id: &str) -> Option<String> {
        let index = self.order.iter().position(|candidate| candidate == id)?;
        if index > 0 {
            return self.order.get(index - 1).cloned();
        }
        self.order.get(index + 1).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Templates
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts or replaces a template. Templates never appear in the tab order.
    pub fn register_template(&mut self, template: TemplateDescriptor) -> bool {
        let inserted = match self
            .templates
            .iter_mut()
            .find(|existing| existing.id() == template.id())
        {
            Some(existing) => {
                *existing = template;
                false
            }
            None => {
                self.templates.push(template);
                true
            }
        };
        self.templates.sort_by_key(|template| template.context.order);
        inserted
    }

    pub fn unregister_template(&mut self, id: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|template| template.id() != id);
        self.templates.len() != before
    }

    pub fn template(&self, id: &str) -> Option<&TemplateDescriptor> {
        self.templates.iter().find(|template| template.id() == id)
    }

    pub fn templates(&self) -> &[TemplateDescriptor] {
        &self.templates
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Layouts
    // ─────────────────────────────────────────────────────────────────────────────

    /// Selects a layout for a registered context. Returns `true` on change.
    pub fn set_active_layout(&mut self, context_id: &str, layout_id: &str) -> bool {
        if !self.contexts.contains_key(context_id) {
            return false;
        }
        let previous = self
            .active_layouts
            .insert(context_id.to_string(), layout_id.to_string());
        previous.as_deref() != Some(layout_id)
    }

    /// Resolves the layout for a context: the selected id among its own
    /// layouts, then the generic catalog, then its first layout.
    pub fn active_layout(&self, context_id: &str) -> Option<LayoutDescriptor> {
        let context = self.contexts.get(context_id)?;
        let own = context.layouts();
        let first = || own.first().cloned();

        match self.active_layouts.get(context_id) {
            Some(selected) => own
                .iter()
                .find(|layout| &layout.id == selected)
                .cloned()
                .or_else(|| generic_layout(selected))
                .or_else(first),
            None => first(),
        }
    }

    pub fn active_layouts(&self) -> &HashMap<String, String> {
        &self.active_layouts
    }
}
