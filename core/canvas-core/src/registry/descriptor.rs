use serde::{Deserialize, Serialize};

pub const REQUEST_TEMPLATE_ID: &str = "request";
pub const REQUEST_ID_PREFIX: &str = "request-";

/// Order key used for request tabs when no `"request"` template is registered.
pub const FALLBACK_REQUEST_ORDER: i32 = 1_000;

/// Capability-keyed renderer slot. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSlot {
    pub capability: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub id: String,
    pub label: String,
}

impl LayoutDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarDescriptor {
    pub id: String,
}

/// Static definition of a context. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDescriptor {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub panels: Vec<PanelSlot>,
    #[serde(default)]
    pub layouts: Vec<LayoutDescriptor>,
    #[serde(default)]
    pub toolbar: Option<ToolbarDescriptor>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub popout_enabled: bool,
}

impl ContextDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            panels: Vec::new(),
            layouts: Vec::new(),
            toolbar: None,
            order,
            popout_enabled: false,
        }
    }

    /// Builds a request tab that inherits panels, layouts, toolbar and order
    /// from `template`, or from an empty null object when there is none.
    pub fn request_tab(
        id: impl Into<String>,
        label: impl Into<String>,
        template: Option<&TemplateDescriptor>,
    ) -> ContextDescriptor {
        let (panels, layouts, toolbar, order, popout_enabled) = match template {
            Some(template) => (
                template.context.panels.clone(),
                template.context.layouts.clone(),
                template.context.toolbar.clone(),
                template.context.order,
                template.context.popout_enabled,
            ),
            None => (Vec::new(), Vec::new(), None, FALLBACK_REQUEST_ORDER, false),
        };
        ContextDescriptor {
            id: id.into(),
            label: label.into(),
            panels,
            layouts,
            toolbar,
            order,
            popout_enabled,
        }
    }

    pub fn with_layouts(mut self, layouts: Vec<LayoutDescriptor>) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn with_panels(mut self, capabilities: &[&str]) -> Self {
        self.panels = capabilities
            .iter()
            .map(|capability| PanelSlot {
                capability: capability.to_string(),
            })
            .collect();
        self
    }
}

/// Entry in the template registry: what new tabs inherit from and what
/// `snapshot.templates` lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub context: ContextDescriptor,
    pub template_type: String,
}

impl TemplateDescriptor {
    pub fn new(context: ContextDescriptor, template_type: impl Into<String>) -> Self {
        Self {
            context,
            template_type: template_type.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.context.id
    }
}

/// A registered context instance: a static template view or a request tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveContext {
    descriptor: ContextDescriptor,
    pub(crate) seq: u64,
}

impl LiveContext {
    pub(crate) fn new(descriptor: ContextDescriptor, seq: u64) -> Self {
        Self { descriptor, seq }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn descriptor(&self) -> &ContextDescriptor {
        &self.descriptor
    }

    pub fn layouts(&self) -> &[LayoutDescriptor] {
        &self.descriptor.layouts
    }

    pub fn is_request(&self) -> bool {
        is_request_id(self.id())
    }
}

pub fn is_request_id(id: &str) -> bool {
    id.starts_with(REQUEST_ID_PREFIX)
}

pub fn new_request_id() -> String {
    format!("{}{}", REQUEST_ID_PREFIX, uuid::Uuid::new_v4())
}
