//! Logical source identity of request tabs and the dedup index over it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a request tab's content came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    #[serde(rename_all = "camelCase")]
    Collection {
        collection_id: String,
        request_id: String,
    },
    #[serde(rename_all = "camelCase")]
    History { history_entry_id: String },
}

impl Source {
    pub fn collection(collection_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Source::Collection {
            collection_id: collection_id.into(),
            request_id: request_id.into(),
        }
    }

    pub fn history(history_entry_id: impl Into<String>) -> Self {
        Source::History {
            history_entry_id: history_entry_id.into(),
        }
    }
}

/// Bidirectional source ↔ context map. At most one context per source and
/// one source per context.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    by_source: HashMap<Source, String>,
    by_context: HashMap<String, Source>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `source` to `context_id`, clearing any previous owner of the
    /// source and any previous source of the context.
    pub fn bind(&mut self, context_id: &str, source: Source) {
        if let Some(previous_owner) = self.by_source.remove(&source) {
            if previous_owner != context_id {
                tracing::debug!(
                    context_id = %previous_owner,
                    "Source rebound away from context"
                );
            }
            self.by_context.remove(&previous_owner);
        }
        if let Some(previous_source) = self.by_context.remove(context_id) {
            self.by_source.remove(&previous_source);
        }
        self.by_source.insert(source.clone(), context_id.to_string());
        self.by_context.insert(context_id.to_string(), source);
    }

    pub fn unbind(&mut self, context_id: &str) -> Option<Source> {
        let source = self.by_context.remove(context_id)?;
        self.by_source.remove(&source);
        Some(source)
    }

    pub fn lookup(&self, source: &Source) -> Option<&str> {
        self.by_source.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_wire_shape_uses_type_tag_and_camel_case() {
        let value = serde_json::to_value(Source::collection("col_1", "req_1")).unwrap();
        assert_eq!(
            value,
            json!({"type": "collection", "collectionId": "col_1", "requestId": "req_1"})
        );
        let value = serde_json::to_value(Source::history("h_9")).unwrap();
        assert_eq!(value, json!({"type": "history", "historyEntryId": "h_9"}));
    }

    #[test]
    fn lookup_finds_bound_context() {
        let mut index = SourceIndex::new();
        index.bind("request-1", Source::collection("col_1", "req_1"));
        assert_eq!(
            index.lookup(&Source::collection("col_1", "req_1")),
            Some("request-1")
        );
        assert_eq!(index.lookup(&Source::collection("col_1", "req_2")), None);
    }

    #[test]
    fn rebinding_clears_previous_owner() {
        let mut index = SourceIndex::new();
        let source = Source::history("h_1");
        index.bind("request-1", source.clone());
        index.bind("request-2", source.clone());

        assert_eq!(index.lookup(&source), Some("request-2"));
        assert!(index.unbind("request-1").is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn context_gets_one_source() {
        let mut index = SourceIndex::new();
        index.bind("request-1", Source::history("h_1"));
        index.bind("request-1", Source::history("h_2"));
        assert!(index.lookup(&Source::history("h_1")).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn unbind_removes_both_directions() {
        let mut index = SourceIndex::new();
        index.bind("request-1", Source::history("h_1"));
        assert_eq!(index.unbind("request-1"), Some(Source::history("h_1")));
        assert!(index.is_empty());
        assert!(index.unbind("request-1").is_none());
    }
}
