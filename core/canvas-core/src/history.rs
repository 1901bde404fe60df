//! Back-navigation stack of previously active context ids.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ContextHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl ContextHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Records `id` as the most recent entry unless it already is.
    /// The oldest entry is dropped once `limit` is reached.
    pub fn push(&mut self, id: &str) {
        if self.entries.back().map(String::as_str) == Some(id) {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(id.to_string());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop_back()
    }

    /// Drops every occurrence of `id`.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|entry| entry != id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
