//! Audit trail of remote commands, including the ones gating suppressed.
//!
//! Lets a reader show "AI tried to switch to X" even when the active tab did
//! not move. Bounded; the oldest entries fall off first.

use canvas_protocol::Actor;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One remote command as the canvas saw it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Command label, e.g. `switch_tab`
    pub action: String,
    pub actor: Actor,
    /// Context id the command targeted, when it named or created one
    #[serde(default)]
    pub target: Option<String>,
    /// Whether the visible effect took place
    pub applied: bool,
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// RFC3339
    pub recorded_at: String,
}

impl ActivityEntry {
    pub fn new(
        action: &str,
        actor: Actor,
        target: Option<String>,
        applied: bool,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            action: action.to_string(),
            actor,
            target,
            applied,
            correlation_id,
            recorded_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    limit: usize,
}

impl ActivityLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn append(&mut self, entry: ActivityEntry) {
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        tracing::debug!(
            action = %entry.action,
            actor = entry.actor.as_str(),
            target = ?entry.target,
            applied = entry.applied,
            "Activity recorded"
        );
        self.entries.push_back(entry);
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ActivityEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
