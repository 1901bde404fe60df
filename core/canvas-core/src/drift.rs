//! Session-scoped drift review decisions.
//!
//! Local writes are optimistic and produce a `DriftPush` for the background
//! worker. Writes that originate from an inbound confirmation pass
//! `skip_remote_sync` so they never echo back to the daemon.

use std::collections::BTreeMap;

use canvas_protocol::{DriftKey, DriftReviewStatus};

/// Outbound decision for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftPush {
    pub key: DriftKey,
    pub status: DriftReviewStatus,
}

#[derive(Debug, Clone, Default)]
pub struct DriftReviewStore {
    decisions: BTreeMap<DriftKey, DriftReviewStatus>,
}

impl DriftReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown keys are `Pending`.
    pub fn status(&self, key: &DriftKey) -> DriftReviewStatus {
        self.decisions.get(key).copied().unwrap_or_default()
    }

    /// Records `status` for `key`. Returns the push to send, if any: none when
    /// the status is unchanged or `skip_remote_sync` is set.
    pub fn set_decision(
        &mut self,
        key: DriftKey,
        status: DriftReviewStatus,
        skip_remote_sync: bool,
    ) -> Option<DriftPush> {
        let previous = self.status(&key);
        if previous == status {
            tracing::debug!(key = %key.encode(), status = status.as_str(), "Drift decision unchanged");
            return None;
        }

        self.decisions.insert(key.clone(), status);
        tracing::debug!(
            key = %key.encode(),
            status = status.as_str(),
            skip_remote_sync,
            "Drift decision recorded"
        );

        if skip_remote_sync {
            return None;
        }
        Some(DriftPush { key, status })
    }

    pub fn decisions(&self) -> impl Iterator<Item = (&DriftKey, DriftReviewStatus)> {
        self.decisions.iter().map(|(key, status)| (key, *status))
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}
