//! In-memory state owned by the daemon.
//!
//! Nothing here outlives the process: the engine re-syncs its snapshot on
//! start and drift decisions are session-scoped.

use canvas_protocol::envelope::{DRIFT_CHANGE_ACCEPTED, DRIFT_CHANGE_DISMISSED};
use canvas_protocol::{
    CanvasCommand, CanvasEventRecord, CanvasStateSnapshot, DriftDecisionRecord,
    DriftReviewStatus, EventEnvelope, SetDriftReviewDecisionParams, SyncCanvasStateParams,
    TabSummary,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::config::DaemonConfig;

#[derive(Debug, Clone, Serialize)]
pub struct CanvasStateView {
    pub snapshot: Option<CanvasStateSnapshot>,
    pub active_tab: Option<TabSummary>,
    pub synced_at: Option<String>,
}

#[derive(Default)]
struct Inner {
    snapshot: Option<CanvasStateSnapshot>,
    synced_at: Option<String>,
    events: VecDeque<CanvasEventRecord>,
    drift: BTreeMap<String, DriftDecisionRecord>,
    commands: VecDeque<CanvasCommand>,
    lamport: u64,
}

pub struct SharedState {
    config: DaemonConfig,
    inner: Mutex<Inner>,
}

impl SharedState {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, String> {
        self.inner
            .lock()
            .map_err(|_| "daemon state lock poisoned".to_string())
    }

    /// Replaces the latest snapshot and appends one audit record.
    pub fn record_sync(&self, params: SyncCanvasStateParams) -> Result<CanvasEventRecord, String> {
        let now = Utc::now().to_rfc3339();
        let record = CanvasEventRecord {
            event_type: params.event_hint.event_type().to_string(),
            active_tab_id: params.snapshot.active_tab().map(|tab| tab.id.clone()),
            detail: params.event_hint,
            actor: params.actor,
            recorded_at: now.clone(),
        };

        let mut inner = self.lock()?;
        inner.snapshot = Some(params.snapshot);
        inner.synced_at = Some(now);
        inner.events.push_back(record.clone());
        while inner.events.len() > self.config.event_log_limit {
            inner.events.pop_front();
        }
        Ok(record)
    }

    pub fn canvas_state(&self) -> Result<CanvasStateView, String> {
        let inner = self.lock()?;
        Ok(CanvasStateView {
            active_tab: inner
                .snapshot
                .as_ref()
                .and_then(|snapshot| snapshot.active_tab().cloned()),
            snapshot: inner.snapshot.clone(),
            synced_at: inner.synced_at.clone(),
        })
    }

    /// The `limit` most recent records, oldest first.
    pub fn canvas_events(&self, limit: usize) -> Result<Vec<CanvasEventRecord>, String> {
        let inner = self.lock()?;
        let skip = inner.events.len().saturating_sub(limit);
        Ok(inner.events.iter().skip(skip).cloned().collect())
    }

    /// Stores the decision. A terminal decision made by the AI is echoed to
    /// the engine as a `drift:*` confirmation command.
    pub fn set_drift_decision(
        &self,
        params: SetDriftReviewDecisionParams,
    ) -> Result<DriftDecisionRecord, String> {
        let key = params.key();
        let record = DriftDecisionRecord {
            key: key.encode(),
            status: params.status,
            actor: params.actor.clone(),
            updated_at: Utc::now().to_rfc3339(),
        };

        let confirmation = match params.status {
            _ if !params.actor.is_ai() => None,
            DriftReviewStatus::Accepted => Some(DRIFT_CHANGE_ACCEPTED),
            DriftReviewStatus::Ignored => Some(DRIFT_CHANGE_DISMISSED),
            DriftReviewStatus::Pending => None,
        };

        let mut inner = self.lock()?;
        inner.drift.insert(record.key.clone(), record.clone());
        if let Some(event) = confirmation {
            let envelope = EventEnvelope::new(
                params.actor,
                serde_json::json!({
                    "collectionId": key.collection_id,
                    "method": key.method,
                    "path": key.path,
                }),
            );
            self.push_command(
                &mut inner,
                CanvasCommand {
                    event: event.to_string(),
                    envelope,
                },
            );
        }
        Ok(record)
    }

    pub fn drift_decisions(&self) -> Result<Vec<DriftDecisionRecord>, String> {
        Ok(self.lock()?.drift.values().cloned().collect())
    }

    /// Queues a validated command and returns its Lamport sequence.
    pub fn enqueue_command(&self, command: CanvasCommand) -> Result<u64, String> {
        let mut inner = self.lock()?;
        Ok(self.push_command(&mut inner, command))
    }

    fn push_command(&self, inner: &mut Inner, mut command: CanvasCommand) -> u64 {
        inner.lamport += 1;
        let lamport = inner.lamport;
        command.envelope.lamport = Some(lamport);
        inner.commands.push_back(command);
        while inner.commands.len() > self.config.command_queue_limit {
            if let Some(dropped) = inner.commands.pop_front() {
                tracing::warn!(
                    event = %dropped.event,
                    lamport = ?dropped.envelope.lamport,
                    "Command queue full; dropping oldest command"
                );
            }
        }
        lamport
    }

    pub fn drain_commands(&self) -> Result<Vec<CanvasCommand>, String> {
        Ok(self.lock()?.commands.drain(..).collect())
    }
}
