//! Debounced sync state machine: `Idle → PendingDebounce → Syncing → Idle`.
//!
//! The scheduler owns no clock or thread. Callers pass `now` in, so the
//! runtime services `deadline()` with `recv_timeout` and tests drive it with
//! synthetic instants.

use std::time::{Duration, Instant};

use canvas_protocol::Actor;

use crate::hint::CanvasFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    PendingDebounce { deadline: Instant },
    /// `rearm` is set when a mutation lands while the attempt is in flight.
    Syncing { rearm: bool },
}

/// Handed out when the debounce window expires. Carries the attribution the
/// attempt goes out with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTicket {
    pub actor: Actor,
}

#[derive(Debug)]
pub struct SyncScheduler {
    debounce: Duration,
    phase: SyncPhase,
    last_synced: Option<CanvasFrame>,
    actor: Actor,
    actor_epoch: u64,
    in_flight_epoch: Option<u64>,
}

impl SyncScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            phase: SyncPhase::Idle,
            last_synced: None,
            actor: Actor::User,
            actor_epoch: 0,
            in_flight_epoch: None,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Frame of the last successful sync; hints are derived against it.
    pub fn last_synced(&self) -> Option<&CanvasFrame> {
        self.last_synced.as_ref()
    }

    /// Attributes upcoming mutations to `actor`.
    pub fn attribute(&mut self, actor: Actor) {
        self.actor = actor;
        self.actor_epoch += 1;
    }

    /// Restarts the debounce window, or marks an in-flight attempt for re-arm.
    pub fn record_mutation(&mut self, now: Instant) {
        if let SyncPhase::Syncing { rearm } = &mut self.phase {
            *rearm = true;
            return;
        }
        self.phase = SyncPhase::PendingDebounce {
            deadline: now + self.debounce,
        };
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            SyncPhase::PendingDebounce { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Moves to `Syncing` once the window has expired.
    pub fn poll(&mut self, now: Instant) -> Option<SyncTicket> {
        match self.phase {
            SyncPhase::PendingDebounce { deadline } if now >= deadline => {
                self.phase = SyncPhase::Syncing { rearm: false };
                self.in_flight_epoch = Some(self.actor_epoch);
                Some(SyncTicket {
                    actor: self.actor.clone(),
                })
            }
            _ => None,
        }
    }

    /// Finishes the in-flight attempt. `frame` becomes the comparison base
    /// only when `ok`. Attribution resets to the user unless a newer one
    /// arrived while the attempt was in flight.
    pub fn complete(&mut self, frame: CanvasFrame, ok: bool, now: Instant) {
        let SyncPhase::Syncing { rearm } = self.phase else {
            tracing::debug!(phase = ?self.phase, "Sync completion outside of Syncing ignored");
            return;
        };

        if ok {
            self.last_synced = Some(frame);
        }
        if self.in_flight_epoch.take() == Some(self.actor_epoch) {
            self.actor = Actor::User;
        }

        self.phase = if rearm {
            SyncPhase::PendingDebounce {
                deadline: now + self.debounce,
            }
        } else {
            SyncPhase::Idle
        };
    }
}
