//! In-process event bus for named remote events, with RAII subscriptions.
//!
//! Dropping a `Subscription` unregisters its handler. `RemoteListeners`
//! installs one subscription per remote event name and tears the previous
//! set down on every re-init.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use canvas_protocol::{EventEnvelope, RemoteEventName};

use crate::commands::{parse_remote_event, RemoteEvent};

type Handler = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, Handler)>>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let mut id = 0;
        if let Ok(mut inner) = self.inner.lock() {
            inner.next_id += 1;
            id = inner.next_id;
            inner
                .handlers
                .entry(event.to_string())
                .or_default()
                .push((id, Arc::new(handler)));
        }
        Subscription {
            bus: Arc::downgrade(&self.inner),
            event: event.to_string(),
            id,
        }
    }

    /// Delivers to every current handler of `event`. Handlers run outside the
    /// bus lock. Returns how many were called.
    pub fn emit(&self, event: &str, envelope: &EventEnvelope) -> usize {
        let handlers: Vec<Handler> = match self.inner.lock() {
            Ok(inner) => inner
                .handlers
                .get(event)
                .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default(),
            Err(_) => return 0,
        };
        for handler in &handlers {
            handler(envelope);
        }
        handlers.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.handlers.get(event).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

/// Handler registration; unregisters on drop.
pub struct Subscription {
    bus: Weak<Mutex<BusInner>>,
    event: String,
    id: u64,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let Ok(mut inner) = bus.lock() else {
            return;
        };
        if let Some(handlers) = inner.handlers.get_mut(&self.event) {
            handlers.retain(|(id, _)| *id != self.id);
            if handlers.is_empty() {
                inner.handlers.remove(&self.event);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote listeners
// ─────────────────────────────────────────────────────────────────────────────

struct Installed {
    generation: u64,
    subscriptions: Vec<Subscription>,
}

type InstalledSlot = Arc<Mutex<Option<Installed>>>;

pub struct RemoteListeners {
    bus: EventBus,
    installed: InstalledSlot,
    next_generation: AtomicU64,
    in_progress: AtomicBool,
}

impl RemoteListeners {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            installed: Arc::new(Mutex::new(None)),
            next_generation: AtomicU64::new(0),
            in_progress: AtomicBool::new(false),
        }
    }

    /// Replaces any installed listeners with one per remote event name, each
    /// decoding its event and passing it to `forward`. Malformed events are
    /// logged and dropped.
    ///
    /// A concurrent call returns an empty set and installs nothing.
    pub fn init<F>(&self, forward: F) -> ListenerSet
    where
        F: Fn(RemoteEvent) + Send + Sync + 'static,
    {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Remote listener init already in progress");
            return ListenerSet::empty();
        }

        let previous = self.installed.lock().ok().and_then(|mut slot| slot.take());
        if let Some(previous) = previous {
            tracing::debug!(
                generation = previous.generation,
                listeners = previous.subscriptions.len(),
                "Tearing down remote listeners"
            );
        }

        let forward = Arc::new(forward);
        let subscriptions: Vec<Subscription> = RemoteEventName::ALL
            .iter()
            .map(|name| {
                let event = name.as_str();
                let forward = Arc::clone(&forward);
                self.bus.subscribe(event, move |envelope| {
                    match parse_remote_event(event, envelope.clone()) {
                        Ok(remote) => forward(remote),
                        Err(err) => {
                            tracing::warn!(event, error = %err, "Dropping malformed remote event")
                        }
                    }
                })
            })
            .collect();

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let len = subscriptions.len();
        if let Ok(mut slot) = self.installed.lock() {
            *slot = Some(Installed {
                generation,
                subscriptions,
            });
        }
        self.in_progress.store(false, Ordering::Release);

        tracing::info!(generation, listeners = len, "Remote listeners installed");
        ListenerSet {
            slot: Some(Arc::downgrade(&self.installed)),
            generation,
            len,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

/// Cleanup handle for one `init`. Dropping it removes that generation's
/// listeners; a handle from an older generation leaves newer ones alone.
pub struct ListenerSet {
    slot: Option<Weak<Mutex<Option<Installed>>>>,
    generation: u64,
    len: usize,
}

impl ListenerSet {
    fn empty() -> Self {
        Self {
            slot: None,
            generation: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        let Some(slot) = self.slot.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let released = match slot.lock() {
            Ok(mut installed) => {
                let current = installed.as_ref().map(|current| current.generation);
                if current == Some(self.generation) {
                    installed.take()
                } else {
                    None
                }
            }
            Err(_) => None,
        };
        drop(released);
    }
}
