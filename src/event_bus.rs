//! Event Bus
//!
//! Single-threaded publish/subscribe keyed by string topic. Every component in
//! this crate talks to the others through one shared bus handle.
//!
//! Listeners of one event run in subscription order. An event emitted while the
//! bus is already dispatching is queued and delivered once the current event
//! has reached all of its listeners, so a top-level `emit` returns only after
//! every cascaded event has been handled.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error};

/// Upper bound on events dispatched by a single top-level emission.
pub const DEFAULT_MAX_CASCADE: usize = 1024;

/// Topics produced and consumed by the narrative layer.
pub mod topics {
    pub const ENTITY_DEATH: &str = "entity:death";
    pub const RESOURCE_COLLECTED: &str = "resource:collected";
    pub const AREA_REACHED: &str = "area:reached";
    pub const UPDATE: &str = "update";

    pub const QUEST_STARTED: &str = "quest:started";
    pub const QUEST_COMPLETED: &str = "quest:completed";
    pub const QUEST_FAILED: &str = "quest:failed";
    pub const QUEST_ACCEPT: &str = "quest:accept";

    pub const DIALOGUE_STARTED: &str = "dialogue:started";
    pub const DIALOGUE_ENDED: &str = "dialogue:ended";

    pub const CAMPAIGN_VARIABLE_CHANGED: &str = "campaign:variable_changed";
    pub const CAMPAIGN_SCENARIO_COMPLETED: &str = "campaign:scenario_completed";
    pub const CAMPAIGN_SET_VARIABLE: &str = "campaign:set_variable";
    pub const CAMPAIGN_RESET: &str = "campaign:reset";

    pub const TRIGGER_FIRED: &str = "trigger:fired";
}

/// Callback invoked with the payload of an emitted event.
pub type Handler = Rc<dyn Fn(&Value)>;

/// Returned by [`EventBus::on`]; pass it to [`EventBus::off`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    handler: Handler,
}

struct BusInner {
    listeners: HashMap<String, Vec<Listener>>,
    queue: VecDeque<(String, Value)>,
    dispatching: bool,
    next_id: u64,
    max_cascade: usize,
}

/// Shared handle to the bus. Cloning is cheap and every clone sees the same
/// listeners and queue.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_max_cascade(DEFAULT_MAX_CASCADE)
    }

    pub fn with_max_cascade(max_cascade: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                listeners: HashMap::new(),
                queue: VecDeque::new(),
                dispatching: false,
                next_id: 0,
                max_cascade: max_cascade.max(1),
            })),
        }
    }

    /// Subscribe to a topic
    pub fn on<F>(&self, topic: &str, handler: F) -> ListenerId
    where
        F: Fn(&Value) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner
            .listeners
            .entry(topic.to_string())
            .or_default()
            .push(Listener {
                id,
                handler: Rc::new(handler),
            });
        id
    }

    /// Unsubscribe a listener. Returns false if it was not registered on `topic`.
    pub fn off(&self, topic: &str, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(listeners) = inner.listeners.get_mut(topic) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            inner.listeners.remove(topic);
        }
        removed
    }

    /// Emit an event to every listener of `topic`
    pub fn emit(&self, topic: &str, data: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.queue.push_back((topic.to_string(), data));
            if inner.dispatching {
                debug!(topic, "queued event emitted during dispatch");
                return;
            }
            inner.dispatching = true;
        }
        let _guard = DispatchGuard { bus: self };
        self.drain();
    }

    /// Drop every listener and any queued events.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.listeners.clear();
        inner.queue.clear();
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(topic)
            .map_or(0, Vec::len)
    }

    pub fn is_dispatching(&self) -> bool {
        self.inner.borrow().dispatching
    }

    fn drain(&self) {
        let mut dispatched = 0usize;
        loop {
            let (topic, data, handlers) = {
                let mut inner = self.inner.borrow_mut();
                let Some((topic, data)) = inner.queue.pop_front() else {
                    return;
                };
                if dispatched >= inner.max_cascade {
                    let dropped = inner.queue.len() + 1;
                    inner.queue.clear();
                    error!(
                        topic = %topic,
                        dropped,
                        "event cascade exceeded {} dispatches, discarding queued events",
                        inner.max_cascade
                    );
                    return;
                }
                // Snapshot so handlers can subscribe/unsubscribe mid-dispatch.
                let handlers: Vec<Handler> = inner
                    .listeners
                    .get(&topic)
                    .map(|ls| ls.iter().map(|l| Rc::clone(&l.handler)).collect())
                    .unwrap_or_default();
                (topic, data, handlers)
            };

            dispatched += 1;
            debug!(topic = %topic, listeners = handlers.len(), "dispatching event");
            for handler in handlers {
                handler(&data);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("topics", &inner.listeners.len())
            .field("queued", &inner.queue.len())
            .field("dispatching", &inner.dispatching)
            .finish()
    }
}

/// Leaves the bus usable again if a handler unwinds.
struct DispatchGuard<'a> {
    bus: &'a EventBus,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.bus.inner.borrow_mut();
        inner.dispatching = false;
        if std::thread::panicking() {
            inner.queue.clear();
        }
    }
}
