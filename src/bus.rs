//! Event bus — synchronous publish/subscribe keyed by event name.
//!
//! DESIGN
//! ======
//! Every data → DOM update in the engine travels through one `EventBus`.
//! Channels are named `<model>.<property>:change` and hold an ordered list
//! of listener slots. Removing a subscription clears its slot instead of
//! shifting the list, so the index stored in every other handle stays valid
//! and a publish that is mid-iteration simply skips the empty slot.
//!
//! The bus is an explicit, cheaply cloned handle rather than ambient global
//! state. Components receive it by reference; tests build a fresh one (or
//! call [`EventBus::clear`]) for isolation.
//!
//! REENTRANCY
//! ==========
//! Publish is synchronous and reentrant: a listener may publish or subscribe
//! while it runs. Listeners appended during a publish are not visited by
//! that publish. A publish of a channel that is already being delivered
//! further up the call stack fails fast with [`BusError::Cycle`], and the
//! nesting depth is capped by [`BusConfig::max_depth`].

#[cfg(test)]
#[path = "bus_test.rs"]
mod bus_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};

use crate::config::BusConfig;

// =============================================================================
// ERROR
// =============================================================================

/// Errors raised while delivering an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// A listener published an event that is still being delivered.
    #[error("publish cycle detected on '{event}' (in flight: {})", chain.join(" -> "))]
    Cycle { event: String, chain: Vec<String> },

    /// Nested publishes went deeper than the configured limit.
    #[error("publish depth limit of {limit} exceeded on '{event}'")]
    DepthExceeded { event: String, limit: usize },
}

// =============================================================================
// TYPES
// =============================================================================

/// Listener callback. Receives the published payload.
///
/// Returning an error aborts the publish that invoked it and propagates to
/// the outermost publisher.
pub type Listener = Rc<dyn Fn(&Value) -> Result<(), BusError>>;

struct Channel {
    /// Distinguishes this channel from an earlier one with the same name.
    generation: u64,
    slots: Vec<Option<Listener>>,
}

#[derive(Default)]
struct Registry {
    channels: HashMap<String, Channel>,
    next_generation: u64,
    /// Event names currently being delivered, outermost first.
    in_flight: Vec<String>,
    max_depth: usize,
}

/// Process-wide publish/subscribe registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<Registry>>,
}

/// Removal capability for exactly one registration.
///
/// Dropping the handle does not unsubscribe; only [`Subscription::remove`]
/// does, and calling it more than once is a no-op.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<RefCell<Registry>>,
    event: String,
    generation: u64,
    index: usize,
}

// =============================================================================
// EVENT BUS
// =============================================================================

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        let registry = Registry { max_depth: config.max_depth, ..Registry::default() };
        Self { inner: Rc::new(RefCell::new(registry)) }
    }

    /// Bus whose depth limit comes from `VBIND_MAX_PUBLISH_DEPTH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_config(BusConfig::from_env())
    }

    /// Register `listener` under `event`. Never fails.
    pub fn subscribe<F>(&self, event: &str, listener: F) -> Subscription
    where
        F: Fn(&Value) -> Result<(), BusError> + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let next_generation = registry.next_generation;
        let channel = registry.channels.entry(event.to_owned()).or_insert_with(|| Channel {
            generation: next_generation,
            slots: Vec::new(),
        });
        let generation = channel.generation;
        channel.slots.push(Some(Rc::new(listener)));
        let index = channel.slots.len() - 1;
        if generation == next_generation {
            registry.next_generation += 1;
        }
        tracing::trace!(event, index, "subscribed");

        Subscription { bus: Rc::downgrade(&self.inner), event: event.to_owned(), generation, index }
    }

    /// Deliver `payload` to every listener registered under `event`, in
    /// registration order. Publishing to an unknown event is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Cycle`] when `event` is already being delivered,
    /// [`BusError::DepthExceeded`] when nesting is too deep, or the first
    /// error returned by a listener.
    pub fn publish(&self, event: &str, payload: &Value) -> Result<(), BusError> {
        let Some((generation, len)) = self.enter(event)? else {
            return Ok(());
        };
        let result = self.deliver(event, generation, len, payload);
        self.inner.borrow_mut().in_flight.pop();
        result
    }

    /// Publish with an empty object payload.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::publish`].
    pub fn publish_empty(&self, event: &str) -> Result<(), BusError> {
        self.publish(event, &Value::Object(Map::new()))
    }

    /// Discard every registration.
    pub fn clear(&self) {
        self.inner.borrow_mut().channels.clear();
        tracing::debug!("event bus cleared");
    }

    /// Whether `event` currently has a channel in the registry.
    #[must_use]
    pub fn is_registered(&self, event: &str) -> bool {
        self.inner.borrow().channels.contains_key(event)
    }

    /// Number of live listeners registered under `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .channels
            .get(event)
            .map_or(0, |c| c.slots.iter().filter(|s| s.is_some()).count())
    }

    /// Check the guards and mark `event` in flight. `None` means nobody is
    /// listening and nothing was marked.
    fn enter(&self, event: &str) -> Result<Option<(u64, usize)>, BusError> {
        let mut registry = self.inner.borrow_mut();
        let Some(channel) = registry.channels.get(event) else {
            tracing::trace!(event, "publish without listeners");
            return Ok(None);
        };
        let target = (channel.generation, channel.slots.len());

        if registry.in_flight.iter().any(|e| e == event) {
            let chain = registry.in_flight.clone();
            tracing::warn!(event, chain = %chain.join(" -> "), "publish cycle detected");
            return Err(BusError::Cycle { event: event.to_owned(), chain });
        }
        if registry.in_flight.len() >= registry.max_depth {
            tracing::warn!(event, limit = registry.max_depth, "publish depth limit exceeded");
            return Err(BusError::DepthExceeded { event: event.to_owned(), limit: registry.max_depth });
        }

        registry.in_flight.push(event.to_owned());
        Ok(Some(target))
    }

    fn deliver(&self, event: &str, generation: u64, len: usize, payload: &Value) -> Result<(), BusError> {
        for index in 0..len {
            // Re-read the slot every time: earlier listeners may have removed
            // it, cleared the bus, or pruned the channel.
            let slot = {
                let registry = self.inner.borrow();
                match registry.channels.get(event) {
                    Some(channel) if channel.generation == generation => channel.slots.get(index).cloned().flatten(),
                    _ => break,
                }
            };
            if let Some(listener) = slot {
                listener(payload)?;
            }
        }
        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("channels", &registry.channels.len())
            .field("in_flight", &registry.in_flight)
            .finish()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

impl Subscription {
    /// Event name this handle was registered under.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Clear this registration's slot. Channels left with no live listeners
    /// are dropped from the registry.
    pub fn remove(&self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let mut registry = inner.borrow_mut();
        let Some(channel) = registry.channels.get_mut(&self.event) else {
            return;
        };
        if channel.generation != self.generation {
            return;
        }
        if let Some(slot) = channel.slots.get_mut(self.index) {
            *slot = None;
        }
        if channel.slots.iter().all(Option::is_none) {
            registry.channels.remove(&self.event);
        }
        tracing::trace!(event = %self.event, index = self.index, "unsubscribed");
    }
}
