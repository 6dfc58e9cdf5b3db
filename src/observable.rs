//! Reactive property layer — data whose writes publish change events.
//!
//! DESIGN
//! ======
//! `ObservableData` wraps a caller-supplied JSON object. Every key present
//! when the wrapper is built becomes an observable property: reads return the
//! last written value, and writes store the value and then synchronously
//! publish `<model>.<key>:change` with the new value as payload. There is no
//! dirty checking, so writing an equal value still publishes.
//!
//! Keys inserted later are stored as plain slots. They read and write like
//! any other key but never publish, because the observed key set is fixed at
//! install time.
//!
//! The wrapper is a shared handle. The caller and every binding read through
//! the same storage, so there is never a second copy of a value to go stale.

#[cfg(test)]
#[path = "observable_test.rs"]
mod observable_test;

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};

use crate::bus::{BusError, EventBus};

/// Channel name for changes to `property` of `model`.
#[must_use]
pub fn change_event(model: &str, property: &str) -> String {
    format!("{model}.{property}:change")
}

struct DataInner {
    bus: EventBus,
    model: String,
    values: RefCell<Map<String, Value>>,
    observed: HashSet<String>,
}

/// A data object whose install-time keys publish on write.
#[derive(Clone)]
pub struct ObservableData {
    inner: Rc<DataInner>,
}

/// Non-owning handle used by bus listeners so the registry never keeps the
/// data alive.
#[derive(Clone)]
pub(crate) struct WeakData {
    inner: Weak<DataInner>,
}

impl ObservableData {
    /// Overlay every key of `data` with a publishing accessor under `model`.
    #[must_use]
    pub fn new(bus: &EventBus, model: &str, data: Map<String, Value>) -> Self {
        let observed: HashSet<String> = data.keys().cloned().collect();
        tracing::debug!(model, properties = observed.len(), "observable data installed");
        Self {
            inner: Rc::new(DataInner {
                bus: bus.clone(),
                model: model.to_owned(),
                values: RefCell::new(data),
                observed,
            }),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Current value of `key`, if the key exists.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow().get(key).cloned()
    }

    /// Whether `key` exists on the data object (observed or plain).
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.values.borrow().contains_key(key)
    }

    /// Whether writes to `key` publish a change event.
    #[must_use]
    pub fn is_observed(&self, key: &str) -> bool {
        self.inner.observed.contains(key)
    }

    /// Store `value` under `key`. Observed keys then publish their change
    /// event; unknown keys become plain slots.
    ///
    /// # Errors
    ///
    /// Propagates any [`BusError`] raised while delivering the change event.
    /// The value is stored even when delivery fails.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), BusError> {
        let value = value.into();
        let payload = self.is_observed(key).then(|| value.clone());
        self.inner.values.borrow_mut().insert(key.to_owned(), value);

        match payload {
            Some(payload) => {
                let event = change_event(&self.inner.model, key);
                tracing::trace!(%event, "property written");
                self.inner.bus.publish(&event, &payload)
            }
            None => {
                tracing::trace!(model = %self.inner.model, key, "plain slot written");
                Ok(())
            }
        }
    }

    /// Accessor pair for one observed key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<Property> {
        self.is_observed(key).then(|| Property { data: self.clone(), name: key.to_owned() })
    }

    /// Observed key names, sorted.
    #[must_use]
    pub fn observed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.observed.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of every key and value as they stand now.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.values.borrow().clone()
    }

    pub(crate) fn downgrade(&self) -> WeakData {
        WeakData { inner: Rc::downgrade(&self.inner) }
    }
}

impl std::fmt::Debug for ObservableData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableData")
            .field("model", &self.inner.model)
            .field("values", &self.inner.values.borrow())
            .finish_non_exhaustive()
    }
}

impl WeakData {
    pub(crate) fn upgrade(&self) -> Option<ObservableData> {
        self.inner.upgrade().map(|inner| ObservableData { inner })
    }
}

// =============================================================================
// PROPERTY
// =============================================================================

/// One observed key of an [`ObservableData`], exposed as a get/set pair.
#[derive(Clone, Debug)]
pub struct Property {
    data: ObservableData,
    name: String,
}

impl Property {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The channel this property publishes on.
    #[must_use]
    pub fn event(&self) -> String {
        change_event(self.data.model(), &self.name)
    }

    /// Last written value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.data.get(&self.name).unwrap_or(Value::Null)
    }

    /// Store and publish.
    ///
    /// # Errors
    ///
    /// Same as [`ObservableData::set`].
    pub fn set(&self, value: impl Into<Value>) -> Result<(), BusError> {
        self.data.set(&self.name, value)
    }
}
