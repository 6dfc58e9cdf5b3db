//! Element binder — connects one container child to observable data.
//!
//! DESIGN
//! ======
//! Rendering and write-back share a single path through the bus:
//!
//! ```text
//! user input ──► native listener ──► ObservableData::set
//!                                          │
//!                                 publish <model>.<key>:change
//!                                          │
//!                      ┌───────────────────┼───────────────────┐
//!                      ▼                   ▼                   ▼
//!                 text render       attribute render      other listeners
//! ```
//!
//! - Text bindings keep the raw template and re-render the whole text
//!   from live data on every change, so several placeholders can share one
//!   text node.
//! - Attribute bindings substitute once at bind time. Afterwards a change
//!   overwrites the whole attribute with the raw new value; other
//!   placeholders in that attribute are not re-substituted.
//! - Form controls get a native listener chosen from [`WRITE_BACK`] by
//!   [`ControlKind`].
//!
//! Placeholders naming keys the data object does not have are skipped:
//! nothing is rendered, subscribed, or attached for them.
//!
//! Bus listeners hold weak handles to the element and data, so the registry
//! never keeps a discarded view alive.

#[cfg(test)]
#[path = "binder_test.rs"]
mod binder_test;

use serde_json::{Number, Value};

use crate::bus::{BusError, EventBus};
use crate::dom::{Element, EventKind};
use crate::expr;
use crate::observable::{ObservableData, change_event};
use crate::scan::{self, Attribute};

// =============================================================================
// TYPES
// =============================================================================

/// Where inside the element a binding renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSlot {
    Text,
    Attribute(String),
}

/// One bound text node or attribute, fixed at bind time.
#[derive(Debug, Clone)]
pub struct BindingTarget {
    pub node: Element,
    pub slot: TargetSlot,
    /// Raw template as scanned, placeholders intact.
    pub template: String,
    /// Placeholder names in occurrence order, duplicates kept.
    pub variables: Vec<String>,
}

/// Form-control families that write user edits back into data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// `input[type=checkbox]` and `input[type=radio]`.
    Toggle = 0,
    /// `input[type=number]`.
    Number = 1,
    /// Any other `input`.
    Text = 2,
    /// `select`.
    Select = 3,
}

#[derive(Clone, Copy)]
struct WriteBack {
    event: EventKind,
    coerce: fn(Value) -> Value,
}

/// Write-back handlers, indexed by `ControlKind as usize`.
const WRITE_BACK: [WriteBack; 4] = [
    WriteBack { event: EventKind::Change, coerce: keep_raw },
    WriteBack { event: EventKind::Input, coerce: to_number },
    WriteBack { event: EventKind::Input, coerce: keep_raw },
    WriteBack { event: EventKind::Change, coerce: keep_raw },
];

impl ControlKind {
    /// Control family of `element`, or `None` for non-form elements.
    #[must_use]
    pub fn classify(element: &Element) -> Option<Self> {
        match element.tag_name() {
            "input" => Some(match element.input_type().as_str() {
                "checkbox" | "radio" => Self::Toggle,
                "number" => Self::Number,
                _ => Self::Text,
            }),
            "select" => Some(Self::Select),
            _ => None,
        }
    }

    /// Native event this control writes back on.
    #[must_use]
    pub fn event(self) -> EventKind {
        self.write_back().event
    }

    fn write_back(self) -> WriteBack {
        WRITE_BACK[self as usize]
    }
}

fn keep_raw(value: Value) -> Value {
    value
}

/// Number inputs write floats. Text that does not start with a number
/// becomes `null`.
fn to_number(value: Value) -> Value {
    let parsed = match &value {
        Value::Number(_) => return value,
        Value::String(s) => expr::parse_leading_float(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.and_then(Number::from_f64).map_or(Value::Null, Value::Number)
}

// =============================================================================
// BINDER
// =============================================================================

pub struct Binder {
    bus: EventBus,
    data: ObservableData,
}

impl Binder {
    #[must_use]
    pub fn new(bus: &EventBus, data: &ObservableData) -> Self {
        Self { bus: bus.clone(), data: data.clone() }
    }

    /// Bind `element`'s text and attributes.
    ///
    /// # Errors
    ///
    /// Propagates a [`BusError`] raised by an initial render publish.
    pub fn bind(&self, element: &Element) -> Result<Vec<BindingTarget>, BusError> {
        let mut targets = Vec::new();
        if let Some(target) = self.bind_text(element)? {
            targets.push(target);
        }
        for attribute in scan::list_attributes(element) {
            if let Some(target) = self.bind_attribute(element, &attribute)? {
                targets.push(target);
            }
        }
        tracing::debug!(tag = element.tag_name(), targets = targets.len(), "element bound");
        Ok(targets)
    }

    fn bind_text(&self, element: &Element) -> Result<Option<BindingTarget>, BusError> {
        let Some(template) = scan::text_of(element) else {
            return Ok(None);
        };
        let Some(variables) = expr::extract_variables(Some(&template)) else {
            return Ok(None);
        };

        let mut bound = false;
        for variable in &variables {
            if !self.data.contains(variable) {
                tracing::trace!(%variable, "text placeholder has no data key; skipped");
                continue;
            }
            let event = change_event(self.data.model(), variable);

            let node = element.downgrade();
            let data = self.data.downgrade();
            let template = template.clone();
            let all = variables.clone();
            let changed = variable.clone();
            self.bus.subscribe(&event, move |value: &Value| {
                let (Some(node), Some(data)) = (node.upgrade(), data.upgrade()) else {
                    return Ok(());
                };
                node.set_text_content(&render_text(&template, &all, &changed, value, &data));
                Ok(())
            });

            // Render now by replaying the current value on the channel.
            let current = self.data.get(variable).unwrap_or(Value::Null);
            self.bus.publish(&event, &current)?;
            bound = true;
        }

        Ok(bound.then(|| BindingTarget { node: element.clone(), slot: TargetSlot::Text, template, variables }))
    }

    fn bind_attribute(&self, element: &Element, attribute: &Attribute) -> Result<Option<BindingTarget>, BusError> {
        let Some(variables) = expr::extract_variables(Some(&attribute.value)) else {
            return Ok(None);
        };
        let control = ControlKind::classify(element);

        let mut rendered = attribute.value.clone();
        let mut bound = false;
        for variable in &variables {
            if !self.data.contains(variable) {
                tracing::trace!(%variable, attribute = %attribute.name, "attribute placeholder has no data key; skipped");
                continue;
            }
            if let Some(kind) = control {
                self.attach_write_back(element, kind, &attribute.name, variable);
            }

            let current = self.data.get(variable).unwrap_or(Value::Null);
            rendered = expr::substitute_first(&rendered, variable, &expr::display_value(&current));
            element.set_property(&attribute.name, &Value::String(rendered.clone()));

            let node = element.downgrade();
            let name = attribute.name.clone();
            self.bus.subscribe(&change_event(self.data.model(), variable), move |value: &Value| {
                if let Some(node) = node.upgrade() {
                    node.set_property(&name, value);
                }
                Ok(())
            });
            bound = true;
        }

        Ok(bound.then(|| BindingTarget {
            node: element.clone(),
            slot: TargetSlot::Attribute(attribute.name.clone()),
            template: attribute.value.clone(),
            variables,
        }))
    }

    fn attach_write_back(&self, element: &Element, kind: ControlKind, attribute: &str, property: &str) {
        let write_back = kind.write_back();
        let data = self.data.clone();
        let attribute = attribute.to_owned();
        let property = property.to_owned();
        tracing::trace!(?kind, event = write_back.event.as_str(), %property, "write-back attached");

        element.add_event_listener(write_back.event, move |target: &Element| {
            let value = (write_back.coerce)(target.property(&attribute));
            data.set(&property, value)
        });
    }
}

/// Text for `template` after `changed` took `value`.
///
/// The first occurrence of `changed` is dropped from `variables`; every
/// remaining name is filled, first occurrence first, from live data, and
/// then the first remaining `${changed}` gets `value`. With a repeated name
/// this fills each occurrence once per listed entry. Names with no data key
/// keep their placeholder.
#[must_use]
pub fn render_text(template: &str, variables: &[String], changed: &str, value: &Value, data: &ObservableData) -> String {
    let mut others = variables.to_vec();
    if let Some(idx) = others.iter().position(|v| v == changed) {
        others.remove(idx);
    }

    let mut text = template.to_owned();
    for other in &others {
        if let Some(current) = data.get(other) {
            text = expr::substitute_first(&text, other, &expr::display_value(&current));
        }
    }
    expr::substitute_first(&text, changed, &expr::display_value(value))
}
