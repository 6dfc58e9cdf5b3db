//! Container controller — fetch a fragment, inject it, bind its children.
//!
//! DESIGN
//! ======
//! ```text
//!   new ──► Uninitialized ──load──► Fetching ──ok──► Populated ──► Bound
//!                │                     │
//!                └──populate───────────┼──────────► Populated ──► Bound
//!                                      └──err──► Errored
//! ```
//!
//! Construction validates the arguments and installs the observable overlay
//! on the data. Nothing is fetched until [`VBind::load`]. The template is
//! retrieved at most once per instance; `Errored` and `Bound` are terminal.
//!
//! Only the container's direct element children are bound, in document
//! order. Each child's text and attributes are handed to the [`Binder`].

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use serde_json::{Map, Value};

use crate::binder::{Binder, BindingTarget};
use crate::bus::EventBus;
use crate::dom::{Document, Element};
use crate::error::{ConfigError, VBindError};
use crate::observable::ObservableData;
use crate::source::TemplateSource;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Uninitialized,
    Fetching,
    Populated,
    Bound,
    Errored,
}

impl ViewState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Fetching => "Fetching",
            Self::Populated => "Populated",
            Self::Bound => "Bound",
            Self::Errored => "Errored",
        }
    }
}

/// Where the fragment is injected.
#[derive(Debug, Clone)]
pub enum ContainerRef {
    Element(Element),
    /// Resolved with [`Document::query_selector`] at construction.
    Selector { document: Document, selector: String },
}

/// Construction arguments. `container`, `data`, and `path` are required.
#[derive(Debug, Clone, Default)]
pub struct ViewConfig {
    pub container: Option<ContainerRef>,
    pub data: Option<Value>,
    pub path: Option<String>,
    pub model: Option<String>,
}

impl ViewConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_container(mut self, element: &Element) -> Self {
        self.container = Some(ContainerRef::Element(element.clone()));
        self
    }

    #[must_use]
    pub fn with_selector(mut self, document: &Document, selector: &str) -> Self {
        self.container = Some(ContainerRef::Selector { document: document.clone(), selector: selector.to_owned() });
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_owned());
        self
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct VBind {
    bus: EventBus,
    container: Element,
    data: ObservableData,
    path: String,
    state: ViewState,
    children: Vec<Element>,
    targets: Vec<BindingTarget>,
}

impl VBind {
    /// Validate `config` and make its data observable on `bus`.
    ///
    /// Checks run in order: container, data, path. A missing model means the
    /// empty model name.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn new(bus: &EventBus, config: ViewConfig) -> Result<Self, ConfigError> {
        let container = resolve_container(config.container)?;
        let values = object_data(config.data)?;
        let path = config.path.ok_or(ConfigError::MissingPath)?;
        let model = config.model.unwrap_or_default();

        let data = ObservableData::new(bus, &model, values);
        tracing::debug!(%model, %path, keys = data.observed_keys().len(), "view constructed");

        Ok(Self {
            bus: bus.clone(),
            container,
            data,
            path,
            state: ViewState::Uninitialized,
            children: Vec::new(),
            targets: Vec::new(),
        })
    }

    /// Construct and load in one step.
    ///
    /// # Errors
    ///
    /// Configuration errors, then anything [`VBind::load`] reports.
    pub async fn mount(bus: &EventBus, config: ViewConfig, source: &dyn TemplateSource) -> Result<Self, VBindError> {
        let mut view = Self::new(bus, config)?;
        view.load(source).await?;
        Ok(view)
    }

    /// Retrieve the template from `source`, then populate and bind.
    ///
    /// # Errors
    ///
    /// - [`VBindError::InvalidState`] unless the view is `Uninitialized`
    /// - [`VBindError::Fetch`] with the source's detail; the view is `Errored`
    /// - anything [`VBind::populate`] reports
    pub async fn load(&mut self, source: &dyn TemplateSource) -> Result<(), VBindError> {
        self.expect_state("load", &[ViewState::Uninitialized])?;
        self.state = ViewState::Fetching;

        match source.retrieve(&self.path).await {
            Ok(markup) => self.populate(&markup),
            Err(e) => {
                tracing::warn!(path = %self.path, error = %e, status = ?e.status, "template fetch failed");
                self.state = ViewState::Errored;
                Err(e.into())
            }
        }
    }

    /// Inject `markup` into the container and bind its children.
    ///
    /// # Errors
    ///
    /// - [`VBindError::InvalidState`] once the view is populated or failed
    /// - [`VBindError::Markup`] if the markup cannot be parsed
    /// - [`VBindError::Bus`] if an initial render publish fails
    ///
    /// Parse and bind failures leave the view `Errored`.
    pub fn populate(&mut self, markup: &str) -> Result<(), VBindError> {
        self.expect_state("populate", &[ViewState::Uninitialized, ViewState::Fetching])?;

        let result = self.populate_and_bind(markup);
        if result.is_err() {
            self.state = ViewState::Errored;
        }
        result
    }

    fn populate_and_bind(&mut self, markup: &str) -> Result<(), VBindError> {
        self.container.set_inner_html(markup)?;
        self.children = self.container.children();
        self.state = ViewState::Populated;

        let binder = Binder::new(&self.bus, &self.data);
        for child in &self.children {
            self.targets.extend(binder.bind(child)?);
        }
        self.state = ViewState::Bound;

        tracing::info!(
            model = self.data.model(),
            path = %self.path,
            children = self.children.len(),
            targets = self.targets.len(),
            "view bound"
        );
        Ok(())
    }

    fn expect_state(&self, operation: &'static str, allowed: &[ViewState]) -> Result<(), VBindError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(VBindError::InvalidState { operation, state: self.state.as_str() })
        }
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Direct element children captured at populate time.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    #[must_use]
    pub fn targets(&self) -> &[BindingTarget] {
        &self.targets
    }

    /// The observable data. Clones share the same values.
    #[must_use]
    pub fn data(&self) -> &ObservableData {
        &self.data
    }

    #[must_use]
    pub fn container(&self) -> &Element {
        &self.container
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.data.model()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

fn resolve_container(container: Option<ContainerRef>) -> Result<Element, ConfigError> {
    match container {
        None => Err(ConfigError::MissingContainer),
        Some(ContainerRef::Element(element)) => Ok(element),
        Some(ContainerRef::Selector { document, selector }) => document
            .query_selector(&selector)
            .ok_or(ConfigError::ContainerNotFound { selector }),
    }
}

fn object_data(data: Option<Value>) -> Result<Map<String, Value>, ConfigError> {
    match data {
        None | Some(Value::Null) => Err(ConfigError::MissingData),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::Bool(_)) => Err(ConfigError::DataNotObject { kind: "boolean" }),
        Some(Value::Number(_)) => Err(ConfigError::DataNotObject { kind: "number" }),
        Some(Value::String(_)) => Err(ConfigError::DataNotObject { kind: "string" }),
        Some(Value::Array(_)) => Err(ConfigError::DataNotObject { kind: "array" }),
    }
}
