//! Reactive view binding for HTML fragments.
//!
//! A [`VBind`] fetches a fragment through a [`TemplateSource`], injects it
//! into a container element, and wires every `${name}` placeholder in the
//! container's direct children to an observable data object. Writes to the
//! data re-render the page; edits to bound form controls write back into the
//! data. Both directions travel through one [`EventBus`] on channels named
//! `<model>.<property>:change`.
//!
//! Everything is single-threaded and synchronous except template retrieval.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`bus`] | Publish/subscribe registry with cycle and depth guards |
//! | [`expr`] | `${name}` placeholder extraction and substitution |
//! | [`observable`] | Data object whose writes publish change events |
//! | [`dom`] | In-memory elements, markup parsing, native events, selectors |
//! | [`scan`] | Attribute and text snapshots of one element |
//! | [`binder`] | Text, attribute, and write-back bindings for one element |
//! | [`source`] | Template retrieval over HTTP or from memory |
//! | [`view`] | Container controller and its lifecycle |
//! | [`config`] | Environment-driven settings |
//! | [`error`] | Error taxonomy and error codes |

pub mod binder;
pub mod bus;
pub mod config;
pub mod dom;
pub mod error;
pub mod expr;
pub mod observable;
pub mod scan;
pub mod source;
pub mod view;

pub use bus::{BusError, EventBus, Subscription};
pub use dom::{Document, Element, EventKind};
pub use error::{ConfigError, ErrorCode, VBindError};
pub use observable::{ObservableData, Property};
pub use source::{FetchError, HttpSource, MemorySource, TemplateSource};
pub use view::{VBind, ViewConfig, ViewState};
