//! Host document model — the elements the engine renders into.
//!
//! DESIGN
//! ======
//! A small DOM stand-in: shared element handles with ordered attributes,
//! child nodes, and native `input`/`change` listeners. It mirrors only the
//! parts of the browser DOM the binder touches:
//!
//! - `textContent` reads all descendant text and writes replace the
//!   children with a single text node.
//! - `element[name]` property access, where `checked`, `selected` and
//!   `disabled` are booleans backed by attribute presence and everything
//!   else is the attribute's string value.
//! - `innerHTML` assignment, parsed with `tl`.
//! - `querySelector` for `#id`, `.class` and tag selectors.

#[cfg(test)]
#[path = "dom_test.rs"]
mod dom_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::bus::BusError;

const BOOLEAN_PROPERTIES: [&str; 3] = ["checked", "selected", "disabled"];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: [&str; 13] =
    ["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The markup could not be parsed into elements.
    #[error("failed to parse markup: {0}")]
    Parse(String),
}

// =============================================================================
// TYPES
// =============================================================================

/// Native DOM events the binder listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Input,
    Change,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
        }
    }
}

/// Native event handler. Receives the element the event fired on.
pub type EventHandler = Rc<dyn Fn(&Element) -> Result<(), BusError>>;

/// A child of an element.
#[derive(Clone, Debug)]
pub enum Node {
    Element(Element),
    Text(String),
}

struct ElementInner {
    tag: String,
    attributes: RefCell<Vec<(String, String)>>,
    children: RefCell<Vec<Node>>,
    listeners: RefCell<Vec<(EventKind, EventHandler)>>,
}

/// Shared handle to one element. Clones point at the same element.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

/// Non-owning element handle for callbacks stored outside the tree.
#[derive(Clone)]
pub struct WeakElement {
    inner: Weak<ElementInner>,
}

// =============================================================================
// ELEMENT
// =============================================================================

impl Element {
    /// Create a detached element. The tag is lower-cased.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                tag: tag.to_ascii_lowercase(),
                attributes: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.set_text_content(text);
        self
    }

    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.inner.tag
    }

    /// Lower-cased `type` attribute, defaulting to `text` like the DOM does.
    #[must_use]
    pub fn input_type(&self) -> String {
        self.attribute("type").map_or_else(|| "text".to_owned(), |t| t.to_ascii_lowercase())
    }

    /// Whether both handles refer to the same element.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakElement {
        WeakElement { inner: Rc::downgrade(&self.inner) }
    }

    // -------------------------------------------------------------------------
    // attributes
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.inner
            .attributes
            .borrow()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let mut attributes = self.inner.attributes.borrow_mut();
        match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => attributes.push((name, value.to_owned())),
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.inner.attributes.borrow_mut().retain(|(n, _)| *n != name);
    }

    /// Attributes in document order, as `(name, value)` pairs.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.inner.attributes.borrow().clone()
    }

    // -------------------------------------------------------------------------
    // properties
    // -------------------------------------------------------------------------

    /// Read `element[name]`.
    #[must_use]
    pub fn property(&self, name: &str) -> Value {
        if is_boolean_property(name) {
            Value::Bool(self.has_attribute(name))
        } else {
            Value::String(self.attribute(name).unwrap_or_default())
        }
    }

    /// Write `element[name]`. Boolean properties toggle attribute presence by
    /// the value's truthiness; everything else is stored as display text.
    pub fn set_property(&self, name: &str, value: &Value) {
        if is_boolean_property(name) {
            if truthy(value) {
                self.set_attribute(name, "");
            } else {
                self.remove_attribute(name);
            }
        } else {
            self.set_attribute(name, &crate::expr::display_value(value));
        }
    }

    // -------------------------------------------------------------------------
    // content
    // -------------------------------------------------------------------------

    /// Child nodes, text included.
    #[must_use]
    pub fn child_nodes(&self) -> Vec<Node> {
        self.inner.children.borrow().clone()
    }

    /// Direct element children in document order.
    #[must_use]
    pub fn children(&self) -> Vec<Element> {
        self.inner
            .children
            .borrow()
            .iter()
            .filter_map(|node| match node {
                Node::Element(el) => Some(el.clone()),
                Node::Text(_) => None,
            })
            .collect()
    }

    pub fn append_child(&self, node: Node) {
        self.inner.children.borrow_mut().push(node);
    }

    /// Concatenated text of every descendant text node.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replace every child with a single text node.
    pub fn set_text_content(&self, text: &str) {
        let mut children = self.inner.children.borrow_mut();
        children.clear();
        if !text.is_empty() {
            children.push(Node::Text(text.to_owned()));
        }
    }

    /// Replace the children with the parsed `markup`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Parse`] when `markup` cannot be parsed.
    pub fn set_inner_html(&self, markup: &str) -> Result<(), DomError> {
        let nodes = parse_fragment(markup)?;
        *self.inner.children.borrow_mut() = nodes;
        Ok(())
    }

    /// Serialized children.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for node in self.inner.children.borrow().iter() {
            write_node(node, &mut out);
        }
        out
    }

    /// Serialized element including its own tag.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_node(&Node::Element(self.clone()), &mut out);
        out
    }

    /// First descendant matching a `#id`, `.class` or tag selector, in
    /// depth-first document order.
    #[must_use]
    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        let selector = Selector::parse(selector)?;
        find_descendant(self, &selector)
    }

    // -------------------------------------------------------------------------
    // events
    // -------------------------------------------------------------------------

    pub fn add_event_listener<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Element) -> Result<(), BusError> + 'static,
    {
        self.inner.listeners.borrow_mut().push((kind, Rc::new(handler)));
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.listeners.borrow().iter().filter(|(k, _)| *k == kind).count()
    }

    /// Fire `kind` on this element, running its handlers in registration
    /// order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first handler error.
    pub fn dispatch_event(&self, kind: EventKind) -> Result<(), BusError> {
        let handlers: Vec<EventHandler> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| Rc::clone(h))
            .collect();
        tracing::trace!(tag = %self.inner.tag, event = kind.as_str(), handlers = handlers.len(), "dispatch");
        for handler in handlers {
            handler(self)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.inner.tag)
            .field("attributes", &self.inner.attributes.borrow())
            .finish_non_exhaustive()
    }
}

impl WeakElement {
    #[must_use]
    pub fn upgrade(&self) -> Option<Element> {
        self.inner.upgrade().map(|inner| Element { inner })
    }
}

fn is_boolean_property(name: &str) -> bool {
    BOOLEAN_PROPERTIES.iter().any(|p| p.eq_ignore_ascii_case(name))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in element.inner.children.borrow().iter() {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// The page hosting containers. Resolves selector strings to elements.
#[derive(Clone, Debug)]
pub struct Document {
    root: Element,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self { root: Element::new("html") }
    }

    /// Build a document whose root holds the parsed `markup`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Parse`] when `markup` cannot be parsed.
    pub fn parse(markup: &str) -> Result<Self, DomError> {
        let document = Self::new();
        document.root.set_inner_html(markup)?;
        Ok(document)
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    #[must_use]
    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        self.root.query_selector(selector)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

enum Selector {
    Id(String),
    Class(String),
    Tag(String),
}

impl Selector {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('#') {
            return (!id.is_empty()).then(|| Self::Id(id.to_owned()));
        }
        if let Some(class) = raw.strip_prefix('.') {
            return (!class.is_empty()).then(|| Self::Class(class.to_owned()));
        }
        (!raw.is_empty()).then(|| Self::Tag(raw.to_ascii_lowercase()))
    }

    fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Id(id) => element.attribute("id").is_some_and(|v| v == *id),
            Self::Class(class) => element
                .attribute("class")
                .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class.as_str())),
            Self::Tag(tag) => element.tag_name() == tag.as_str(),
        }
    }
}

fn find_descendant(element: &Element, selector: &Selector) -> Option<Element> {
    element.children().into_iter().find_map(|child| {
        if selector.matches(&child) {
            Some(child)
        } else {
            find_descendant(&child, selector)
        }
    })
}

// =============================================================================
// PARSE / SERIALIZE
// =============================================================================

fn parse_fragment(markup: &str) -> Result<Vec<Node>, DomError> {
    let dom = tl::parse(markup, tl::ParserOptions::default()).map_err(|e| DomError::Parse(format!("{e:?}")))?;
    let parser = dom.parser();
    Ok(dom
        .children()
        .iter()
        .filter_map(|handle| convert_node(*handle, parser))
        .collect())
}

fn convert_node(handle: tl::NodeHandle, parser: &tl::Parser) -> Option<Node> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => {
            let element = Element::new(&tag.name().as_utf8_str());
            // tl hashes attributes; restore the order they were written in.
            let order = source_attribute_order(&tag.raw().as_utf8_str());
            let mut attributes: Vec<(String, String)> = tag
                .attributes()
                .iter()
                .map(|(key, value)| (key.to_ascii_lowercase(), value.map(|v| decode_entities(&v)).unwrap_or_default()))
                .collect();
            attributes.sort_by_key(|(name, _)| order.iter().position(|n| n == name).unwrap_or(usize::MAX));
            for (name, value) in &attributes {
                element.set_attribute(name, value);
            }
            for child in tag.children().top().iter() {
                if let Some(node) = convert_node(*child, parser) {
                    element.append_child(node);
                }
            }
            Some(Node::Element(element))
        }
        tl::Node::Raw(bytes) => Some(Node::Text(decode_entities(&bytes.as_utf8_str()))),
        tl::Node::Comment(_) => None,
    }
}

/// Attribute names in the order they appear in the opening tag of `raw`.
fn source_attribute_order(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = raw
        .trim_start_matches('<')
        .trim_start_matches(|c: char| !(c.is_ascii_whitespace() || c == '>' || c == '/'));

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() || rest.starts_with('>') {
            break;
        }
        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || matches!(c, '=' | '>' | '/'))
            .unwrap_or(rest.len());
        if end > 0 {
            names.push(rest[..end].to_ascii_lowercase());
        }
        rest = rest[end..].trim_start();

        let Some(value) = rest.strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        rest = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => value[1..].find(quote).map_or("", |close| &value[close + 2..]),
            _ => {
                let end = value.find(|c: char| c.is_ascii_whitespace() || c == '>').unwrap_or(value.len());
                &value[end..]
            }
        };
    }
    names
}

/// Decode named and numeric character references. Unknown or malformed
/// references are kept as written.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .get(1..)
            .and_then(|body| body.find(';').filter(|&semi| semi > 0 && semi <= 10).map(|semi| &body[..semi]))
            .and_then(|entity| decode_entity(entity).map(|c| (c, entity.len() + 2)));
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = entity.strip_prefix('#')?;
            let parsed = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => code.parse::<u32>(),
            };
            match parsed {
                Ok(n) => char::from_u32(n),
                Err(_) => None,
            }
        }
    }
}

fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(element.tag_name());
            for (name, value) in element.inner.attributes.borrow().iter() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_text(value).replace('"', "&quot;"));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&element.tag_name()) {
                return;
            }
            for child in element.inner.children.borrow().iter() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(element.tag_name());
            out.push('>');
        }
    }
}
