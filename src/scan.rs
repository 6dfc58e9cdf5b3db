//! Attribute and text scanning for binding candidates.
//!
//! Only the element itself is scanned. Binding works per direct child of a
//! container, so nested descendants are never visited individually.

#[cfg(test)]
#[path = "scan_test.rs"]
mod scan_test;

use crate::dom::Element;

/// One attribute as it stood when the element was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Snapshot of `element`'s attributes in document order. Later changes to
/// the element do not affect the returned list.
#[must_use]
pub fn list_attributes(element: &Element) -> Vec<Attribute> {
    element
        .attributes()
        .into_iter()
        .map(|(name, value)| Attribute { name, value })
        .collect()
}

/// The element's text content, or `None` when it is empty.
#[must_use]
pub fn text_of(element: &Element) -> Option<String> {
    let text = element.text_content();
    (!text.is_empty()).then_some(text)
}
