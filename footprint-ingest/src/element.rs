//! Rendered element model.
//!
//! A [`RenderedElement`] is a serializable stand-in for a page node: a tag,
//! its classes and attributes, its own text, and its children. Adapters
//! only ever read these, so matching helpers cover what they need
//! (class and attribute tests, descendant search, text content) and
//! nothing more.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedElement {
    /// Lowercase tag name.
    pub tag: String,
    /// CSS classes.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Attributes by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Text that precedes the children.
    #[serde(default)]
    pub text: String,
    /// Child elements in document order.
    #[serde(default)]
    pub children: Vec<RenderedElement>,
}

impl RenderedElement {
    /// Creates an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Adds a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the element's own text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn with_child(mut self, child: RenderedElement) -> Self {
        self.children.push(child);
        self
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Returns true if the element carries `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Returns an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns true if the attribute is present.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Returns true if the attribute equals `value`.
    pub fn attr_is(&self, name: &str, value: &str) -> bool {
        self.attr(name) == Some(value)
    }

    /// Returns this element and all descendants in document order.
    pub fn descendants(&self) -> Vec<&RenderedElement> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }

    /// Returns the first strict descendant matching `pred`.
    pub fn find_descendant(
        &self,
        pred: impl Fn(&RenderedElement) -> bool,
    ) -> Option<&RenderedElement> {
        self.descendants().into_iter().skip(1).find(|&el| pred(el))
    }

    /// Returns every element in this subtree matching `pred`, self included.
    pub fn select(&self, pred: impl Fn(&RenderedElement) -> bool) -> Vec<&RenderedElement> {
        self.descendants().into_iter().filter(|&el| pred(el)).collect()
    }

    // ========================================================================
    // Text
    // ========================================================================

    /// Concatenated text of this subtree, like a DOM node's text content.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.push_text(out);
        }
    }

    /// Returns a copy with every strict descendant matching `pred` removed.
    #[must_use]
    pub fn without(&self, pred: &impl Fn(&RenderedElement) -> bool) -> RenderedElement {
        RenderedElement {
            tag: self.tag.clone(),
            classes: self.classes.clone(),
            attributes: self.attributes.clone(),
            text: self.text.clone(),
            children: self
                .children
                .iter()
                .filter(|&child| !pred(child))
                .map(|child| child.without(pred))
                .collect(),
        }
    }
}
