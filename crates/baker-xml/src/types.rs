/*
 * types.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The position-annotated document tree.

use crate::Position;
use std::fmt;

/// A tag or attribute name, either plain (`local`) or namespaced in Clark
/// notation (`{uri}local`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName(String);

impl QName {
    /// Wrap a name given in plain or Clark notation.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Build `{uri}local`.
    pub fn with_namespace(uri: &str, local: &str) -> Self {
        Self(format!("{{{}}}{}", uri, local))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is written in `{uri}local` form.
    pub fn is_qualified(&self) -> bool {
        self.0.starts_with('{')
    }

    /// Split `{uri}local` into `(uri, local)`.
    ///
    /// Returns `None` for plain names and for names that open a `{` without
    /// closing it.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.strip_prefix('{')?.rsplit_once('}')
    }

    pub fn namespace(&self) -> Option<&str> {
        self.split().map(|(uri, _)| uri)
    }

    pub fn local_name(&self) -> &str {
        self.split().map_or(self.0.as_str(), |(_, local)| local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QName {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for QName {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Literal text, escaped on output.
    Text(String),
    /// A qualified name, written as its resolved `prefix:local` form.
    QName(QName),
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        AttrValue::Text(text.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        AttrValue::Text(text)
    }
}

impl From<QName> for AttrValue {
    fn from(qname: QName) -> Self {
        AttrValue::QName(qname)
    }
}

/// What a [`Node`] represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A regular element with its tag name.
    Element(QName),
    /// A tagless pseudo-root: only its text and children are written.
    Fragment,
    /// `<!--text-->`
    Comment,
    /// `<?text?>`
    ProcessingInstruction,
}

/// One node of the document tree.
///
/// `text` is the character data before the first child and `tail` the
/// character data between this node's end and its next sibling. For
/// comments and processing instructions `text` holds their content.
///
/// `start` is where the node begins in the source (the `<` of the start
/// tag); `end` is where its closing tag begins, or equals `start` for
/// self-closing elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub attributes: Vec<(QName, AttrValue)>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<Node>,
    pub start: Position,
    pub end: Position,
}

impl Node {
    fn with_kind(kind: NodeKind, start: Position, end: Position) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
            text: None,
            tail: None,
            children: Vec::new(),
            start,
            end,
        }
    }

    pub fn element(tag: impl Into<QName>, start: Position, end: Position) -> Self {
        Self::with_kind(NodeKind::Element(tag.into()), start, end)
    }

    pub fn fragment(start: Position, end: Position) -> Self {
        Self::with_kind(NodeKind::Fragment, start, end)
    }

    pub fn comment(text: impl Into<String>, start: Position) -> Self {
        Self::with_kind(NodeKind::Comment, start, start).with_text(text)
    }

    pub fn processing_instruction(text: impl Into<String>, start: Position) -> Self {
        Self::with_kind(NodeKind::ProcessingInstruction, start, start).with_text(text)
    }

    pub fn with_attribute(mut self, name: impl Into<QName>, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// The tag name, for element nodes.
    pub fn tag(&self) -> Option<&QName> {
        match &self.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Look up an attribute by its (plain or Clark) name.
    pub fn get_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value)
    }

    /// Depth-first iterator over this node and all its descendants in
    /// document order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

/// Iterator returned by [`Node::iter`].
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
