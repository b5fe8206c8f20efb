/*
 * namespace.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Assigning prefixes to the namespaces used by a tree.
//!
//! One pass over the tree in document order records, for every qualified
//! name in use, the `prefix:local` string it is written as, and for every
//! namespace URI the prefix it is declared with. Synthesized prefixes
//! (`ns0`, `ns1`, ...) follow first-encounter order, so reordering the tree
//! can renumber them.

use crate::{AttrValue, Error, Node, NodeKind, QName, Result};
use std::collections::HashMap;

/// The XML namespace, bound to `xml` implicitly and never declared.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Conventional prefixes for well-known namespaces.
const WELL_KNOWN_PREFIXES: &[(&str, &str)] = &[
    (XML_NAMESPACE, "xml"),
    ("http://www.w3.org/1999/xhtml", "html"),
    ("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf"),
    ("http://schemas.xmlsoap.org/wsdl/", "wsdl"),
    ("http://www.w3.org/2001/XMLSchema", "xs"),
    ("http://www.w3.org/2001/XMLSchema-instance", "xsi"),
    ("http://purl.org/dc/elements/1.1/", "dc"),
];

/// The conventional prefix of a well-known namespace URI.
pub fn well_known_prefix(uri: &str) -> Option<&'static str> {
    WELL_KNOWN_PREFIXES
        .iter()
        .find(|(known, _)| *known == uri)
        .map(|(_, prefix)| *prefix)
}

/// Resolved names and namespace declarations for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    qnames: HashMap<QName, String>,
    namespaces: HashMap<String, String>,
}

impl NamespaceTable {
    /// The serialized form of a name.
    ///
    /// `None` stands for the missing tag of a fragment and resolves to
    /// `Some(None)`; a name absent from the table resolves to `None`.
    pub fn resolve(&self, qname: Option<&QName>) -> Option<Option<&str>> {
        match qname {
            None => Some(None),
            Some(qname) => self.get(qname).map(Some),
        }
    }

    /// The serialized `prefix:local` (or plain) form of a name.
    pub fn get(&self, qname: &QName) -> Option<&str> {
        self.qnames.get(qname).map(String::as_str)
    }

    /// The prefix assigned to a namespace URI (`""` for the default one).
    pub fn prefix(&self, uri: &str) -> Option<&str> {
        self.namespaces.get(uri).map(String::as_str)
    }

    /// `(prefix, uri)` pairs sorted by prefix; the default namespace (empty
    /// prefix) comes first.
    pub fn declarations(&self) -> Vec<(&str, &str)> {
        let mut declarations: Vec<(&str, &str)> = self
            .namespaces
            .iter()
            .map(|(uri, prefix)| (prefix.as_str(), uri.as_str()))
            .collect();
        declarations.sort();
        declarations
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }
}

/// Computes a [`NamespaceTable`] for a tree.
#[derive(Debug, Clone, Default)]
pub struct NamespaceResolver {
    default_namespace: Option<String>,
    registered: HashMap<String, String>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize elements of `uri` without a prefix.
    ///
    /// With a default namespace every tag and attribute name must be
    /// qualified; resolution fails otherwise.
    pub fn with_default_namespace(mut self, uri: impl Into<String>) -> Self {
        self.default_namespace = Some(uri.into()).filter(|uri: &String| !uri.is_empty());
        self
    }

    /// Use `prefix` for `uri` instead of a synthesized one.
    ///
    /// Any other URI previously registered with the same prefix loses it.
    ///
    /// # Errors
    ///
    /// Prefixes of the form `ns<digits>` are reserved for synthesized
    /// prefixes and are rejected, as are empty prefixes and the reserved
    /// `xml` and `xmlns`.
    pub fn register_prefix(mut self, uri: impl Into<String>, prefix: &str) -> Result<Self> {
        if prefix.is_empty() {
            return Err(Error::configuration(
                "an empty prefix is reserved for the default namespace",
            ));
        }
        if prefix == "xml" || prefix == "xmlns" {
            return Err(Error::configuration(format!(
                "prefix '{}' is reserved by XML",
                prefix
            )));
        }
        if is_synthesized_prefix(prefix) {
            return Err(Error::configuration(format!(
                "prefix '{}' is reserved for internal use",
                prefix
            )));
        }
        self.registered.retain(|_, existing| existing != prefix);
        self.registered.insert(uri.into(), prefix.to_string());
        Ok(self)
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Walk `root` in document order and assign every name its form.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when a default namespace is set and a name
    /// is not qualified; [`Error::Serialization`] for a name that opens a
    /// `{` without closing it.
    pub fn resolve(&self, root: &Node) -> Result<NamespaceTable> {
        let mut table = NamespaceTable::default();
        if let Some(uri) = &self.default_namespace {
            table.namespaces.insert(uri.clone(), String::new());
        }

        for node in root.iter() {
            if let NodeKind::Element(tag) = &node.kind {
                self.add_qname(&mut table, tag, node)?;
            }
            for (key, value) in &node.attributes {
                self.add_qname(&mut table, key, node)?;
                if let AttrValue::QName(qname) = value {
                    self.add_qname(&mut table, qname, node)?;
                }
            }
        }

        tracing::debug!(
            names = table.qnames.len(),
            namespaces = table.namespaces.len(),
            "Resolved namespaces"
        );
        Ok(table)
    }

    fn add_qname(&self, table: &mut NamespaceTable, qname: &QName, node: &Node) -> Result<()> {
        if table.qnames.contains_key(qname) {
            return Ok(());
        }

        let display = match qname.split() {
            Some((uri, local)) => {
                let prefix = self.prefix_for(table, uri);
                if prefix.is_empty() {
                    local.to_string()
                } else {
                    format!("{}:{}", prefix, local)
                }
            }
            None if qname.is_qualified() => {
                return Err(Error::serialization(
                    format!("malformed qualified name '{}'", qname),
                    node.start,
                ));
            }
            None => {
                if self.default_namespace.is_some() {
                    return Err(Error::configuration(format!(
                        "cannot use non-qualified name '{}' (at {}) with a default namespace",
                        qname, node.start
                    )));
                }
                qname.as_str().to_string()
            }
        };

        table.qnames.insert(qname.clone(), display);
        Ok(())
    }

    fn prefix_for(&self, table: &mut NamespaceTable, uri: &str) -> String {
        if let Some(prefix) = table.namespaces.get(uri) {
            return prefix.clone();
        }

        // A conventional prefix already bound to another URI is skipped.
        let taken = |prefix: &str| table.namespaces.values().any(|bound| bound == prefix);
        let prefix = self
            .registered
            .get(uri)
            .map(String::as_str)
            .or_else(|| well_known_prefix(uri))
            .filter(|prefix| !taken(prefix))
            .map_or_else(|| format!("ns{}", table.namespaces.len()), str::to_string);

        if prefix != "xml" {
            tracing::debug!(uri, prefix = %prefix, "Assigned namespace prefix");
            table.namespaces.insert(uri.to_string(), prefix.clone());
        }
        prefix
    }
}

fn is_synthesized_prefix(prefix: &str) -> bool {
    prefix
        .strip_prefix("ns")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
