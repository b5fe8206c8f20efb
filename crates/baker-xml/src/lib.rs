//! Position-tracked XML for baker.
//!
//! This crate reads XML into a tree of [`Node`]s that remember where they
//! came from, and writes such trees back out while recording a source map
//! mapping for every fragment it emits. It wraps [`quick-xml`] for reading
//! and uses [`baker_source_map`] to collect mappings.
//!
//! # Overview
//!
//! The main types are:
//! - [`Node`]: an element, fragment, comment or processing instruction with
//!   its text, tail, children and source positions
//! - [`QName`]: a plain name or a `{uri}local` qualified name
//! - [`NamespaceResolver`]: assigns prefixes to the namespaces of a tree
//! - [`Serializer`]: writes a tree and records mappings as it goes
//! - [`GeneratedCursor`]: the current position in the generated output
//!
//! # Example
//!
//! ```rust
//! use baker_source_map::{MappingStore, encode};
//! use baker_xml::{parse, write_document, SerializeOptions};
//!
//! let root = parse("<a>\n  <b/>\n</a>").unwrap();
//!
//! let mut out = Vec::new();
//! let mut store = MappingStore::new();
//! write_document(&root, &mut out, "in.xml", &mut store, &SerializeOptions::default()).unwrap();
//!
//! assert_eq!(String::from_utf8(out).unwrap(), "<a>\n  <b />\n</a>");
//! assert_eq!(encode(&store).unwrap().mappings, "AAAA;EACE;AACF");
//! ```
//!
//! # Positions
//!
//! Lines are 1-based and columns 0-based, counted in chars rather than
//! bytes, in both the source ([`Position`]) and the output
//! ([`GeneratedCursor`]).

pub mod cursor;
pub mod error;
pub mod escape;
pub mod namespace;
pub mod parser;
pub mod position;
pub mod serializer;
pub mod types;

// Re-export main types
pub use cursor::GeneratedCursor;
pub use error::{Error, Result};
pub use escape::{escape_attrib, escape_cdata};
pub use namespace::{NamespaceResolver, NamespaceTable, XML_NAMESPACE, well_known_prefix};
pub use parser::{ParseOptions, parse, parse_with_options};
pub use position::{LineIndex, Position};
pub use serializer::{
    Method, SerializeOptions, Serializer, XML_DECLARATION, serialize_to_string, write_document,
};
pub use types::{AttrValue, Iter, Node, NodeKind, QName};
