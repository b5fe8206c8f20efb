/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source Map v3 support for baker
//!
//! This crate collects position pairs produced while generating output and
//! turns them into the standard Source Map v3 JSON object. It also reads
//! existing maps so that a new map can be traced through an upstream one.
//!
//! # Overview
//!
//! The core types are:
//! - [`Mapping`]: one generated position tied to one original position
//! - [`MappingStore`]: de-duplicating collection with source/name interning
//! - [`SourceMap`]: the serializable v3 object
//! - [`DecodedMap`]: a parsed map indexed for lookups
//!
//! # Example
//!
//! ```rust
//! use baker_source_map::{MappingStore, encode};
//!
//! let mut store = MappingStore::new();
//! store.add_mapping(Some("in.html"), 1, 0, 1, 0, None).unwrap();
//! store.add_mapping(Some("in.html"), 2, 2, 3, 4, None).unwrap();
//!
//! let map = encode(&store).unwrap();
//! assert_eq!(map.mappings, "AAAA;EAEI");
//! assert_eq!(
//!     map.to_json().unwrap(),
//!     r#"{"version":3,"sources":["in.html"],"mappings":"AAAA;EAEI"}"#
//! );
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod mapping;
pub mod source_map;
pub mod store;
pub mod vlq;

// Re-export main types
pub use decoder::{DecodedMap, decode_mappings};
pub use encoder::{encode, encode_to_json};
pub use error::{Error, Result};
pub use mapping::Mapping;
pub use source_map::SourceMap;
pub use store::MappingStore;
