/*
 * store.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Append-only collection of mappings with source and name interning.

use crate::{Error, Mapping, Result};
use std::collections::{HashMap, HashSet};

/// Accumulates mappings for one serialization pass.
///
/// Identical mappings are stored once. Sources and names are interned in
/// first-seen order and keep their index for the lifetime of the store;
/// those indices are the ones written to the encoded `mappings` string.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    mappings: Vec<Mapping>,
    seen: HashSet<Mapping>,
    sources: Vec<String>,
    source_indices: HashMap<String, u32>,
    names: Vec<String>,
    name_indices: HashMap<String, u32>,
    file: Option<String>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name of the generated file recorded in the `file` field.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Record a mapping from a generated position to an original one.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidGeneratedLine`] when `generated_line` is 0,
    /// and with [`Error::InvalidOriginalLine`] when a source is given and
    /// `original_line` is 0.
    pub fn add_mapping(
        &mut self,
        source: Option<&str>,
        generated_line: u32,
        generated_column: u32,
        original_line: u32,
        original_column: u32,
        name: Option<&str>,
    ) -> Result<()> {
        self.push(Mapping {
            generated_line,
            generated_column,
            source: source.map(str::to_string),
            original_line,
            original_column,
            name: name.map(str::to_string),
        })?;
        Ok(())
    }

    /// Insert an already-built mapping.
    ///
    /// A name on a mapping without a source cannot be encoded and is
    /// dropped. Returns `false` if an identical mapping was already stored.
    pub fn push(&mut self, mut mapping: Mapping) -> Result<bool> {
        validate(&mapping)?;
        if mapping.source.is_none() {
            mapping.name = None;
        }

        if self.seen.contains(&mapping) {
            return Ok(false);
        }

        if let Some(source) = &mapping.source {
            self.add_source(source);
        }
        if let Some(name) = &mapping.name {
            self.add_name(name);
        }

        tracing::trace!(%mapping, "Recorded mapping");
        self.seen.insert(mapping.clone());
        self.mappings.push(mapping);
        Ok(true)
    }

    /// Intern a source, returning its stable index.
    pub fn add_source(&mut self, source: &str) -> u32 {
        intern(&mut self.sources, &mut self.source_indices, source)
    }

    /// Intern a name, returning its stable index.
    pub fn add_name(&mut self, name: &str) -> u32 {
        intern(&mut self.names, &mut self.name_indices, name)
    }

    pub fn source_index(&self, source: &str) -> Option<u32> {
        self.source_indices.get(source).copied()
    }

    pub fn name_index(&self, name: &str) -> Option<u32> {
        self.name_indices.get(name).copied()
    }

    /// Mappings in insertion order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Interned sources in first-seen order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Interned names in first-seen order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Check the line invariants of a mapping.
pub(crate) fn validate(mapping: &Mapping) -> Result<()> {
    if mapping.generated_line == 0 {
        return Err(Error::InvalidGeneratedLine {
            mapping: Box::new(mapping.clone()),
        });
    }
    if mapping.source.is_some() && mapping.original_line == 0 {
        return Err(Error::InvalidOriginalLine {
            mapping: Box::new(mapping.clone()),
        });
    }
    Ok(())
}

fn intern(table: &mut Vec<String>, indices: &mut HashMap<String, u32>, value: &str) -> u32 {
    if let Some(&idx) = indices.get(value) {
        return idx;
    }

    let idx = table.len() as u32;
    indices.insert(value.to_string(), idx);
    table.push(value.to_string());
    idx
}
