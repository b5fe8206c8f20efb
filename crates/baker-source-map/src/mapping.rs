/*
 * mapping.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! A single row of a source map.

use std::fmt;

/// Ties a position in generated text to a position in an original source.
///
/// Lines are 1-based and columns are 0-based. The derived ordering compares
/// fields in declaration order, which is the canonical order used by the
/// encoder: generated line, generated column, source, original line,
/// original column, name. `None` sorts before any string and strings compare
/// ordinally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: Option<String>,
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<String>,
}

impl Mapping {
    /// Create a mapping with a source and no name.
    pub fn new(
        generated_line: u32,
        generated_column: u32,
        source: impl Into<String>,
        original_line: u32,
        original_column: u32,
    ) -> Self {
        Self {
            generated_line,
            generated_column,
            source: Some(source.into()),
            original_line,
            original_column,
            name: None,
        }
    }

    /// Attach a symbol name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The generated `(line, column)` pair.
    pub fn generated(&self) -> (u32, u32) {
        (self.generated_line, self.generated_column)
    }

    /// The original `(line, column)` pair.
    pub fn original(&self) -> (u32, u32) {
        (self.original_line, self.original_column)
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.generated_line, self.generated_column)?;
        if let Some(source) = &self.source {
            write!(
                f,
                " -> {}:{}:{}",
                source, self.original_line, self.original_column
            )?;
        }
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}
