/*
 * position.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source positions and offset-to-position conversion.

use std::fmt;

/// A position in a text: 1-based line, 0-based column counted in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Index of line starts for fast offset lookups.
///
/// Built once per document; each lookup is a binary search over the line
/// starts followed by a char count within the line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first byte of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                content
                    .char_indices()
                    .filter_map(|(idx, ch)| (ch == '\n').then_some(idx + 1)),
            )
            .collect();
        Self { line_starts }
    }

    /// Convert a byte offset into `content` to a [`Position`].
    ///
    /// Offsets past the end are clamped to the end of the content.
    pub fn position(&self, content: &str, offset: usize) -> Position {
        let offset = offset.min(content.len());
        let row = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[row];
        let column = content
            .get(line_start..offset)
            .map_or(offset - line_start, |line| line.chars().count());

        Position::new(saturating_u32(row + 1), saturating_u32(column))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
