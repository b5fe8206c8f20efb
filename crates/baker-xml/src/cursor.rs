/*
 * cursor.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::fmt;

/// The position in the generated output where the next fragment lands.
///
/// Lines are 1-based, columns 0-based and counted in chars, matching
/// [`crate::Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratedCursor {
    pub line: u32,
    pub column: u32,
}

impl GeneratedCursor {
    /// The start of the output.
    pub const START: GeneratedCursor = GeneratedCursor { line: 1, column: 0 };

    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The cursor after writing `fragment` at this position.
    #[must_use]
    pub fn advance(self, fragment: &str) -> Self {
        match fragment.rfind('\n') {
            Some(last) => {
                let newlines = fragment.bytes().filter(|&b| b == b'\n').count();
                GeneratedCursor {
                    line: self.line.saturating_add(to_u32(newlines)),
                    column: to_u32(fragment[last + 1..].chars().count()),
                }
            }
            None => GeneratedCursor {
                line: self.line,
                column: self
                    .column
                    .saturating_add(to_u32(fragment.chars().count())),
            },
        }
    }
}

impl Default for GeneratedCursor {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for GeneratedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn to_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_line_one() {
        assert_eq!(GeneratedCursor::default(), GeneratedCursor::new(1, 0));
    }

    #[test]
    fn test_advance_on_one_line() {
        let cursor = GeneratedCursor::START.advance("<a").advance(">");
        assert_eq!(cursor, GeneratedCursor::new(1, 3));
    }

    #[test]
    fn test_advance_over_newlines() {
        let cursor = GeneratedCursor::new(2, 7).advance("x\n\n  <b");
        assert_eq!(cursor, GeneratedCursor::new(4, 4));

        let cursor = GeneratedCursor::new(1, 5).advance("\n");
        assert_eq!(cursor, GeneratedCursor::new(2, 0));
    }

    #[test]
    fn test_empty_fragment_does_not_move() {
        let cursor = GeneratedCursor::new(3, 9);
        assert_eq!(cursor.advance(""), cursor);
    }

    #[test]
    fn test_columns_count_chars() {
        let cursor = GeneratedCursor::START.advance("héllo");
        assert_eq!(cursor.column, 5);
        let cursor = GeneratedCursor::START.advance("é\nü€");
        assert_eq!(cursor, GeneratedCursor::new(2, 2));
    }
}
