/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for parsing, namespace resolution and serialization.

use crate::Position;
use thiserror::Error;

/// Result type alias for baker-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing documents.
///
/// None of these are retried: every operation is deterministic, so a retry
/// would fail the same way. Output already written to a sink before a
/// serialization error is not rolled back.
#[derive(Debug, Error)]
pub enum Error {
    /// An invalid combination of options.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A value reached the writer that cannot be written, such as a
    /// qualified name missing from the namespace table.
    #[error("Serialization error{}: {message}", .position.map(|p| format!(" at {}", p)).unwrap_or_default())]
    Serialization {
        message: String,
        position: Option<Position>,
    },

    /// The sink rejected a write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A mapping could not be recorded.
    #[error(transparent)]
    SourceMap(#[from] baker_source_map::Error),

    /// XML syntax error from quick-xml.
    #[error("XML syntax error{}: {message}", .position.map(|p| format!(" at {}", p)).unwrap_or_default())]
    XmlSyntax {
        message: String,
        position: Option<Position>,
    },

    /// The input ended inside an element.
    #[error("Unexpected end of input at {position}, expected {expected}")]
    UnexpectedEof { expected: String, position: Position },

    /// An end tag that does not close the open element.
    #[error("Mismatched end tag at {position}: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        position: Position,
    },

    /// A prefix used without an `xmlns:prefix` declaration in scope.
    #[error("Unbound namespace prefix '{prefix}' at {position}")]
    UnboundPrefix { prefix: String, position: Position },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// A second top-level element.
    #[error("Invalid XML: multiple root elements (second root at {position})")]
    MultipleRoots { position: Position },
}

impl Error {
    pub(crate) fn serialization(message: impl Into<String>, position: Position) -> Self {
        Error::Serialization {
            message: message.into(),
            position: Some(position),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}
