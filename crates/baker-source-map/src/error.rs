/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for building, encoding and decoding source maps.

use crate::Mapping;
use thiserror::Error;

/// Errors that can occur while working with source maps.
#[derive(Debug, Error)]
pub enum Error {
    /// Generated lines are 1-based; line 0 cannot be represented.
    #[error("Invalid mapping: generated line must be >= 1 ({mapping})")]
    InvalidGeneratedLine { mapping: Box<Mapping> },

    /// Original lines are 1-based whenever a source is present.
    #[error("Invalid mapping: original line must be >= 1 ({mapping})")]
    InvalidOriginalLine { mapping: Box<Mapping> },

    /// Malformed base64 VLQ input.
    #[error("Invalid VLQ at byte {position}: {message}")]
    Vlq { message: String, position: usize },

    /// A decoded segment is structurally invalid.
    #[error("Invalid mappings on generated line {line}: {message}")]
    InvalidMappings { message: String, line: u32 },

    /// The source map JSON could not be read or written.
    #[error("Invalid source map JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for source map operations.
pub type Result<T> = std::result::Result<T, Error>;
