/*
 * encoder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Canonicalize a [`MappingStore`] and serialize it as Source Map v3.

use crate::store::validate;
use crate::vlq::encode_into;
use crate::{Error, Mapping, MappingStore, Result, SourceMap};

/// Build the Source Map v3 object for a store.
///
/// Mappings are sorted by generated position (then source, original
/// position and name) before being delta-encoded.
///
/// # Errors
///
/// Fails if any mapping has a generated line of 0.
pub fn encode(store: &MappingStore) -> Result<SourceMap> {
    let mut sorted: Vec<&Mapping> = Vec::with_capacity(store.len());
    for mapping in store.mappings() {
        validate(mapping)?;
        sorted.push(mapping);
    }
    sorted.sort();

    let mappings = serialize_mappings(&sorted, store)?;

    tracing::debug!(
        mappings = sorted.len(),
        sources = store.sources().len(),
        names = store.names().len(),
        "Encoded source map"
    );

    Ok(SourceMap {
        version: 3,
        file: store.file().map(str::to_string),
        source_root: None,
        sources: store.sources().to_vec(),
        names: store.names().to_vec(),
        mappings,
    })
}

/// Encode a store straight to JSON text.
pub fn encode_to_json(store: &MappingStore) -> Result<String> {
    encode(store)?.to_json()
}

/// Delta-encode sorted mappings into the `mappings` string.
///
/// Group `n` (0-based, separated by `;`) holds the segments of generated
/// line `n + 1`. A mapping at the same generated position as the previous
/// serialized one is skipped.
fn serialize_mappings(sorted: &[&Mapping], store: &MappingStore) -> Result<String> {
    let mut out = String::new();

    let mut current_line: u32 = 1;
    let mut previous_column: i64 = 0;
    let mut previous_source: i64 = 0;
    let mut previous_original_line: i64 = 0;
    let mut previous_original_column: i64 = 0;
    let mut previous_name: i64 = 0;
    let mut previous: Option<&Mapping> = None;

    for &mapping in sorted {
        if let Some(prev) = previous {
            if prev.generated() == mapping.generated() {
                continue;
            }
        }

        if mapping.generated_line != current_line {
            while current_line < mapping.generated_line {
                out.push(';');
                current_line += 1;
            }
            previous_column = 0;
        } else if previous.is_some() {
            out.push(',');
        }

        let column = i64::from(mapping.generated_column);
        encode_into(&mut out, column - previous_column);
        previous_column = column;

        if let Some(source) = &mapping.source {
            let source_index = i64::from(store.source_index(source).ok_or_else(|| {
                Error::InvalidMappings {
                    message: format!("source '{}' is not interned", source),
                    line: mapping.generated_line,
                }
            })?);
            encode_into(&mut out, source_index - previous_source);
            previous_source = source_index;

            let original_line = i64::from(mapping.original_line) - 1;
            encode_into(&mut out, original_line - previous_original_line);
            previous_original_line = original_line;

            let original_column = i64::from(mapping.original_column);
            encode_into(&mut out, original_column - previous_original_column);
            previous_original_column = original_column;

            // A name is only representable alongside a source.
            if let Some(name) = &mapping.name {
                let name_index = i64::from(store.name_index(name).ok_or_else(|| {
                    Error::InvalidMappings {
                        message: format!("name '{}' is not interned", name),
                        line: mapping.generated_line,
                    }
                })?);
                encode_into(&mut out, name_index - previous_name);
                previous_name = name_index;
            }
        }

        previous = Some(mapping);
    }

    Ok(out)
}
