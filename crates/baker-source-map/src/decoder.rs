/*
 * decoder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Reading existing source maps back into [`Mapping`] values.

use crate::{Error, Mapping, MappingStore, Result, SourceMap, vlq};

/// A source map with its `mappings` string expanded, indexed by line.
#[derive(Debug, Clone, Default)]
pub struct DecodedMap {
    /// `lines[n]` holds the mappings of generated line `n + 1`, ordered by
    /// generated column.
    lines: Vec<Vec<Mapping>>,
    file: Option<String>,
}

impl DecodedMap {
    /// Decode a parsed source map.
    pub fn new(map: &SourceMap) -> Result<Self> {
        let mappings = decode_mappings(map)?;
        let mut lines: Vec<Vec<Mapping>> = Vec::new();
        for mapping in mappings {
            let idx = (mapping.generated_line - 1) as usize;
            if lines.len() <= idx {
                lines.resize_with(idx + 1, Vec::new);
            }
            lines[idx].push(mapping);
        }
        for line in &mut lines {
            line.sort();
        }
        Ok(Self {
            lines,
            file: map.file.clone(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(&SourceMap::from_json(json)?)
    }

    /// Find the mapping covering a generated position.
    ///
    /// This is the mapping on `line` with the greatest generated column not
    /// after `column`. Positions before the first mapping of a line, and
    /// lines without mappings, have no origin.
    pub fn lookup(&self, line: u32, column: u32) -> Option<&Mapping> {
        let idx = line.checked_sub(1)? as usize;
        let segments = self.lines.get(idx)?;
        let after = segments.partition_point(|m| m.generated_column <= column);
        after.checked_sub(1).map(|i| &segments[i])
    }

    /// All mappings in generated order.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.lines.iter().flatten()
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Rebuild a store from the decoded mappings.
    pub fn to_store(&self) -> Result<MappingStore> {
        let mut store = match &self.file {
            Some(file) => MappingStore::new().with_file(file.clone()),
            None => MappingStore::new(),
        };
        for mapping in self.mappings() {
            store.push(mapping.clone())?;
        }
        Ok(store)
    }
}

/// Decode the `mappings` string of a source map.
///
/// Sources are resolved against `sourceRoot` when one is set.
///
/// # Errors
///
/// Fails on malformed VLQ data, on segments that are not 1, 4 or 5 values
/// long, and on positions or indices out of range.
pub fn decode_mappings(map: &SourceMap) -> Result<Vec<Mapping>> {
    let sources: Vec<String> = map
        .sources
        .iter()
        .map(|source| join_source_root(map.source_root.as_deref(), source))
        .collect();

    let mut mappings = Vec::new();
    let mut source_index: i64 = 0;
    let mut original_line: i64 = 0;
    let mut original_column: i64 = 0;
    let mut name_index: i64 = 0;

    for (idx, group) in map.mappings.split(';').enumerate() {
        let line = u32::try_from(idx + 1).map_err(|_| Error::InvalidMappings {
            message: "too many lines".to_string(),
            line: u32::MAX,
        })?;
        let invalid = |message: String| Error::InvalidMappings { message, line };

        let mut column: i64 = 0;
        for segment in group.split(',').filter(|s| !s.is_empty()) {
            let values = vlq::decode_segment(segment)?;
            if !matches!(values.len(), 1 | 4 | 5) {
                return Err(invalid(format!(
                    "segment '{}' has {} fields, expected 1, 4 or 5",
                    segment,
                    values.len()
                )));
            }

            accumulate(&mut column, values[0], "generated column", line)?;
            let generated_column = u32::try_from(column)
                .map_err(|_| invalid(format!("generated column {} out of range", column)))?;

            let mut mapping = Mapping {
                generated_line: line,
                generated_column,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };

            if values.len() >= 4 {
                accumulate(&mut source_index, values[1], "source index", line)?;
                accumulate(&mut original_line, values[2], "original line", line)?;
                accumulate(&mut original_column, values[3], "original column", line)?;

                let source = usize::try_from(source_index)
                    .ok()
                    .and_then(|i| sources.get(i))
                    .ok_or_else(|| invalid(format!("source index {} out of range", source_index)))?;
                mapping.source = Some(source.clone());
                mapping.original_line = original_line
                    .checked_add(1)
                    .and_then(|l| u32::try_from(l).ok())
                    .ok_or_else(|| {
                        invalid(format!("original line {} out of range", original_line))
                    })?;
                mapping.original_column = u32::try_from(original_column).map_err(|_| {
                    invalid(format!("original column {} out of range", original_column))
                })?;
            }

            if values.len() == 5 {
                accumulate(&mut name_index, values[4], "name index", line)?;
                let name = usize::try_from(name_index)
                    .ok()
                    .and_then(|i| map.names.get(i))
                    .ok_or_else(|| invalid(format!("name index {} out of range", name_index)))?;
                mapping.name = Some(name.clone());
            }

            mappings.push(mapping);
        }
    }

    Ok(mappings)
}

/// Add a decoded delta to a running field value.
fn accumulate(total: &mut i64, delta: i64, field: &str, line: u32) -> Result<()> {
    *total = total
        .checked_add(delta)
        .ok_or_else(|| Error::InvalidMappings {
            message: format!("{} overflows", field),
            line,
        })?;
    Ok(())
}

fn join_source_root(root: Option<&str>, source: &str) -> String {
    match root {
        Some(root) if !root.is_empty() => {
            if root.ends_with('/') {
                format!("{}{}", root, source)
            } else {
                format!("{}/{}", root, source)
            }
        }
        _ => source.to_string(),
    }
}

impl MappingStore {
    /// Trace every mapping of this store through an upstream map.
    ///
    /// Used when the input of a pass was itself generated: a mapping whose
    /// original position is covered by `upstream` is rewritten to point at
    /// the upstream origin. The upstream name wins when it has one.
    /// Mappings the upstream map does not cover are kept unchanged.
    pub fn apply_source_map(&self, upstream: &DecodedMap) -> Result<MappingStore> {
        let mut composed = match self.file() {
            Some(file) => MappingStore::new().with_file(file),
            None => MappingStore::new(),
        };

        let mut rewritten = 0usize;
        for mapping in self.mappings() {
            let traced = mapping
                .source
                .as_ref()
                .and_then(|_| upstream.lookup(mapping.original_line, mapping.original_column))
                .filter(|origin| origin.source.is_some());

            let mapping = match traced {
                Some(origin) => {
                    rewritten += 1;
                    Mapping {
                        generated_line: mapping.generated_line,
                        generated_column: mapping.generated_column,
                        source: origin.source.clone(),
                        original_line: origin.original_line,
                        original_column: origin.original_column,
                        name: origin.name.clone().or_else(|| mapping.name.clone()),
                    }
                }
                None => mapping.clone(),
            };
            composed.push(mapping)?;
        }

        tracing::debug!(
            total = self.len(),
            rewritten,
            "Applied upstream source map"
        );
        Ok(composed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    fn map_with(mappings: &str, sources: &[&str], names: &[&str]) -> SourceMap {
        SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            names: names.iter().map(|s| s.to_string()).collect(),
            mappings: mappings.to_string(),
        }
    }

    #[test]
    fn test_decode_simple() {
        let mappings = decode_mappings(&map_with("AAAA,KAAG,IACH", &["in.html"], &[])).unwrap();
        assert_eq!(
            mappings,
            vec![
                Mapping::new(1, 0, "in.html", 1, 0),
                Mapping::new(1, 5, "in.html", 1, 3),
                Mapping::new(1, 9, "in.html", 2, 0),
            ]
        );
    }

    #[test]
    fn test_decode_line_groups_and_names() {
        let map = map_with("AAAAA,CCAAC;ADAAD", &["a", "b"], &["x", "y"]);
        let mappings = decode_mappings(&map).unwrap();
        assert_eq!(mappings.len(), 3);
        assert_eq!(mappings[1], Mapping::new(1, 1, "b", 1, 0).with_name("y"));
        assert_eq!(mappings[2], Mapping::new(2, 0, "a", 1, 0).with_name("x"));
    }

    #[test]
    fn test_decode_column_resets_per_line() {
        let mappings = decode_mappings(&map_with("EAAA;;;CAEA", &["in.html"], &[])).unwrap();
        assert_eq!(mappings[1].generated(), (4, 1));
        assert_eq!(mappings[1].original(), (3, 0));
    }

    #[test]
    fn test_decode_sourceless_segment() {
        let mappings = decode_mappings(&map_with("O", &[], &[])).unwrap();
        assert_eq!(mappings[0].generated(), (1, 7));
        assert_eq!(mappings[0].source, None);
    }

    #[test]
    fn test_decode_rejects_bad_segment_length() {
        let err = decode_mappings(&map_with("AA", &["a"], &[])).unwrap_err();
        assert!(matches!(err, Error::InvalidMappings { line: 1, .. }), "{err}");
    }

    #[test]
    fn test_decode_rejects_unknown_source() {
        let err = decode_mappings(&map_with("ACAA", &["a"], &[])).unwrap_err();
        assert!(matches!(err, Error::InvalidMappings { .. }), "{err}");
    }

    #[test]
    fn test_decode_rejects_truncated_vlq() {
        let err = decode_mappings(&map_with("AAAg", &["a"], &[])).unwrap_err();
        assert!(matches!(err, Error::Vlq { .. }), "{err}");
    }

    #[test]
    fn test_decode_rejects_overflowing_deltas() {
        // Original line delta of i64::MAX, then +1 for the 1-based line.
        let huge = vlq::encode(i64::MAX);
        let map = map_with(&format!("AA{}A", huge), &["a"], &[]);
        let err = decode_mappings(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidMappings { line: 1, .. }), "{err}");

        // Generated column 5 followed by a delta of i64::MAX.
        let map = map_with(&format!("K,{}", huge), &[], &[]);
        let err = decode_mappings(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidMappings { line: 1, .. }), "{err}");

        // Original column 5 followed by a delta of i64::MAX.
        let map = map_with(&format!("AAAK,AAA{}", huge), &["a"], &[]);
        let err = decode_mappings(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidMappings { line: 1, .. }), "{err}");
    }

    #[test]
    fn test_decode_applies_source_root() {
        let mut map = map_with("AAAA", &["a.html"], &[]);
        map.source_root = Some("src".to_string());
        let mappings = decode_mappings(&map).unwrap();
        assert_eq!(mappings[0].source.as_deref(), Some("src/a.html"));
    }

    #[test]
    fn test_lookup() {
        let decoded = DecodedMap::new(&map_with("AAAA,KAAG;EACA", &["in.html"], &[])).unwrap();

        assert_eq!(decoded.lookup(1, 0).unwrap().original(), (1, 0));
        assert_eq!(decoded.lookup(1, 4).unwrap().original(), (1, 0));
        assert_eq!(decoded.lookup(1, 5).unwrap().original(), (1, 3));
        assert_eq!(decoded.lookup(1, 100).unwrap().original(), (1, 3));
        assert!(decoded.lookup(2, 1).is_none());
        assert_eq!(decoded.lookup(2, 2).unwrap().original(), (2, 3));
        assert!(decoded.lookup(3, 0).is_none());
        assert!(decoded.lookup(0, 0).is_none());
    }

    #[test]
    fn test_to_store_roundtrip() {
        let mut store = MappingStore::new().with_file("out.html");
        store.add_mapping(Some("in.html"), 1, 0, 1, 0, None).unwrap();
        store.add_mapping(Some("in.html"), 2, 4, 3, 1, Some("p")).unwrap();

        let decoded = DecodedMap::new(&encode(&store).unwrap()).unwrap();
        let rebuilt = decoded.to_store().unwrap();
        assert_eq!(rebuilt.mappings(), store.mappings());
        assert_eq!(rebuilt.file(), Some("out.html"));
    }

    #[test]
    fn test_apply_source_map() {
        // Upstream: the intermediate file's line 1 came from raw.html line 5.
        let mut upstream = MappingStore::new();
        upstream.add_mapping(Some("raw.html"), 1, 0, 5, 2, None).unwrap();
        upstream
            .add_mapping(Some("raw.html"), 1, 10, 6, 0, Some("b"))
            .unwrap();
        let upstream = DecodedMap::new(&encode(&upstream).unwrap()).unwrap();

        let mut store = MappingStore::new();
        store.add_mapping(Some("mid.html"), 1, 0, 1, 3, None).unwrap();
        store
            .add_mapping(Some("mid.html"), 2, 0, 1, 12, Some("a"))
            .unwrap();
        store.add_mapping(Some("mid.html"), 3, 0, 9, 0, None).unwrap();

        let composed = store.apply_source_map(&upstream).unwrap();
        let rows = composed.mappings();
        assert_eq!(rows[0], Mapping::new(1, 0, "raw.html", 5, 2));
        assert_eq!(rows[1], Mapping::new(2, 0, "raw.html", 6, 0).with_name("b"));
        assert_eq!(rows[2], Mapping::new(3, 0, "mid.html", 9, 0));
        assert_eq!(composed.sources(), ["raw.html", "mid.html"]);
    }
}
