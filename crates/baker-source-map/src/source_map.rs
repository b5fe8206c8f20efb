/*
 * source_map.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The Source Map v3 JSON object.

use crate::Result;
use serde::{Deserialize, Serialize};

/// A Source Map v3 document.
///
/// Field order matches the serialized layout:
/// `{"version":3,"file":...,"sources":[...],"names":[...],"mappings":"..."}`,
/// where `file` and `sourceRoot` appear only when set and `names` only when
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    pub mappings: String,
}

impl SourceMap {
    /// Parse a source map from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a source map from a reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Compact JSON, the form written next to generated output.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write compact JSON to a writer.
    pub fn to_writer<W: std::io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let map = SourceMap::from_json(r#"{"version":3,"mappings":"AAAA"}"#).unwrap();
        assert_eq!(map.version, 3);
        assert!(map.sources.is_empty());
        assert!(map.names.is_empty());
        assert_eq!(map.file, None);
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let json = r#"{
            "version": 3,
            "sourceRoot": "/src/",
            "sources": ["a.html"],
            "sourcesContent": [null],
            "mappings": ";AAAA"
        }"#;
        let map = SourceMap::from_json(json).unwrap();
        assert_eq!(map.source_root.as_deref(), Some("/src/"));
        assert_eq!(map.sources, ["a.html"]);
    }

    #[test]
    fn test_from_reader() {
        let json = br#"{"version":3,"file":"out.html","sources":["a.html"],"names":["p"],"mappings":"AAAAA"}"#;
        let map = SourceMap::from_reader(&json[..]).unwrap();
        assert_eq!(map.file.as_deref(), Some("out.html"));
        assert_eq!(map.names, ["p"]);
        assert!(SourceMap::from_reader(&b"{\"version\":"[..]).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_mappings() {
        assert!(SourceMap::from_json(r#"{"version":3}"#).is_err());
    }

    #[test]
    fn test_serialize_skips_empty_optionals() {
        let map = SourceMap {
            version: 3,
            file: None,
            source_root: None,
            sources: vec!["a.html".to_string()],
            names: vec![],
            mappings: "AAAA".to_string(),
        };
        assert_eq!(
            map.to_json().unwrap(),
            r#"{"version":3,"sources":["a.html"],"mappings":"AAAA"}"#
        );
    }
}
