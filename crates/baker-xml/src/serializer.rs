/*
 * serializer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Position-tracking serialization of [`Node`] trees.
//!
//! Every fragment written to the sink is first recorded in a
//! [`MappingStore`] as a mapping from the current generated position to the
//! source position of the node that produced it.

use crate::escape::{escape_attrib, escape_cdata};
use crate::{
    AttrValue, Error, GeneratedCursor, NamespaceResolver, NamespaceTable, Node, NodeKind,
    Position, QName, Result,
};
use baker_source_map::MappingStore;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;

/// Written before the root when [`SerializeOptions::xml_declaration`] is set.
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>\n";

/// Output method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Markup.
    #[default]
    Xml,
    /// Character data only, unescaped, in document order.
    Text,
}

/// Options for [`write_document`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SerializeOptions {
    /// Write elements without content as `<tag />` instead of `<tag></tag>`.
    pub short_empty_elements: bool,

    /// Namespace written without a prefix.
    pub default_namespace: Option<String>,

    /// Start the output with [`XML_DECLARATION`]. Ignored for
    /// [`Method::Text`].
    pub xml_declaration: bool,

    pub method: Method,

    /// Extra `uri -> prefix` conventions, consulted before synthesizing
    /// `ns<N>` prefixes.
    pub prefixes: BTreeMap<String, String>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            short_empty_elements: true,
            default_namespace: None,
            xml_declaration: false,
            method: Method::Xml,
            prefixes: BTreeMap::new(),
        }
    }
}

impl SerializeOptions {
    /// The namespace resolver these options describe.
    ///
    /// # Errors
    ///
    /// Fails when a registered prefix is reserved.
    pub fn resolver(&self) -> Result<NamespaceResolver> {
        let mut resolver = NamespaceResolver::new();
        if let Some(uri) = &self.default_namespace {
            resolver = resolver.with_default_namespace(uri.as_str());
        }
        for (uri, prefix) in &self.prefixes {
            resolver = resolver.register_prefix(uri.as_str(), prefix)?;
        }
        Ok(resolver)
    }
}

/// Serialize `root` to `writer` and record its mappings in `store`.
///
/// Namespaces are resolved first, so a resolution failure leaves the sink
/// untouched. Errors during writing leave whatever was already written in
/// the sink. The sink is flushed on success.
///
/// Returns the cursor after the last written fragment.
///
/// # Example
///
/// ```rust
/// use baker_source_map::MappingStore;
/// use baker_xml::{parse, write_document, SerializeOptions};
///
/// let root = parse("<a foo=\"1\"><b>hi</b>bye</a>").unwrap();
/// let mut out = Vec::new();
/// let mut store = MappingStore::new();
/// write_document(&root, &mut out, "in.html", &mut store, &SerializeOptions::default()).unwrap();
///
/// assert_eq!(String::from_utf8(out).unwrap(), "<a foo=\"1\"><b>hi</b>bye</a>");
/// assert_eq!(store.sources(), ["in.html"]);
/// ```
pub fn write_document<W: Write>(
    root: &Node,
    writer: W,
    source: &str,
    store: &mut MappingStore,
    options: &SerializeOptions,
) -> Result<GeneratedCursor> {
    let table = match options.method {
        Method::Xml => options.resolver()?.resolve(root)?,
        Method::Text => NamespaceTable::default(),
    };

    let mut serializer = Serializer::new(writer, &table, source, store)
        .short_empty_elements(options.short_empty_elements);

    let mut cursor = GeneratedCursor::START;
    cursor = match options.method {
        Method::Xml => {
            if options.xml_declaration {
                cursor = serializer.write_unmapped(XML_DECLARATION, cursor)?;
            }
            serializer.serialize(root, cursor)?
        }
        Method::Text => serializer.serialize_text(root, cursor)?,
    };
    serializer.writer.flush()?;

    tracing::debug!(
        mappings = serializer.store.len(),
        end = %cursor,
        "Serialized document"
    );
    Ok(cursor)
}

/// Serialize into a string, returning the output and its mappings.
pub fn serialize_to_string(
    root: &Node,
    source: &str,
    options: &SerializeOptions,
) -> Result<(String, MappingStore)> {
    let mut out = Vec::new();
    let mut store = MappingStore::new();
    write_document(root, &mut out, source, &mut store, options)?;
    let text = String::from_utf8(out).map_err(|err| Error::Serialization {
        message: err.to_string(),
        position: None,
    })?;
    Ok((text, store))
}

/// Walks a tree, writing markup and recording one mapping per origin change.
pub struct Serializer<'a, W: Write> {
    writer: W,
    table: &'a NamespaceTable,
    source: &'a str,
    store: &'a mut MappingStore,
    short_empty_elements: bool,
    /// Generated line and origin of the last recorded mapping.
    last_recorded: Option<(u32, Position)>,
}

impl<'a, W: Write> Serializer<'a, W> {
    pub fn new(
        writer: W,
        table: &'a NamespaceTable,
        source: &'a str,
        store: &'a mut MappingStore,
    ) -> Self {
        Self {
            writer,
            table,
            source,
            store,
            short_empty_elements: true,
            last_recorded: None,
        }
    }

    pub fn short_empty_elements(mut self, enabled: bool) -> Self {
        self.short_empty_elements = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write `root` as markup, declaring every namespace of the table on the
    /// outermost element.
    pub fn serialize(&mut self, root: &Node, cursor: GeneratedCursor) -> Result<GeneratedCursor> {
        let table = self.table;
        let declarations = table.declarations();
        self.serialize_node(root, &declarations, cursor)
    }

    /// Write only the character data of `root`, including its tail.
    ///
    /// Comments and processing instructions contribute their tails but not
    /// their content. Nothing is escaped.
    pub fn serialize_text(
        &mut self,
        root: &Node,
        cursor: GeneratedCursor,
    ) -> Result<GeneratedCursor> {
        let mut cursor = self.write_text_content(root, cursor)?;
        if let Some(tail) = &root.tail {
            cursor = self.write_at(tail, root.start, cursor)?;
        }
        Ok(cursor)
    }

    fn serialize_node(
        &mut self,
        node: &Node,
        declarations: &[(&str, &str)],
        cursor: GeneratedCursor,
    ) -> Result<GeneratedCursor> {
        let mut cursor = cursor;
        match &node.kind {
            NodeKind::Comment => {
                let text = node.text.as_deref().unwrap_or_default();
                cursor = self.write_at(&format!("<!--{}-->", text), node.start, cursor)?;
            }
            NodeKind::ProcessingInstruction => {
                let text = node.text.as_deref().unwrap_or_default();
                cursor = self.write_at(&format!("<?{}?>", text), node.start, cursor)?;
            }
            NodeKind::Fragment => {
                if let Some(text) = &node.text {
                    cursor = self.write_at(&escape_cdata(text), node.start, cursor)?;
                }
                for child in &node.children {
                    cursor = self.serialize_node(child, declarations, cursor)?;
                }
            }
            NodeKind::Element(tag) => {
                cursor = self.serialize_element(node, tag, declarations, cursor)?;
            }
        }

        if let Some(tail) = &node.tail {
            cursor = self.write_at(&escape_cdata(tail), node.start, cursor)?;
        }
        Ok(cursor)
    }

    fn serialize_element(
        &mut self,
        node: &Node,
        tag: &QName,
        declarations: &[(&str, &str)],
        cursor: GeneratedCursor,
    ) -> Result<GeneratedCursor> {
        let name = self.lookup(tag, node)?;
        let mut cursor = self.write_at(&format!("<{}", name), node.start, cursor)?;

        for (prefix, uri) in declarations {
            let declaration = if prefix.is_empty() {
                format!(" xmlns=\"{}\"", escape_attrib(uri))
            } else {
                format!(" xmlns:{}=\"{}\"", prefix, escape_attrib(uri))
            };
            cursor = self.write_at(&declaration, node.start, cursor)?;
        }

        let mut attributes: Vec<(&str, Cow<'_, str>)> = Vec::with_capacity(node.attributes.len());
        for (key, value) in &node.attributes {
            let key = self.lookup(key, node)?;
            let value = match value {
                AttrValue::Text(text) => escape_attrib(text),
                AttrValue::QName(qname) => Cow::Borrowed(self.lookup(qname, node)?),
            };
            attributes.push((key, value));
        }
        attributes.sort_by(|a, b| a.0.cmp(b.0));

        for (key, value) in &attributes {
            cursor = self.write_at(&format!(" {}=\"{}\"", key, value), node.start, cursor)?;
        }

        let text = node.text.as_deref().filter(|text| !text.is_empty());
        if text.is_some() || !node.children.is_empty() || !self.short_empty_elements {
            cursor = self.write_at(">", node.start, cursor)?;
            if let Some(text) = text {
                cursor = self.write_at(&escape_cdata(text), node.start, cursor)?;
            }
            for child in &node.children {
                cursor = self.serialize_node(child, &[], cursor)?;
            }
            cursor = self.write_at(&format!("</{}>", name), node.end, cursor)?;
        } else {
            cursor = self.write_at(" />", node.end, cursor)?;
        }
        Ok(cursor)
    }

    fn write_text_content(
        &mut self,
        node: &Node,
        cursor: GeneratedCursor,
    ) -> Result<GeneratedCursor> {
        if matches!(
            node.kind,
            NodeKind::Comment | NodeKind::ProcessingInstruction
        ) {
            return Ok(cursor);
        }

        let mut cursor = cursor;
        if let Some(text) = &node.text {
            cursor = self.write_at(text, node.start, cursor)?;
        }
        for child in &node.children {
            cursor = self.write_text_content(child, cursor)?;
            if let Some(tail) = &child.tail {
                cursor = self.write_at(tail, child.start, cursor)?;
            }
        }
        Ok(cursor)
    }

    fn lookup(&self, qname: &QName, node: &Node) -> Result<&'a str> {
        let table = self.table;
        table.get(qname).ok_or_else(|| {
            Error::serialization(
                format!("cannot serialize '{}': not in the namespace table", qname),
                node.start,
            )
        })
    }

    /// Record a mapping from `cursor` to `origin`, then write `fragment`.
    fn write_at(
        &mut self,
        fragment: &str,
        origin: Position,
        cursor: GeneratedCursor,
    ) -> Result<GeneratedCursor> {
        if fragment.is_empty() {
            return Ok(cursor);
        }
        self.record(origin, cursor)?;
        self.write_unmapped(fragment, cursor)
    }

    fn write_unmapped(&mut self, fragment: &str, cursor: GeneratedCursor) -> Result<GeneratedCursor> {
        self.writer.write_all(fragment.as_bytes())?;
        Ok(cursor.advance(fragment))
    }

    fn record(&mut self, origin: Position, cursor: GeneratedCursor) -> Result<()> {
        // A lookup anywhere on this line already lands on `origin`.
        if self.last_recorded == Some((cursor.line, origin)) {
            return Ok(());
        }
        self.store.add_mapping(
            Some(self.source),
            cursor.line,
            cursor.column,
            origin.line,
            origin.column,
            None,
        )?;
        self.last_recorded = Some((cursor.line, origin));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baker_source_map::Mapping;
    use pretty_assertions::assert_eq;

    fn at(line: u32, column: u32) -> Position {
        Position::new(line, column)
    }

    fn render(root: &Node, options: &SerializeOptions) -> String {
        serialize_to_string(root, "in.html", options).unwrap().0
    }

    fn render_default(root: &Node) -> String {
        render(root, &SerializeOptions::default())
    }

    /// `<a foo="1"><b>hi</b>bye</a>` with the positions a parser assigns.
    fn sample() -> Node {
        Node::element("a", at(1, 0), at(1, 23))
            .with_attribute("foo", "1")
            .with_child(
                Node::element("b", at(1, 11), at(1, 16))
                    .with_text("hi")
                    .with_tail("bye"),
            )
    }

    #[test]
    fn test_sample_output_and_mappings() {
        let (text, store) =
            serialize_to_string(&sample(), "in.html", &SerializeOptions::default()).unwrap();
        assert_eq!(text, r#"<a foo="1"><b>hi</b>bye</a>"#);

        let mapping = |gc, ol, oc| Mapping::new(1, gc, "in.html", ol, oc);
        assert_eq!(
            store.mappings(),
            [
                mapping(0, 1, 0),
                mapping(11, 1, 11),
                mapping(16, 1, 16),
                mapping(20, 1, 11),
                mapping(23, 1, 23),
            ]
        );
        assert_eq!(store.sources(), ["in.html"]);
    }

    #[test]
    fn test_short_empty_element() {
        let node = Node::element("tag", at(1, 0), at(1, 0)).with_attribute("attr", "v");
        assert_eq!(render_default(&node), r#"<tag attr="v" />"#);
    }

    #[test]
    fn test_long_empty_element() {
        let node = Node::element("tag", at(1, 0), at(1, 0)).with_text("");
        let options = SerializeOptions {
            short_empty_elements: false,
            ..Default::default()
        };
        assert_eq!(render(&node, &options), "<tag></tag>");
        assert_eq!(render_default(&node), "<tag />");
    }

    #[test]
    fn test_attributes_sorted_by_resolved_name() {
        let node = Node::element("e", at(1, 0), at(1, 0))
            .with_attribute("z", "1")
            .with_attribute(QName::with_namespace("urn:x", "m"), "2")
            .with_attribute("a", "3");
        assert_eq!(render_default(&node), r#"<e xmlns:ns0="urn:x" a="3" ns0:m="2" z="1" />"#);
    }

    #[test]
    fn test_namespaces_declared_once_on_root() {
        let x = |local| QName::with_namespace("urn:x", local);
        let node = Node::element(x("a"), at(1, 0), at(1, 40))
            .with_child(Node::element(x("b"), at(1, 10), at(1, 10)))
            .with_child(Node::element(
                QName::with_namespace("urn:y", "c"),
                at(1, 20),
                at(1, 20),
            ));
        assert_eq!(
            render_default(&node),
            r#"<ns0:a xmlns:ns0="urn:x" xmlns:ns1="urn:y"><ns0:b /><ns1:c /></ns0:a>"#
        );
    }

    #[test]
    fn test_default_namespace_declared_first() {
        let node = Node::element(QName::with_namespace("urn:d", "a"), at(1, 0), at(1, 0))
            .with_attribute(QName::with_namespace("urn:o", "k"), "v");
        let options = SerializeOptions {
            default_namespace: Some("urn:d".to_string()),
            ..Default::default()
        };
        assert_eq!(
            render(&node, &options),
            r#"<a xmlns="urn:d" xmlns:ns1="urn:o" ns1:k="v" />"#
        );
    }

    #[test]
    fn test_registered_prefixes() {
        let node = Node::element(QName::with_namespace("urn:book", "shelf"), at(1, 0), at(1, 0));
        let options = SerializeOptions {
            prefixes: BTreeMap::from([("urn:book".to_string(), "bk".to_string())]),
            ..Default::default()
        };
        assert_eq!(render(&node, &options), r#"<bk:shelf xmlns:bk="urn:book" />"#);
    }

    #[test]
    fn test_qname_attribute_value_is_resolved_not_escaped() {
        let node = Node::element("a", at(1, 0), at(1, 0))
            .with_attribute("type", QName::with_namespace("urn:t", "kind"));
        assert_eq!(
            render_default(&node),
            r#"<a xmlns:ns0="urn:t" type="ns0:kind" />"#
        );
    }

    #[test]
    fn test_escaping() {
        let node = Node::element("a", at(1, 0), at(1, 20))
            .with_attribute("t", "\"x\" & <y>\r\n\t")
            .with_text("1 < 2 & 3 > \"2\"")
            .with_tail(" & after");
        assert_eq!(
            render_default(&node),
            "<a t=\"&quot;x&quot; &amp; &lt;y&gt;&#10;&#09;\">1 &lt; 2 &amp; 3 &gt; \"2\"</a> &amp; after"
        );
    }

    #[test]
    fn test_comments_and_processing_instructions() {
        let node = Node::element("a", at(1, 0), at(1, 30))
            .with_child(Node::comment(" note ", at(1, 3)).with_tail("x"))
            .with_child(Node::processing_instruction("pi data", at(1, 17)));
        assert_eq!(render_default(&node), "<a><!-- note -->x<?pi data?></a>");
    }

    #[test]
    fn test_fragment_has_no_tag() {
        let root = Node::fragment(at(1, 0), at(1, 0))
            .with_text("lead & ")
            .with_child(Node::element("a", at(1, 7), at(1, 7)).with_tail(" "))
            .with_child(Node::element(
                QName::with_namespace("urn:x", "b"),
                at(1, 12),
                at(1, 12),
            ));
        assert_eq!(
            render_default(&root),
            r#"lead &amp; <a xmlns:ns0="urn:x" /> <ns0:b xmlns:ns0="urn:x" />"#
        );
    }

    #[test]
    fn test_text_method() {
        let root = Node::element("a", at(1, 0), at(1, 30))
            .with_text("1 < ")
            .with_child(Node::element("b", at(1, 7), at(1, 12)).with_text("2").with_tail("3"))
            .with_child(Node::comment("hidden", at(1, 17)).with_tail("4"))
            .with_tail("\n");
        let options = SerializeOptions {
            method: Method::Text,
            xml_declaration: true,
            ..Default::default()
        };
        assert_eq!(render(&root, &options), "1 < 234\n");
    }

    #[test]
    fn test_xml_declaration_is_unmapped() {
        let options = SerializeOptions {
            xml_declaration: true,
            ..Default::default()
        };
        let (text, store) = serialize_to_string(&sample(), "in.html", &options).unwrap();
        assert!(text.starts_with(XML_DECLARATION));
        assert!(text.ends_with("</a>"));
        let first = &store.mappings()[0];
        assert_eq!(first.generated(), (2, 0));
        assert_eq!(first.original(), (1, 0));
    }

    #[test]
    fn test_cursor_tracks_multiline_output() {
        let root = Node::element("a", at(1, 0), at(4, 0))
            .with_text("\n  ")
            .with_child(Node::element("b", at(2, 2), at(2, 2)).with_tail("\n  é\n"));
        let mut out = Vec::new();
        let mut store = MappingStore::new();
        let end = write_document(&root, &mut out, "in.xml", &mut store, &SerializeOptions::default())
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "<a>\n  <b />\n  é\n</a>");
        assert_eq!(end, GeneratedCursor::new(4, 4));

        let generated: Vec<(u32, u32)> = store.mappings().iter().map(Mapping::generated).collect();
        // The text after `<a>`, the ` />` and the tail of `b` share their
        // line and origin with the mapping before them.
        assert_eq!(generated, [(1, 0), (2, 2), (4, 0)]);
    }

    #[test]
    fn test_missing_qname_is_serialization_error() {
        let root = Node::element("a", at(3, 4), at(3, 4));
        let table = NamespaceTable::default();
        let mut store = MappingStore::new();
        let mut serializer = Serializer::new(Vec::new(), &table, "in.xml", &mut store);
        let err = serializer.serialize(&root, GeneratedCursor::START).unwrap_err();
        match err {
            Error::Serialization { message, position } => {
                assert!(message.contains("'a'"), "{message}");
                assert_eq!(position, Some(at(3, 4)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(serializer.into_inner().is_empty());
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let root = Node::element("a", at(0, 0), at(0, 0));
        let err = serialize_to_string(&root, "in.xml", &SerializeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::SourceMap(_)), "{err}");
    }

    #[test]
    fn test_sink_errors_propagate() {
        struct FailingWriter;

        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut store = MappingStore::new();
        let err = write_document(
            &sample(),
            FailingWriter,
            "in.html",
            &mut store,
            &SerializeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)), "{err}");
    }

    #[test]
    fn test_options_deserialize_kebab_case() {
        let options: SerializeOptions = serde_json::from_str(
            r#"{"short-empty-elements": false, "method": "text", "default-namespace": "urn:d"}"#,
        )
        .unwrap();
        assert!(!options.short_empty_elements);
        assert_eq!(options.method, Method::Text);
        assert_eq!(options.default_namespace.as_deref(), Some("urn:d"));
        assert!(!options.xml_declaration);

        let defaults: SerializeOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, SerializeOptions::default());
    }
}
