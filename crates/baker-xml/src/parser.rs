/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! XML parser that builds position-annotated [`Node`] trees.

use crate::namespace::XML_NAMESPACE;
use crate::{AttrValue, Error, LineIndex, Node, NodeKind, Position, QName, Result};
use quick_xml::NsReader;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::ResolveResult;

/// Which markup besides elements and text ends up in the tree.
///
/// Comments and processing instructions outside the root element are
/// always dropped, as are the XML declaration and DOCTYPE.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub insert_comments: bool,
    pub insert_pis: bool,
}

/// Parse XML from a string.
///
/// Element names and attribute names are resolved to `{uri}local` form;
/// `xmlns` declarations are consumed and do not appear as attributes.
///
/// # Example
///
/// ```rust
/// use baker_xml::{parse, Position};
///
/// let root = parse("<a foo=\"1\">\n  <b>hi</b>\n</a>").unwrap();
/// assert_eq!(root.tag().unwrap().as_str(), "a");
/// assert_eq!(root.start, Position::new(1, 0));
///
/// let b = &root.children[0];
/// assert_eq!(b.start, Position::new(2, 2));
/// assert_eq!(b.end, Position::new(2, 7));
/// assert_eq!(b.tail.as_deref(), Some("\n"));
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed or uses an undeclared prefix.
pub fn parse(content: &str) -> Result<Node> {
    parse_with_options(content, &ParseOptions::default())
}

/// Parse XML with explicit [`ParseOptions`].
pub fn parse_with_options(content: &str, options: &ParseOptions) -> Result<Node> {
    let mut parser = XmlParser::new(content, *options);
    parser.parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The source content being parsed.
    source: &'a str,

    /// The quick-xml reader with namespace resolution.
    reader: NsReader<&'a [u8]>,

    /// Line starts of `source`, for offset-to-position conversion.
    lines: LineIndex,

    options: ParseOptions,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// An element being constructed during parsing.
struct BuildNode {
    /// Name as written in the source, for end-tag matching.
    raw_name: String,
    tag: QName,
    attributes: Vec<(QName, AttrValue)>,
    start: Position,
    text: Option<String>,
    children: Vec<Node>,
}

impl BuildNode {
    fn finish(self, end: Position) -> Node {
        Node {
            kind: NodeKind::Element(self.tag),
            attributes: self.attributes,
            text: self.text,
            tail: None,
            children: self.children,
            start: self.start,
            end,
        }
    }
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str, options: ParseOptions) -> Self {
        let mut reader = NsReader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            lines: LineIndex::new(source),
            options,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<Node> {
        let mut root: Option<Node> = None;

        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    let offset = self.reader.error_position() as usize;
                    return Err(Error::XmlSyntax {
                        message: err.to_string(),
                        position: Some(self.position(offset)),
                    });
                }
            };

            match event {
                Event::Start(e) => {
                    self.check_single_root(root.as_ref(), event_start)?;
                    let node = self.start_node(&e, event_start)?;
                    self.stack.push(node);
                }
                Event::Empty(e) => {
                    self.check_single_root(root.as_ref(), event_start)?;
                    let node = self.start_node(&e, event_start)?;
                    let end = node.start;
                    self.attach(node.finish(end), &mut root);
                }
                Event::End(e) => {
                    let node = self.handle_end(&e, event_start)?;
                    self.attach(node, &mut root);
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|err| Error::XmlSyntax {
                        message: format!("Invalid text content: {}", err),
                        position: Some(self.position(event_start)),
                    })?;
                    self.append_text(&text);
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.append_text(&text);
                }
                Event::Comment(e) => {
                    if self.options.insert_comments {
                        let text = String::from_utf8_lossy(&e).into_owned();
                        let node = Node::comment(text, self.position(event_start));
                        self.attach_inner(node);
                    }
                }
                Event::PI(e) => {
                    if self.options.insert_pis {
                        let text = String::from_utf8_lossy(&e).into_owned();
                        let node = Node::processing_instruction(text, self.position(event_start));
                        self.attach_inner(node);
                    }
                }
                Event::Decl(_) | Event::DocType(_) => {
                    // Skip XML declarations and DOCTYPE declarations
                }
                Event::Eof => break,
            }
        }

        // Check for unclosed elements
        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.raw_name),
                position: self.position(self.source.len()),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        tracing::debug!(lines = self.lines.line_count(), "Parsed document");
        Ok(root)
    }

    fn position(&self, offset: usize) -> Position {
        self.lines.position(self.source, offset)
    }

    fn check_single_root(&self, root: Option<&Node>, event_start: usize) -> Result<()> {
        if root.is_some() && self.stack.is_empty() {
            return Err(Error::MultipleRoots {
                position: self.position(event_start),
            });
        }
        Ok(())
    }

    fn start_node(&self, e: &BytesStart<'_>, event_start: usize) -> Result<BuildNode> {
        let start = self.position(event_start);
        let raw_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        let (resolved, local) = self.reader.resolve_element(e.name());
        let tag = qualify(resolved, local.as_ref(), start)?;

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| Error::XmlSyntax {
                message: format!("Attribute error: {}", err),
                position: Some(start),
            })?;

            // Namespace declarations are consumed by the resolver.
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }

            let (resolved, local) = self.reader.resolve_attribute(attr.key);
            let name = qualify(resolved, local.as_ref(), start)?;
            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: Some(start),
            })?;

            attributes.push((name, AttrValue::Text(value.into_owned())));
        }

        Ok(BuildNode {
            raw_name,
            tag,
            attributes,
            start,
            text: None,
            children: Vec::new(),
        })
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>, event_start: usize) -> Result<Node> {
        let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let position = self.position(event_start);

        let node = self.stack.pop().ok_or_else(|| Error::XmlSyntax {
            message: format!("Unexpected closing tag </{}>", found),
            position: Some(position),
        })?;

        // Verify tag names match
        if node.raw_name != found {
            return Err(Error::MismatchedEndTag {
                expected: node.raw_name,
                found,
                position,
            });
        }

        Ok(node.finish(position))
    }

    /// Text goes to the open element's text until it has a child, then to
    /// the tail of its last child. Text outside the root is dropped.
    fn append_text(&mut self, text: &str) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let target = match top.children.last_mut() {
            Some(child) => &mut child.tail,
            None => &mut top.text,
        };
        target.get_or_insert_with(String::new).push_str(text);
    }

    /// Attach a finished element to the open element, or make it the root.
    fn attach(&mut self, node: Node, root: &mut Option<Node>) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => *root = Some(node),
        }
    }

    /// Attach a comment or processing instruction inside the root.
    fn attach_inner(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }
}

fn qualify(resolved: ResolveResult<'_>, local: &[u8], position: Position) -> Result<QName> {
    let local = String::from_utf8_lossy(local);
    match resolved {
        ResolveResult::Bound(ns) => Ok(QName::with_namespace(
            &String::from_utf8_lossy(ns.as_ref()),
            &local,
        )),
        ResolveResult::Unbound => Ok(QName::new(local.into_owned())),
        ResolveResult::Unknown(prefix) if prefix == b"xml" => {
            Ok(QName::with_namespace(XML_NAMESPACE, &local))
        }
        ResolveResult::Unknown(prefix) => Err(Error::UnboundPrefix {
            prefix: String::from_utf8_lossy(&prefix).into_owned(),
            position,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positions() {
        let root = parse(r#"<a foo="1"><b>hi</b>bye</a>"#).unwrap();
        assert_eq!(root.tag(), Some(&QName::from("a")));
        assert_eq!(root.start, Position::new(1, 0));
        assert_eq!(root.end, Position::new(1, 23));
        assert_eq!(root.get_attribute("foo"), Some(&AttrValue::from("1")));

        let b = &root.children[0];
        assert_eq!(b.start, Position::new(1, 11));
        assert_eq!(b.end, Position::new(1, 16));
        assert_eq!(b.children.len(), 0);
        assert_eq!(b.text.as_deref(), Some("hi"));
        assert_eq!(b.tail.as_deref(), Some("bye"));
    }

    #[test]
    fn test_empty_element_ends_at_start() {
        let root = parse("<a>\n  <br/>\n</a>").unwrap();
        let br = &root.children[0];
        assert_eq!(br.start, Position::new(2, 2));
        assert_eq!(br.end, br.start);
        assert_eq!(root.text.as_deref(), Some("\n  "));
        assert_eq!(br.tail.as_deref(), Some("\n"));
        assert_eq!(root.end, Position::new(3, 0));
    }

    #[test]
    fn test_namespaces_resolved_to_clark_notation() {
        let root = parse(
            r#"<x:root xmlns:x="urn:x" xmlns="urn:d"><item x:id="1" plain="2"/></x:root>"#,
        )
        .unwrap();
        assert_eq!(root.tag().unwrap().as_str(), "{urn:x}root");
        assert!(root.attributes.is_empty());

        let item = &root.children[0];
        assert_eq!(item.tag().unwrap().as_str(), "{urn:d}item");
        assert_eq!(item.attributes[0].0.as_str(), "{urn:x}id");
        assert_eq!(item.attributes[1].0.as_str(), "plain");
    }

    #[test]
    fn test_xml_prefix_is_predeclared() {
        let root = parse(r#"<a xml:lang="en"/>"#).unwrap();
        assert_eq!(
            root.attributes[0].0,
            QName::with_namespace(XML_NAMESPACE, "lang")
        );
    }

    #[test]
    fn test_unbound_prefix() {
        let err = parse("<a><p:b/></a>").unwrap_err();
        assert!(matches!(err, Error::UnboundPrefix { .. }), "{err}");
    }

    #[test]
    fn test_entities_are_unescaped() {
        let root = parse(r#"<a t="&quot;x&quot;">1 &lt; 2 &amp;&#65;</a>"#).unwrap();
        assert_eq!(root.text.as_deref(), Some("1 < 2 &A"));
        assert_eq!(root.get_attribute("t"), Some(&AttrValue::from("\"x\"")));
    }

    #[test]
    fn test_cdata_folds_into_text() {
        let root = parse("<a>x<![CDATA[<y>]]>z</a>").unwrap();
        assert_eq!(root.text.as_deref(), Some("x<y>z"));
    }

    #[test]
    fn test_comments_dropped_by_default() {
        let root = parse("<a>one<!-- c -->two</a>").unwrap();
        assert!(root.children.is_empty());
        assert_eq!(root.text.as_deref(), Some("onetwo"));
    }

    #[test]
    fn test_comments_and_pis_inserted_when_requested() {
        let options = ParseOptions {
            insert_comments: true,
            insert_pis: true,
        };
        let root = parse_with_options("<a>one<!-- c -->two<?pi data?></a>", &options).unwrap();
        assert_eq!(root.text.as_deref(), Some("one"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].kind, NodeKind::Comment);
        assert_eq!(root.children[0].text.as_deref(), Some(" c "));
        assert_eq!(root.children[0].start, Position::new(1, 6));
        assert_eq!(root.children[0].tail.as_deref(), Some("two"));
        assert_eq!(root.children[1].kind, NodeKind::ProcessingInstruction);
        assert_eq!(root.children[1].text.as_deref(), Some("pi data"));
    }

    #[test]
    fn test_prolog_is_skipped() {
        let root = parse("<?xml version=\"1.0\"?>\n<!-- top -->\n<a/>\n").unwrap();
        assert_eq!(root.start, Position::new(3, 0));
        assert_eq!(root.tail, None);
    }

    #[test]
    fn test_empty_document_error() {
        assert!(matches!(parse("").unwrap_err(), Error::EmptyDocument));
        assert!(matches!(parse("  \n").unwrap_err(), Error::EmptyDocument));
    }

    #[test]
    fn test_multiple_roots_error() {
        let err = parse("<a/>\n<b/>").unwrap_err();
        match err {
            Error::MultipleRoots { position } => assert_eq!(position, Position::new(2, 0)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mismatched_tags_error() {
        assert!(parse("<a><b></a>").is_err());
    }

    #[test]
    fn test_unclosed_element_error() {
        assert!(parse("<a><b></b>").is_err());
    }
}
