//! Minimal in-memory XML document model on top of quick-xml
//!
//! Master and detail documents are small, so they are read into an
//! [`Element`] tree and written back from one. Comments, processing
//! instructions and doctypes are dropped on read.

use std::io;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ModestError, Result};

const INDENT_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// `<tag>text</tag>`, or `<tag/>` when `text` is empty
    pub fn with_text(tag: impl Into<String>, text: &str) -> Self {
        let mut element = Self::new(tag);
        if !text.is_empty() {
            element.children.push(Node::Text(text.to_string()));
        }
        element
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Direct element children in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.elements().find(|el| el.tag == tag)
    }

    /// First element below this one with the given tag, in document order
    pub fn find_descendant(&self, tag: &str) -> Option<&Element> {
        for el in self.elements() {
            if el.tag == tag {
                return Some(el);
            }
            if let Some(found) = el.find_descendant(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated direct text content; `None` when there is no text node
    pub fn text(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for node in &self.children {
            if let Node::Text(t) = node {
                text.get_or_insert_with(String::new).push_str(t);
            }
        }
        text
    }
}

/// Parses a complete document and returns its root element
pub fn parse(input: &str, source_name: &str) -> Result<Element> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ModestError::parse(source_name, format!("{e} (byte {})", reader.buffer_position()))
        })?;
        match event {
            Event::Start(e) => stack.push(start_element(&e, source_name)?),
            Event::Empty(e) => {
                let element = start_element(&e, source_name)?;
                attach(&mut stack, &mut root, element, source_name)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ModestError::parse(source_name, "unexpected closing tag"))?;
                attach(&mut stack, &mut root, element, source_name)?;
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| ModestError::parse(source_name, err))?;
                push_text(&mut stack, text.into_owned(), source_name)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&mut stack, text, source_name)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ModestError::parse(
            source_name,
            format!("unclosed element <{}>", open.tag),
        ));
    }
    root.ok_or_else(|| ModestError::parse(source_name, "document has no root element"))
}

fn start_element(start: &BytesStart<'_>, source_name: &str) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ModestError::parse(source_name, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ModestError::parse(source_name, e))?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    source_name: &str,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.push(element);
    } else if root.is_some() {
        return Err(ModestError::parse(source_name, "more than one root element"));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: String, source_name: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Text(text)),
        None if text.trim().is_empty() => {}
        None => return Err(ModestError::parse(source_name, "text outside the root element")),
    }
    Ok(())
}

/// Serialises a document as indented UTF-8 with an XML declaration
pub fn to_pretty_bytes(root: &Element) -> io::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_element(&mut writer, root)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_element<W: io::Write>(writer: &mut Writer<W>, element: &Element) -> io::Result<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(el) => write_element(writer, el)?,
            Node::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.tag.as_str())))
}

fn emit<W: io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> io::Result<()> {
    writer
        .write_event(event)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let doc = parse(
            r#"<?xml version="1.0"?><root id="r1"><name>Proj</name><!-- c --><goal id="g1"><name>A &amp; B</name></goal></root>"#,
            "test",
        )
        .unwrap();
        assert_eq!(doc.tag, "root");
        assert_eq!(doc.attribute("id"), Some("r1"));
        assert_eq!(doc.child("name").unwrap().text().as_deref(), Some("Proj"));
        let goal = doc.child("goal").unwrap();
        assert_eq!(goal.child("name").unwrap().text().as_deref(), Some("A & B"));
    }

    #[test]
    fn test_empty_element_has_no_text() {
        let doc = parse("<goal id=\"g\"><description/></goal>", "test").unwrap();
        assert_eq!(doc.child("description").unwrap().text(), None);
    }

    #[test]
    fn test_cdata_is_text() {
        let doc = parse("<a><b><![CDATA[x < y]]></b></a>", "test").unwrap();
        assert_eq!(doc.child("b").unwrap().text().as_deref(), Some("x < y"));
    }

    #[test]
    fn test_find_descendant_is_document_order() {
        let doc = parse("<a><b><c>1</c></b><c>2</c></a>", "test").unwrap();
        assert_eq!(doc.find_descendant("c").unwrap().text().as_deref(), Some("1"));
        assert_eq!(doc.child("c").unwrap().text().as_deref(), Some("2"));
    }

    #[test]
    fn test_malformed_input() {
        for bad in ["<a><b></a>", "<a>", "", "<a/><b/>", "plain text", "<a x=1/>"] {
            let err = parse(bad, "bad.xml").unwrap_err();
            assert!(matches!(err, ModestError::Parse { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn test_pretty_output() {
        let mut root = Element::new("root");
        root.set_attribute("id", "r1");
        root.push(Element::with_text("name", "P & Q"));
        let mut goal = Element::new("goal");
        goal.set_attribute("id", "g1");
        goal.push(Element::with_text("name", ""));
        root.push(goal);

        let text = String::from_utf8(to_pretty_bytes(&root).unwrap()).unwrap();
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
            <root id=\"r1\">\n    \
            <name>P &amp; Q</name>\n    \
            <goal id=\"g1\">\n        \
            <name/>\n    \
            </goal>\n\
            </root>\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_write_then_parse_preserves_multiline_text() {
        let mut root = Element::new("goal");
        root.push(Element::with_text("description", "line one\n  line two <b>"));
        let bytes = to_pretty_bytes(&root).unwrap();
        let doc = parse(std::str::from_utf8(&bytes).unwrap(), "test").unwrap();
        assert_eq!(
            doc.child("description").unwrap().text().as_deref(),
            Some("line one\n  line two <b>")
        );
    }
}
