// In-memory XML element tree for Classic API payloads.
//
// Parsing runs over quick-xml's pull reader and serialization over its
// writer. The tree keeps element text but drops comments, processing
// instructions, and the XML declaration; payloads are small documents
// like `<package><id>5</id><name>Foo</name></package>`.

use std::fmt;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

/// XML parse or serialization failure.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not a well-formed document.
    #[error("{0}")]
    Malformed(String),

    /// The tree could not be written out.
    #[error("failed to serialize XML: {0}")]
    Write(String),
}

/// A single XML element with its attributes, text, and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder: set the element text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Find the first descendant matching a `/`-separated tag path,
    /// e.g. `"general/name"`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(self, |node, step| {
                node.children.iter().find(|child| child.tag == step)
            })
    }

    /// Text of the element at `path`, if it exists and has text.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(|e| e.text.as_deref())
    }

    /// All direct children with the given tag.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    // ── Parsing ──────────────────────────────────────────────────────

    /// Parse a document and return its root element.
    ///
    /// Rejects empty input, unclosed or mismatched tags, text outside the
    /// root, and multiple roots.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| malformed(&reader, &e))?;

            match event {
                Event::Start(start) => {
                    ensure_single_root(root.as_ref())?;
                    stack.push(open_element(&start)?);
                }
                Event::Empty(start) => {
                    ensure_single_root(root.as_ref())?;
                    let element = open_element(&start)?;
                    close_element(element, &mut stack, &mut root);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Malformed("unexpected closing tag".into()))?;
                    close_element(element, &mut stack, &mut root);
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| malformed(&reader, &e))?;
                    append_text(&mut stack, &text)?;
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&raw))?;
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Malformed(format!(
                "unclosed element <{}>",
                open.tag
            )));
        }

        root.ok_or_else(|| XmlError::Malformed("no root element".into()))
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Serialize the tree without an XML declaration.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.tag.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(write_err)?;
            return Ok(());
        }

        writer.write_event(Event::Start(start)).map_err(write_err)?;
        if let Some(ref text) = self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_err)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.tag.as_str())))
            .map_err(write_err)?;
        Ok(())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes().map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}

// ── Parse helpers ────────────────────────────────────────────────────

fn malformed(reader: &Reader<&[u8]>, err: &impl fmt::Display) -> XmlError {
    XmlError::Malformed(format!("{err} at byte {}", reader.buffer_position()))
}

fn write_err(err: impl fmt::Display) -> XmlError {
    XmlError::Write(err.to_string())
}

fn ensure_single_root(root: Option<&Element>) -> Result<(), XmlError> {
    match root {
        Some(existing) => Err(XmlError::Malformed(format!(
            "content after root element <{}>",
            existing.tag
        ))),
        None => Ok(()),
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Malformed(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn close_element(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [Element], text: &str) -> Result<(), XmlError> {
    if text.is_empty() {
        return Ok(());
    }
    let Some(current) = stack.last_mut() else {
        return Err(XmlError::Malformed(format!(
            "text outside of root element: {:?}",
            text.chars().take(40).collect::<String>()
        )));
    };
    current.text.get_or_insert_with(String::new).push_str(text);
    Ok(())
}
