//! Custom-object definition documents.
//!
//! Retrieved `.object` files are parsed once into a small element tree so
//! fields can be moved between documents structurally. Serialization is
//! canonical: an XML declaration, four-space indentation, one element per
//! line, text-only elements kept on a single line.
//!
//! Re-serialising is not byte-preserving for markup that means the same
//! thing: `&quot;` and `&apos;` in text come back as literal quotes, and an
//! empty `<x></x>` pair comes back as `<x/>`. Every staged document goes
//! through the same writer, so the mirror stays stable from run to run.

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use gulp_core::{EntityName, Namespace};

use crate::error::DocumentError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const INDENT: &str = "    ";
const FIELDS: &str = "fields";
const FULL_NAME: &str = "fullName";
const CUSTOM_FIELD: &str = "CustomField";
const XMLNS: &str = "xmlns";

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    /// Trimmed text content of the first child element called `name`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|el| el.text().trim().to_string())
    }

    /// Concatenated text and CDATA content of this element.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn has_element_children(&self) -> bool {
        self.children
            .iter()
            .any(|node| matches!(node, XmlNode::Element(_)))
    }

    /// Whitespace between child elements is layout, not content.
    fn drop_layout_whitespace(&mut self) {
        if self.has_element_children() {
            self.children
                .retain(|node| !matches!(node, XmlNode::Text(t) if t.trim().is_empty()));
        }
    }

    /// Render as a standalone document.
    pub fn to_document(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        self.write_to(&mut out, 0);
        out
    }

    fn write_to(&self, out: &mut String, depth: usize) {
        let indent = INDENT.repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        if self.has_element_children() {
            out.push('\n');
            for child in &self.children {
                if !matches!(child, XmlNode::Element(_)) {
                    out.push_str(&INDENT.repeat(depth + 1));
                    child.write_to(out, depth + 1);
                    out.push('\n');
                } else {
                    child.write_to(out, depth + 1);
                }
            }
            out.push_str(&indent);
        } else {
            for child in &self.children {
                child.write_to(out, 0);
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

impl XmlNode {
    fn write_to(&self, out: &mut String, depth: usize) {
        match self {
            XmlNode::Element(el) => el.write_to(out, depth),
            XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
            XmlNode::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(data);
                out.push_str("]]>");
            }
            XmlNode::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse `xml` into its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from(&start)?),
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Shape("unbalanced end tag".to_string()))?;
                element.drop_layout_whitespace();
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let bytes = data.into_inner();
                    parent
                        .children
                        .push(XmlNode::CData(std::str::from_utf8(&bytes)?.to_string()));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Comment(std::str::from_utf8(&comment)?.to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DocumentError::Shape(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| DocumentError::Shape("document has no root element".to_string()))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let mut element = XmlElement::new(std::str::from_utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::Shape("multiple root elements".to_string())),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Object documents
// ---------------------------------------------------------------------------

/// A parsed `CustomObject` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDocument {
    root: XmlElement,
}

/// Result of [`ObjectDocument::split_alien_fields`].
#[derive(Debug)]
pub struct ObjectSplit {
    /// The object with every alien field removed.
    pub object: ObjectDocument,
    pub alien_fields: Vec<AlienField>,
}

/// A field moved out of its object into a standalone `CustomField` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlienField {
    /// The field's name with the home namespace applied.
    pub name: EntityName,
    pub element: XmlElement,
}

impl AlienField {
    pub fn to_xml(&self) -> String {
        self.element.to_document()
    }
}

impl ObjectDocument {
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        Ok(Self {
            root: parse_document(xml)?,
        })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Names of the `fields` entries, as written in the document.
    pub fn field_names(&self) -> Vec<String> {
        self.root
            .elements()
            .filter(|el| el.name == FIELDS)
            .filter_map(|el| el.child_text(FULL_NAME))
            .collect()
    }

    /// Add `<name>value</name>` under the root unless such a child exists.
    ///
    /// The new element goes before the first sibling that sorts after it, so
    /// alphabetically ordered documents stay ordered. Returns whether the
    /// document changed.
    pub fn ensure_child_text(&mut self, name: &str, value: &str) -> bool {
        if self.root.child(name).is_some() {
            return false;
        }
        let mut element = XmlElement::new(name);
        element.children.push(XmlNode::Text(value.to_string()));
        let position = self
            .root
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.name.as_str() > name))
            .unwrap_or(self.root.children.len());
        self.root.children.insert(position, XmlNode::Element(element));
        true
    }

    /// Move every field not owned by `owner` out of the document.
    ///
    /// Field names are resolved with `home` as their default namespace.
    /// Entries that are not custom fields (standard fields, unknown suffixes)
    /// stay with the object.
    pub fn split_alien_fields(
        mut self,
        owner: Option<&Namespace>,
        home: Option<&Namespace>,
    ) -> Result<ObjectSplit, DocumentError> {
        let xmlns = self.root.attribute(XMLNS).map(str::to_string);
        let mut kept = Vec::with_capacity(self.root.children.len());
        let mut alien_fields = Vec::new();

        for node in std::mem::take(&mut self.root.children) {
            match node {
                XmlNode::Element(element) if element.name == FIELDS => {
                    match alien_name(&element, owner, home)? {
                        Some(name) => alien_fields.push(AlienField {
                            name,
                            element: into_custom_field(element, xmlns.as_deref()),
                        }),
                        None => kept.push(XmlNode::Element(element)),
                    }
                }
                other => kept.push(other),
            }
        }

        self.root.children = kept;
        Ok(ObjectSplit {
            object: self,
            alien_fields,
        })
    }

    pub fn to_xml(&self) -> String {
        self.root.to_document()
    }
}

fn alien_name(
    field: &XmlElement,
    owner: Option<&Namespace>,
    home: Option<&Namespace>,
) -> Result<Option<EntityName>, DocumentError> {
    let full_name = field
        .child_text(FULL_NAME)
        .ok_or_else(|| DocumentError::Shape("fields entry without fullName".to_string()))?;
    Ok(EntityName::parse_field(&full_name)
        .map(|name| name.with_default_namespace(home))
        .filter(|name| name.namespace.as_ref() != owner))
}

fn into_custom_field(field: XmlElement, xmlns: Option<&str>) -> XmlElement {
    let mut element = XmlElement::new(CUSTOM_FIELD);
    if let Some(xmlns) = xmlns {
        element.attributes.push((XMLNS.to_string(), xmlns.to_string()));
    }
    element.children = field.children;
    element
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
