//! Minimal element tree over quick-xml events and section lookup for
//! full-text article XML.

use crate::errors::{AppError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Element node; tag names are stored lower-cased
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<XmlElement> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = vec![XmlElement::default()];

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from(&start)),
                Event::Empty(start) => {
                    let element = element_from(&start);
                    push_child(&mut stack, XmlNode::Element(element));
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(AppError::Xml {
                            message: "unbalanced closing tag".to_string(),
                        });
                    }
                    if let Some(element) = stack.pop() {
                        push_child(&mut stack, XmlNode::Element(element));
                    }
                }
                Event::Text(text) => {
                    let decoded = text
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&*text).into_owned());
                    push_child(&mut stack, XmlNode::Text(decoded));
                }
                Event::CData(data) => {
                    let decoded = String::from_utf8_lossy(&*data).into_owned();
                    push_child(&mut stack, XmlNode::Text(decoded));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(AppError::Xml {
                message: "unexpected end of document".to_string(),
            });
        }
        let document = stack.pop().unwrap_or_default();
        let root = document.child_elements().next().cloned();
        root.ok_or_else(|| AppError::Xml {
            message: "document has no root element".to_string(),
        })
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given tag
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.name == name)
    }

    /// Descendants with the given tag in document order, excluding `self`
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// All text beneath this element, concatenated
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.append_text(out),
            }
        }
    }

    /// Trimmed text of every `p` beneath this element, one per line
    pub fn paragraph_text(&self) -> String {
        self.descendants("p")
            .iter()
            .map(|p| p.text().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn element_from(start: &BytesStart<'_>) -> XmlElement {
    XmlElement {
        name: String::from_utf8_lossy(start.local_name().as_ref()).to_lowercase(),
        children: Vec::new(),
    }
}

fn push_child(stack: &mut [XmlElement], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Text of the section named `section`, or `None` when nothing matches.
///
/// Lookup order: elements whose tag is the lower-cased name (e.g.
/// `<abstract>`), then the first `sec` whose `title` equals the name,
/// then the first `sec` whose title contains it.
pub fn find_section(root: &XmlElement, section: &str) -> Option<String> {
    let target = section.trim().to_lowercase();
    if target.is_empty() {
        return None;
    }

    if !target.contains(char::is_whitespace) {
        let mut direct: Vec<&XmlElement> = Vec::new();
        if root.name == target {
            direct.push(root);
        }
        direct.extend(root.descendants(&target));

        let text = direct
            .iter()
            .map(|e| e.paragraph_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if !text.is_empty() {
            return Some(text);
        }
    }

    let sections = root.descendants("sec");
    fn heading(sec: &XmlElement) -> Option<String> {
        sec.child("title").map(|t| t.text().trim().to_lowercase())
    }

    let best = sections
        .iter()
        .find(|sec| heading(sec).as_deref() == Some(target.as_str()))
        .or_else(|| {
            sections
                .iter()
                .find(|sec| heading(sec).is_some_and(|h| h.contains(&target)))
        })?;

    let text = best.paragraph_text();
    (!text.is_empty()).then_some(text)
}
