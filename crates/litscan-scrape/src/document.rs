//! Parsed response documents and tag-based field lookup.
//!
//! Responses are parsed into a small owned element tree with quick-xml.
//! `Markup` documents (info and search pages) are read leniently: tag and
//! attribute names are case-folded, mismatched end tags are tolerated, and a
//! parse error keeps whatever was read before it. `Xml` documents (article
//! sets) are strict and case-sensitive.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::warn;

/// Why a response body could not be turned into a [`Document`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("parse error at byte {position}: {reason}")]
    Syntax { position: u64, reason: String },

    #[error("bad text at byte {position}: {reason}")]
    Text { position: u64, reason: String },

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("document contains no elements")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markup,
    Xml,
}

#[derive(Debug, Clone, PartialEq)]
enum Child {
    Element(Node),
    Text(String),
}

/// One element of a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Child>,
    fold_case: bool,
}

impl Node {
    fn new(name: String, attrs: Vec<(String, String)>, fold_case: bool) -> Self {
        Self { name, attrs, children: Vec::new(), fold_case }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, tag: &str) -> bool {
        if self.fold_case {
            self.name.eq_ignore_ascii_case(tag)
        } else {
            self.name == tag
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| if self.fold_case { k.eq_ignore_ascii_case(key) } else { k == key })
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Child::Text(t) => out.push_str(t),
                Child::Element(e) => e.collect_text(out),
            }
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|c| match c {
            Child::Element(e) => Some(e),
            Child::Text(_) => None,
        })
    }

    /// First descendant (document order) named `tag`.
    pub fn find_first(&self, tag: &str) -> Option<&Node> {
        for child in self.elements() {
            if child.matches(tag) {
                return Some(child);
            }
            if let Some(found) = child.find_first(tag) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants (document order) named `tag`.
    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a Node> {
        let mut out = Vec::new();
        self.collect_all(tag, &mut out);
        out
    }

    fn collect_all<'a>(&'a self, tag: &str, out: &mut Vec<&'a Node>) {
        for child in self.elements() {
            if child.matches(tag) {
                out.push(child);
            }
            child.collect_all(tag, out);
        }
    }
}

/// A parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
    format: DocumentFormat,
}

impl Document {
    pub fn parse(body: &str, format: DocumentFormat) -> Result<Self, ParseError> {
        let fold_case = format == DocumentFormat::Markup;
        let mut reader = Reader::from_str(body);
        reader.config_mut().check_end_names = !fold_case;

        let mut stack: Vec<Node> = vec![Node::new("#document".to_string(), vec![], fold_case)];

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(open_element(e, fold_case)),
                Ok(Event::Empty(ref e)) => {
                    let node = open_element(e, fold_case);
                    push_child(&mut stack, Child::Element(node));
                }
                Ok(Event::End(ref e)) => {
                    let name = decode_name(e.name().as_ref(), fold_case);
                    close_element(&mut stack, &name);
                }
                Ok(Event::Text(ref e)) => {
                    let text = match e.unescape() {
                        Ok(t) => t.into_owned(),
                        Err(err) if fold_case => {
                            warn!("Unescape failed in markup text, keeping raw: {}", err);
                            String::from_utf8_lossy(e).into_owned()
                        }
                        Err(err) => {
                            return Err(ParseError::Text {
                                position: reader.buffer_position() as u64,
                                reason: err.to_string(),
                            })
                        }
                    };
                    push_child(&mut stack, Child::Text(text));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_child(&mut stack, Child::Text(text));
                }
                Ok(Event::Eof) => break,
                Err(e) if fold_case => {
                    warn!("Markup parse stopped at {}: {}", reader.buffer_position(), e);
                    break;
                }
                Err(e) => {
                    return Err(ParseError::Syntax {
                        position: reader.buffer_position() as u64,
                        reason: e.to_string(),
                    })
                }
                // declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if stack.len() > 1 && !fold_case {
            return Err(ParseError::Unclosed(stack[stack.len() - 1].name.clone()));
        }
        while stack.len() > 1 {
            if let Some(node) = stack.pop() {
                push_child(&mut stack, Child::Element(node));
            }
        }

        let root = stack.pop().ok_or(ParseError::Empty)?;
        if root.elements().next().is_none() {
            return Err(ParseError::Empty);
        }

        Ok(Self { root, format })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

fn decode_name(raw: &[u8], fold_case: bool) -> String {
    let name = String::from_utf8_lossy(raw).into_owned();
    if fold_case { name.to_ascii_lowercase() } else { name }
}

fn open_element(e: &BytesStart<'_>, fold_case: bool) -> Node {
    let name = decode_name(e.name().as_ref(), fold_case);
    let attrs = e
        .attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = decode_name(a.key.as_ref(), fold_case);
            let value = a
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            (key, value)
        })
        .collect();
    Node::new(name, attrs, fold_case)
}

fn push_child(stack: &mut [Node], child: Child) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(child);
    }
}

fn close_element(stack: &mut Vec<Node>, name: &str) {
    // Markup may close an element that was never opened; ignore those.
    let Some(depth) = stack.iter().rposition(|n| n.name == name) else {
        return;
    };
    if depth == 0 {
        return;
    }
    while stack.len() > depth {
        if let Some(node) = stack.pop() {
            push_child(stack, Child::Element(node));
        }
    }
}

// ── Field extraction capability ──────────────────────────────────────────────

/// Trimmed text of the first descendant named `tag`; `None` if absent.
pub fn extract_first(node: &Node, tag: &str) -> Option<String> {
    node.find_first(tag).map(|n| n.text().trim().to_string())
}

/// Every descendant named `tag`, in document order.
pub fn extract_all<'a>(node: &'a Node, tag: &str) -> Vec<&'a Node> {
    node.find_all(tag)
}

/// The first descendant named `tag` itself, for further navigation.
pub fn extract_raw<'a>(node: &'a Node, tag: &str) -> Option<&'a Node> {
    node.find_first(tag)
}
