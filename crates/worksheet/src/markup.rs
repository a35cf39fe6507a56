//! Permissive reader for math markup
//!
//! Builds a small element tree from a markup fragment. The reader keeps
//! text exactly as written and repairs the damage Maxima output sometimes
//! carries: an end tag closes the nearest open element of the same name
//! (closing anything left open inside it), stray end tags are dropped, and
//! elements still open at the end of input are closed there. Only lexical
//! errors are reported.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::WorksheetResult;

/// Tag names of the markup vocabulary
pub mod tags {
    pub const FRAC: &str = "mfrac";
    pub const SUP: &str = "msup";
    pub const SUB: &str = "msub";
    pub const SUBSUP: &str = "msubsup";
    pub const INT: &str = "mint";
    pub const SUM: &str = "msum";
    pub const LIMIT: &str = "mlimit";
    pub const ABS: &str = "mabs";
    pub const CONJ: &str = "mconj";
    pub const SQRT: &str = "msqrt";
    pub const PAREN: &str = "mparen";
    pub const FUN: &str = "mfun";
    pub const AT: &str = "mat";
    pub const DIFF: &str = "mdiff";
    pub const TABLE: &str = "mtable";
    pub const TABLE_ROW: &str = "mtr";
    pub const TABLE_CELL: &str = "mtd";
    pub const IDENTIFIER: &str = "mi";
    pub const NUMBER: &str = "mn";
    pub const OPERATOR: &str = "mo";
    pub const STRING: &str = "ms";
    pub const TEXT: &str = "mtext";
    pub const SPACE: &str = "mspace";
    pub const ROW: &str = "mrow";
    pub const MATH: &str = "math";
    pub const LINE: &str = "mth";
    pub const LABEL: &str = "lbl";
    pub const INPUT: &str = "input";
    pub const ERROR: &str = "error";
    pub const TITLE: &str = "title";
    pub const SECTION: &str = "section";
    pub const SUBSECTION: &str = "subsect";
    pub const SUBSUBSECTION: &str = "subsubsect";
    pub const HIGHLIGHT: &str = "hl";
    pub const IMAGE: &str = "img";
}

/// Attribute names understood on every element
pub mod attrs {
    pub const BREAKLINE: &str = "breakline";
    pub const TOOLTIP: &str = "tooltip";
    pub const ALT_COPY: &str = "altCopy";
    pub const HIDDEN: &str = "hidden";
}

/// Name of the element wrapped around a parsed fragment
pub const ROOT: &str = "#root";

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

impl MarkupNode {
    /// Whitespace-only text carries no content
    pub fn is_significant(&self) -> bool {
        match self {
            MarkupNode::Element(_) => true,
            MarkupNode::Text(text) => !text.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkupElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present with the given value
    pub fn attr_is(&self, key: &str, value: &str) -> bool {
        self.attr(key) == Some(value)
    }

    /// All text below this element, concatenated
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Child elements in order, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &MarkupElement> {
        self.children.iter().filter_map(|child| match child {
            MarkupNode::Element(e) => Some(e),
            MarkupNode::Text(_) => None,
        })
    }

    fn push_text(&mut self, text: &str) {
        if let Some(MarkupNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(MarkupNode::Text(text.to_string()));
        }
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

fn local_name_from_bytes(name: &[u8]) -> String {
    let name_str = String::from_utf8_lossy(name);
    match name_str.find(':') {
        Some(pos) => name_str[pos + 1..].to_string(),
        None => name_str.to_string(),
    }
}

fn element_from_start(e: &BytesStart<'_>) -> MarkupElement {
    let mut element = MarkupElement::new(local_name_from_bytes(e.name().as_ref()));
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        };
        element.attributes.push((key, value));
    }
    element
}

/// Pop the innermost open element into its parent
fn close_top(stack: &mut Vec<MarkupElement>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(element) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(MarkupNode::Element(element));
        }
    }
}

/// Parse a markup fragment into the children of a synthetic [`ROOT`]
/// element
pub fn parse_fragment(markup: &str) -> WorksheetResult<MarkupElement> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    let mut stack = vec![MarkupElement::new(ROOT)];
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(element_from_start(e)),
            Event::Empty(ref e) => {
                let element = element_from_start(e);
                if let Some(top) = stack.last_mut() {
                    top.children.push(MarkupNode::Element(element));
                }
            }
            Event::End(ref e) => {
                let name = local_name_from_bytes(e.name().as_ref());
                match stack.iter().rposition(|open| open.name == name) {
                    Some(depth) if depth > 0 => {
                        while stack.len() > depth {
                            close_top(&mut stack);
                        }
                    }
                    _ => tracing::debug!(tag = %name, "dropped unmatched end tag"),
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape()?;
                if let Some(top) = stack.last_mut() {
                    top.push_text(&text);
                }
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e).to_string();
                if let Some(top) = stack.last_mut() {
                    top.push_text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    Ok(stack.pop().unwrap_or_else(|| MarkupElement::new(ROOT)))
}
