//! Serialization back to the input markup
//!
//! The output uses the vocabulary [`crate::parser::MathParser`] reads, so a
//! list written here and parsed again has the same text form.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::cell::{CellId, CellKind, FracStyle, SumStyle, TextKind, TextStyle};
use crate::error::{WorksheetError, WorksheetResult};
use crate::markup::{attrs, tags};
use crate::tree::CellTree;

fn write_error(e: impl ToString) -> WorksheetError {
    WorksheetError::Export(e.to_string())
}

/// Tag a cell's style is written as, when the style comes from context
fn context_tag(style: TextStyle) -> Option<&'static str> {
    match style {
        TextStyle::Label | TextStyle::UserLabel => Some(tags::LABEL),
        TextStyle::Input => Some(tags::INPUT),
        TextStyle::Error => Some(tags::ERROR),
        TextStyle::Title => Some(tags::TITLE),
        TextStyle::Section => Some(tags::SECTION),
        TextStyle::Subsection => Some(tags::SUBSECTION),
        TextStyle::Subsubsection => Some(tags::SUBSUBSECTION),
        _ => None,
    }
}

fn leaf_tag(kind: TextKind) -> &'static str {
    match kind {
        TextKind::Variable => tags::IDENTIFIER,
        TextKind::Number => tags::NUMBER,
        TextKind::Operator => tags::OPERATOR,
        TextKind::String => tags::STRING,
        TextKind::Text => tags::TEXT,
        TextKind::Space => tags::SPACE,
    }
}

pub struct XmlWriter<'t, W: Write> {
    writer: Writer<W>,
    tree: &'t CellTree,
}

impl<'t, W: Write> XmlWriter<'t, W> {
    pub fn new(inner: W, tree: &'t CellTree) -> Self {
        Self {
            writer: Writer::new(inner),
            tree,
        }
    }

    /// Write a list; runs of highlighted cells are grouped in `<hl>`
    pub fn write_list(&mut self, head: CellId, in_highlight: bool) -> WorksheetResult<()> {
        let tree = self.tree;
        let mut open_highlight = false;
        for id in tree.list(head) {
            let highlighted = !in_highlight && tree[id].highlight;
            if highlighted && !open_highlight {
                self.start(BytesStart::new(tags::HIGHLIGHT))?;
                open_highlight = true;
            } else if !highlighted && open_highlight {
                self.end(tags::HIGHLIGHT)?;
                open_highlight = false;
            }
            self.write_cell(id, in_highlight || highlighted)?;
        }
        if open_highlight {
            self.end(tags::HIGHLIGHT)?;
        }
        Ok(())
    }

    /// A child list as a single element
    fn write_child(&mut self, head: CellId, in_highlight: bool) -> WorksheetResult<()> {
        if self.tree.list_len(head) > 1 {
            self.start(BytesStart::new(tags::ROW))?;
            self.write_list(head, in_highlight)?;
            self.end(tags::ROW)
        } else {
            self.write_list(head, in_highlight)
        }
    }

    fn write_children(&mut self, heads: &[CellId], in_highlight: bool) -> WorksheetResult<()> {
        for &head in heads {
            self.write_child(head, in_highlight)?;
        }
        Ok(())
    }

    /// Common attributes of a cell, for its outermost element
    fn common_attributes(&self, id: CellId) -> Vec<(&'static str, String)> {
        let cell = &self.tree[id];
        let mut out = Vec::new();
        let tag_breaks = cell.style.is_label() || cell.style.is_heading();
        if cell.force_break_line != tag_breaks {
            out.push((attrs::BREAKLINE, cell.force_break_line.to_string()));
        }
        if let Some(tooltip) = &cell.tooltip {
            out.push((attrs::TOOLTIP, tooltip.clone()));
        }
        if let Some(alt) = &cell.alt_copy_text {
            out.push((attrs::ALT_COPY, alt.clone()));
        }
        if cell.is_hidden {
            out.push((attrs::HIDDEN, "true".to_string()));
        }
        out
    }

    /// Write a single cell, wrapped in its context tag if it has one
    pub fn write_cell(&mut self, id: CellId, in_highlight: bool) -> WorksheetResult<()> {
        let tree = self.tree;
        let cell = &tree[id];
        let common = self.common_attributes(id);
        let Some(wrapper) = context_tag(cell.style) else {
            return self.write_element(id, common, in_highlight);
        };

        let mut start = BytesStart::new(wrapper);
        if let (TextStyle::UserLabel, Some(label)) = (cell.style, cell.kind.as_text().and_then(|t| t.user_label.as_deref())) {
            start.push_attribute(("userdefined", "yes"));
            start.push_attribute(("userdefinedlabel", label));
        }
        for (key, value) in &common {
            start.push_attribute((*key, value.as_str()));
        }
        self.start(start)?;
        self.write_element(id, Vec::new(), in_highlight)?;
        self.end(wrapper)
    }

    fn write_element(
        &mut self,
        id: CellId,
        common: Vec<(&'static str, String)>,
        in_highlight: bool,
    ) -> WorksheetResult<()> {
        let tree = self.tree;
        let (name, mut extra): (&str, Vec<(&str, String)>) = match &tree[id].kind {
            CellKind::Text(text) => (leaf_tag(text.kind), Vec::new()),
            CellKind::Image(image) => (
                tags::IMAGE,
                vec![("width", image.width.to_string()), ("height", image.height.to_string())],
            ),
            CellKind::Fraction(frac) if frac.style == FracStyle::Choose => {
                (tags::FRAC, vec![("choose", "yes".to_string())])
            }
            CellKind::Fraction(_) => (tags::FRAC, Vec::new()),
            CellKind::Exponent(expt) if expt.is_matrix => (tags::SUP, vec![("mat", "yes".to_string())]),
            CellKind::Exponent(_) => (tags::SUP, Vec::new()),
            CellKind::Subscript { .. } => (tags::SUB, Vec::new()),
            CellKind::SubSup { .. } => (tags::SUBSUP, Vec::new()),
            CellKind::Integral(int) if !int.is_definite() => (tags::INT, vec![("def", "false".to_string())]),
            CellKind::Integral(_) => (tags::INT, Vec::new()),
            CellKind::Sum(sum) if sum.style == SumStyle::Product => {
                (tags::SUM, vec![("type", "prod".to_string())])
            }
            CellKind::Sum(_) => (tags::SUM, Vec::new()),
            CellKind::Limit { .. } => (tags::LIMIT, Vec::new()),
            CellKind::Abs(_) => (tags::ABS, Vec::new()),
            CellKind::Conjugate(_) => (tags::CONJ, Vec::new()),
            CellKind::Sqrt(_) => (tags::SQRT, Vec::new()),
            CellKind::Paren { print: false, .. } => (tags::PAREN, vec![("print", "no".to_string())]),
            CellKind::Paren { .. } => (tags::PAREN, Vec::new()),
            CellKind::Function { .. } => (tags::FUN, Vec::new()),
            CellKind::At { .. } => (tags::AT, Vec::new()),
            CellKind::Diff { .. } => (tags::DIFF, Vec::new()),
            CellKind::Matrix { .. } => (tags::TABLE, Vec::new()),
        };
        extra.extend(common);
        let mut start = BytesStart::new(name);
        for (key, value) in &extra {
            start.push_attribute((*key, value.as_str()));
        }

        match &tree[id].kind {
            CellKind::Text(text) if text.kind == TextKind::Space => {
                return self.writer.write_event(Event::Empty(start)).map(|_| ()).map_err(write_error);
            }
            CellKind::Text(text) => {
                self.start(start)?;
                self.text(&text.value)?;
            }
            CellKind::Image(image) => {
                self.start(start)?;
                self.text(&image.source)?;
            }
            CellKind::Fraction(frac) => {
                self.start(start)?;
                self.write_children(&[frac.num, frac.den], in_highlight)?;
            }
            CellKind::Exponent(expt) => {
                self.start(start)?;
                self.write_children(&[expt.base, expt.power], in_highlight)?;
            }
            CellKind::Subscript { base, index } | CellKind::At { base, index } => {
                self.start(start)?;
                self.write_children(&[*base, *index], in_highlight)?;
            }
            CellKind::SubSup { base, sub, sup } => {
                self.start(start)?;
                self.write_children(&[*base, *sub, *sup], in_highlight)?;
            }
            CellKind::Integral(int) => {
                self.start(start)?;
                if let Some((under, over)) = int.limits {
                    self.write_children(&[under, over], in_highlight)?;
                }
                self.write_children(&[int.base, int.var], in_highlight)?;
            }
            CellKind::Sum(sum) => {
                self.start(start)?;
                self.write_children(&[sum.under, sum.over, sum.base], in_highlight)?;
            }
            CellKind::Limit { name, under, base } => {
                self.start(start)?;
                self.write_children(&[*name, *under, *base], in_highlight)?;
            }
            CellKind::Abs(d) | CellKind::Conjugate(d) | CellKind::Sqrt(d) => {
                self.start(start)?;
                self.write_list(d.inner, in_highlight)?;
            }
            CellKind::Paren { delimited, .. } => {
                self.start(start)?;
                self.write_list(delimited.inner, in_highlight)?;
            }
            CellKind::Function { name, arg } => {
                self.start(start)?;
                self.write_children(&[*name, *arg], in_highlight)?;
            }
            CellKind::Diff { diff, base } => {
                self.start(start)?;
                self.write_child(*diff, in_highlight)?;
                self.write_list(*base, in_highlight)?;
            }
            CellKind::Matrix { rows } => {
                self.start(start)?;
                for row in rows {
                    self.start(BytesStart::new(tags::TABLE_ROW))?;
                    for &entry in row {
                        self.start(BytesStart::new(tags::TABLE_CELL))?;
                        self.write_list(entry, in_highlight)?;
                        self.end(tags::TABLE_CELL)?;
                    }
                    self.end(tags::TABLE_ROW)?;
                }
            }
        }
        self.end(name)
    }

    fn text(&mut self, text: &str) -> WorksheetResult<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
        Ok(())
    }

    fn start(&mut self, start: BytesStart<'_>) -> WorksheetResult<()> {
        self.writer.write_event(Event::Start(start)).map_err(write_error)?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> WorksheetResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_error)?;
        Ok(())
    }
}

/// Markup for the list at `head`
pub fn list_to_xml(tree: &CellTree, head: CellId) -> WorksheetResult<String> {
    let mut buffer = Vec::new();
    XmlWriter::new(&mut buffer, tree).write_list(head, false)?;
    Ok(String::from_utf8(buffer)?)
}

/// Markup for a single cell
pub fn to_xml(tree: &CellTree, id: CellId) -> WorksheetResult<String> {
    let mut buffer = Vec::new();
    XmlWriter::new(&mut buffer, tree).write_cell(id, false)?;
    Ok(String::from_utf8(buffer)?)
}
