//! Office Math Markup Language transcription
//!
//! Writes the `m:` vocabulary Word uses for equations. A list is split at
//! its hard line breaks into one `m:oMath` per line inside an
//! `m:oMathPara`.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::cell::{CellId, CellKind, FracStyle, SumStyle, TextKind};
use crate::error::{WorksheetError, WorksheetResult};
use crate::layout::display_text;
use crate::tree::CellTree;

/// OMML namespace URI
pub const MATH_NS_URI: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
/// OMML namespace prefix
const MATH_NS: &str = "m";

fn write_error(e: impl ToString) -> WorksheetError {
    WorksheetError::Export(e.to_string())
}

/// Streams cells of a tree as OMML events
pub struct OmmlWriter<'t, W: Write> {
    writer: Writer<W>,
    tree: &'t CellTree,
}

impl<'t, W: Write> OmmlWriter<'t, W> {
    pub fn new(inner: W, tree: &'t CellTree) -> Self {
        Self {
            writer: Writer::new(inner),
            tree,
        }
    }

    /// Write the list at `head` as a paragraph of math objects
    pub fn write_document(&mut self, head: CellId) -> WorksheetResult<()> {
        let mut para = BytesStart::new(format!("{}:oMathPara", MATH_NS));
        para.push_attribute(("xmlns:m", MATH_NS_URI));
        self.writer.write_event(Event::Start(para)).map_err(write_error)?;

        let tree = self.tree;
        let mut line: Vec<CellId> = Vec::new();
        for id in tree.list(head) {
            if tree[id].force_break_line && !line.is_empty() {
                self.write_omath(&line)?;
                line.clear();
            }
            line.push(id);
        }
        self.write_omath(&line)?;

        self.end_element("oMathPara")
    }

    fn write_omath(&mut self, cells: &[CellId]) -> WorksheetResult<()> {
        self.start_element("oMath")?;
        for &id in cells {
            self.write_cell(id)?;
        }
        self.end_element("oMath")
    }

    /// Write every cell of a list in order
    pub fn write_list(&mut self, head: CellId) -> WorksheetResult<()> {
        let tree = self.tree;
        for id in tree.list(head) {
            self.write_cell(id)?;
        }
        Ok(())
    }

    /// `<m:name>` around a list
    fn write_wrapped(&mut self, name: &str, head: CellId) -> WorksheetResult<()> {
        self.start_element(name)?;
        self.write_list(head)?;
        self.end_element(name)
    }

    /// Write a single cell
    pub fn write_cell(&mut self, id: CellId) -> WorksheetResult<()> {
        let tree = self.tree;
        let cell = &tree[id];
        match &cell.kind {
            CellKind::Text(text) => {
                if cell.is_hidden {
                    return Ok(());
                }
                let plain = text.kind != TextKind::Variable || cell.style.is_label();
                match text.kind {
                    TextKind::Space => self.write_run(" ", true),
                    _ => self.write_run(display_text(cell), plain),
                }
            }
            CellKind::Image(_) => self.write_run(" (Graphics) ", true),
            CellKind::Fraction(frac) => {
                let choose = frac.style == FracStyle::Choose;
                if choose {
                    self.start_element("d")?;
                    self.start_element("e")?;
                }
                self.start_element("f")?;
                if choose {
                    self.start_element("fPr")?;
                    self.write_val("type", "noBar")?;
                    self.end_element("fPr")?;
                }
                self.write_wrapped("num", frac.num)?;
                self.write_wrapped("den", frac.den)?;
                self.end_element("f")?;
                if choose {
                    self.end_element("e")?;
                    self.end_element("d")?;
                }
                Ok(())
            }
            CellKind::Exponent(expt) => {
                self.start_element("sSup")?;
                self.write_wrapped("e", expt.base)?;
                self.write_wrapped("sup", expt.power)?;
                self.end_element("sSup")
            }
            CellKind::Subscript { base, index } => {
                self.start_element("sSub")?;
                self.write_wrapped("e", *base)?;
                self.write_wrapped("sub", *index)?;
                self.end_element("sSub")
            }
            CellKind::SubSup { base, sub, sup } => {
                self.start_element("sSubSup")?;
                self.write_wrapped("e", *base)?;
                self.write_wrapped("sub", *sub)?;
                self.write_wrapped("sup", *sup)?;
                self.end_element("sSubSup")
            }
            CellKind::Integral(int) => {
                self.start_element("nary")?;
                self.start_element("naryPr")?;
                self.write_val("chr", "∫")?;
                self.write_val("limLoc", "subSup")?;
                if !int.is_definite() {
                    self.write_val("subHide", "1")?;
                    self.write_val("supHide", "1")?;
                }
                self.end_element("naryPr")?;
                match int.limits {
                    Some((under, over)) => {
                        self.write_wrapped("sub", under)?;
                        self.write_wrapped("sup", over)?;
                    }
                    None => {
                        self.empty_element("sub")?;
                        self.empty_element("sup")?;
                    }
                }
                self.start_element("e")?;
                self.write_list(int.base)?;
                self.write_list(int.var)?;
                self.end_element("e")?;
                self.end_element("nary")
            }
            CellKind::Sum(sum) => {
                let sign = match sum.style {
                    SumStyle::Sum => "∑",
                    SumStyle::Product => "∏",
                };
                self.start_element("nary")?;
                self.start_element("naryPr")?;
                self.write_val("chr", sign)?;
                self.write_val("limLoc", "undOvr")?;
                self.end_element("naryPr")?;
                self.write_wrapped("sub", sum.under)?;
                self.write_wrapped("sup", sum.over)?;
                self.write_wrapped("e", sum.base)?;
                self.end_element("nary")
            }
            CellKind::Limit { name, under, base } => {
                self.start_element("func")?;
                self.start_element("fName")?;
                self.start_element("limLow")?;
                self.write_wrapped("e", *name)?;
                self.write_wrapped("lim", *under)?;
                self.end_element("limLow")?;
                self.end_element("fName")?;
                self.write_wrapped("e", *base)?;
                self.end_element("func")
            }
            CellKind::Abs(d) => self.write_delimiter(Some("|"), Some("|"), d.inner),
            CellKind::Conjugate(d) => {
                self.start_element("bar")?;
                self.start_element("barPr")?;
                self.write_val("pos", "top")?;
                self.end_element("barPr")?;
                self.write_wrapped("e", d.inner)?;
                self.end_element("bar")
            }
            CellKind::Sqrt(d) => {
                self.start_element("rad")?;
                self.start_element("radPr")?;
                self.write_val("degHide", "1")?;
                self.end_element("radPr")?;
                self.empty_element("deg")?;
                self.write_wrapped("e", d.inner)?;
                self.end_element("rad")
            }
            CellKind::Paren { delimited, print } => {
                if *print {
                    self.write_delimiter(None, None, delimited.inner)
                } else {
                    self.write_list(delimited.inner)
                }
            }
            CellKind::Function { name, arg } => {
                self.start_element("func")?;
                self.write_wrapped("fName", *name)?;
                self.write_wrapped("e", *arg)?;
                self.end_element("func")
            }
            CellKind::At { base, index } => {
                self.start_element("sSub")?;
                self.start_element("e")?;
                self.write_delimiter(Some(""), Some("|"), *base)?;
                self.end_element("e")?;
                self.write_wrapped("sub", *index)?;
                self.end_element("sSub")
            }
            CellKind::Diff { diff, base } => {
                self.write_list(*diff)?;
                self.write_list(*base)
            }
            CellKind::Matrix { rows } => {
                self.start_element("d")?;
                self.start_element("e")?;
                self.start_element("m")?;
                for row in rows {
                    self.start_element("mr")?;
                    for &entry in row {
                        self.write_wrapped("e", entry)?;
                    }
                    self.end_element("mr")?;
                }
                self.end_element("m")?;
                self.end_element("e")?;
                self.end_element("d")
            }
        }
    }

    /// `m:d` around a list; `None` keeps Word's default parenthesis
    fn write_delimiter(&mut self, open: Option<&str>, close: Option<&str>, head: CellId) -> WorksheetResult<()> {
        self.start_element("d")?;
        if open.is_some() || close.is_some() {
            self.start_element("dPr")?;
            if let Some(open) = open {
                self.write_val("begChr", open)?;
            }
            if let Some(close) = close {
                self.write_val("endChr", close)?;
            }
            self.end_element("dPr")?;
        }
        self.write_wrapped("e", head)?;
        self.end_element("d")
    }

    fn write_run(&mut self, text: &str, plain: bool) -> WorksheetResult<()> {
        self.start_element("r")?;
        if plain {
            self.start_element("rPr")?;
            self.write_val("sty", "p")?;
            self.end_element("rPr")?;
        }
        let mut t = BytesStart::new(format!("{}:t", MATH_NS));
        if text.starts_with(' ') || text.ends_with(' ') {
            t.push_attribute(("xml:space", "preserve"));
        }
        self.writer.write_event(Event::Start(t)).map_err(write_error)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
        self.end_element("t")?;
        self.end_element("r")
    }

    /// Empty `<m:name m:val="value"/>` property
    fn write_val(&mut self, name: &str, value: &str) -> WorksheetResult<()> {
        let mut elem = BytesStart::new(format!("{}:{}", MATH_NS, name));
        elem.push_attribute((format!("{}:val", MATH_NS).as_str(), value));
        self.writer.write_event(Event::Empty(elem)).map_err(write_error)?;
        Ok(())
    }

    fn empty_element(&mut self, name: &str) -> WorksheetResult<()> {
        let elem = BytesStart::new(format!("{}:{}", MATH_NS, name));
        self.writer.write_event(Event::Empty(elem)).map_err(write_error)?;
        Ok(())
    }

    fn start_element(&mut self, name: &str) -> WorksheetResult<()> {
        let elem = BytesStart::new(format!("{}:{}", MATH_NS, name));
        self.writer.write_event(Event::Start(elem)).map_err(write_error)?;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> WorksheetResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(format!("{}:{}", MATH_NS, name))))
            .map_err(write_error)?;
        Ok(())
    }
}

/// OMML paragraph for the list at `head`
pub fn list_to_omml(tree: &CellTree, head: CellId) -> WorksheetResult<String> {
    let mut buffer = Vec::new();
    OmmlWriter::new(&mut buffer, tree).write_document(head)?;
    Ok(String::from_utf8(buffer)?)
}

/// OMML fragment for a single cell, without the enclosing math objects
pub fn to_omml(tree: &CellTree, id: CellId) -> WorksheetResult<String> {
    let mut buffer = Vec::new();
    OmmlWriter::new(&mut buffer, tree).write_cell(id)?;
    Ok(String::from_utf8(buffer)?)
}
