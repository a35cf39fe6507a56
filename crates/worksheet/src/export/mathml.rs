//! Presentation MathML transcription

use quick_xml::escape::escape;

use super::greek_char;
use crate::cell::{CellId, CellKind, FracStyle, SumStyle, TextKind};
use crate::layout::display_text;
use crate::tree::CellTree;

pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// A complete `<math>` element for the list at `head`
pub fn to_mathml_document(tree: &CellTree, head: CellId) -> String {
    format!(
        "<math xmlns=\"{MATHML_NS}\" display=\"block\">{}</math>",
        list_to_mathml(tree, head)
    )
}

/// MathML for a whole list
///
/// A list of several cells is wrapped in `<mrow>` so it can stand as a
/// single argument. Lists with labels or hard breaks become a table with
/// one row per line, labelled rows as `<mlabeledtr>`.
pub fn list_to_mathml(tree: &CellTree, head: CellId) -> String {
    let cells: Vec<CellId> = tree.list(head).collect();
    let multiline = cells
        .iter()
        .skip(1)
        .any(|&id| tree[id].force_break_line || tree[id].style.is_label());
    if !multiline {
        return row_mathml(tree, &cells);
    }

    let mut rows: Vec<&[CellId]> = Vec::new();
    let mut start = 0;
    for (index, &id) in cells.iter().enumerate().skip(1) {
        if tree[id].force_break_line || tree[id].style.is_label() {
            rows.push(&cells[start..index]);
            start = index;
        }
    }
    rows.push(&cells[start..]);

    let mut out = String::from("<mtable>");
    for row in rows {
        match row.split_first() {
            Some((&first, rest)) if tree[first].style.is_label() => {
                out.push_str(&format!(
                    "<mlabeledtr columnalign=\"left\"><mtd>{}</mtd><mtd>{}</mtd></mlabeledtr>",
                    to_mathml(tree, first),
                    row_mathml(tree, rest)
                ));
            }
            _ => out.push_str(&format!("<mtr><mtd>{}</mtd></mtr>", row_mathml(tree, row))),
        }
    }
    out.push_str("</mtable>");
    out
}

/// One line of cells; highlighted runs are grouped into a red `<mrow>`
fn row_mathml(tree: &CellTree, cells: &[CellId]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut highlighted = String::new();
    for &id in cells {
        let element = to_mathml(tree, id);
        if tree[id].highlight {
            highlighted.push_str(&element);
            continue;
        }
        if !highlighted.is_empty() {
            parts.push(format!("<mrow mathcolor=\"red\">{}</mrow>", std::mem::take(&mut highlighted)));
        }
        if !element.is_empty() {
            parts.push(element);
        }
    }
    if !highlighted.is_empty() {
        parts.push(format!("<mrow mathcolor=\"red\">{highlighted}</mrow>"));
    }
    match parts.len() {
        1 => parts.remove(0),
        _ => format!("<mrow>{}</mrow>", parts.concat()),
    }
}

fn text_mathml(tree: &CellTree, id: CellId) -> String {
    let cell = &tree[id];
    let Some(text) = cell.kind.as_text() else {
        return String::new();
    };
    let value = display_text(cell);
    if cell.is_hidden {
        // invisible times
        return if value == "*" { "<mo>&#x2062;</mo>".to_string() } else { String::new() };
    }
    let tag = match text.kind {
        TextKind::Space => return "<mspace width=\"thickmathspace\"/>".to_string(),
        _ if cell.style.is_label() => "mtext",
        TextKind::Variable => "mi",
        TextKind::Number => "mn",
        TextKind::Operator => "mo",
        TextKind::String => "ms",
        TextKind::Text => "mtext",
    };
    let content = match (text.kind, value) {
        (TextKind::Variable, "inf") => "&#x221E;".to_string(),
        (TextKind::Variable, "%e") => "e".to_string(),
        (TextKind::Variable, "%i") => "i".to_string(),
        (TextKind::Operator, "*") => "&#xB7;".to_string(),
        (TextKind::Operator, "->") => "&#x2192;".to_string(),
        (TextKind::Variable, name) => match greek_char(name) {
            Some(c) => c.to_string(),
            None => escape(name).into_owned(),
        },
        (_, other) => escape(other).into_owned(),
    };
    format!("<{tag}>{content}</{tag}>")
}

/// MathML for a single cell
pub fn to_mathml(tree: &CellTree, id: CellId) -> String {
    let list = |head: CellId| list_to_mathml(tree, head);
    match &tree[id].kind {
        CellKind::Text(_) => text_mathml(tree, id),
        CellKind::Image(_) => "<mtext> (Graphics) </mtext>".to_string(),
        CellKind::Fraction(frac) => match frac.style {
            FracStyle::Choose => format!(
                "<mrow><mo>(</mo><mfrac linethickness=\"0\">{}{}</mfrac><mo>)</mo></mrow>",
                list(frac.num),
                list(frac.den)
            ),
            _ => format!("<mfrac>{}{}</mfrac>", list(frac.num), list(frac.den)),
        },
        CellKind::Exponent(expt) => format!("<msup>{}{}</msup>", list(expt.base), list(expt.power)),
        CellKind::Subscript { base, index } => format!("<msub>{}{}</msub>", list(*base), list(*index)),
        CellKind::SubSup { base, sub, sup } => {
            format!("<msubsup>{}{}{}</msubsup>", list(*base), list(*sub), list(*sup))
        }
        CellKind::Integral(int) => match int.limits {
            Some((under, over)) => format!(
                "<mrow><msubsup><mo>&#x222B;</mo>{}{}</msubsup>{}{}</mrow>",
                list(under),
                list(over),
                list(int.base),
                list(int.var)
            ),
            None => format!("<mrow><mo>&#x222B;</mo>{}{}</mrow>", list(int.base), list(int.var)),
        },
        CellKind::Sum(sum) => {
            let sign = match sum.style {
                SumStyle::Sum => "&#x2211;",
                SumStyle::Product => "&#x220F;",
            };
            format!(
                "<mrow><munderover><mo>{sign}</mo>{}{}</munderover>{}</mrow>",
                list(sum.under),
                list(sum.over),
                list(sum.base)
            )
        }
        CellKind::Limit { name, under, base } => {
            format!("<mrow><munder>{}{}</munder>{}</mrow>", list(*name), list(*under), list(*base))
        }
        CellKind::Abs(d) => format!("<mrow><mo>|</mo>{}<mo>|</mo></mrow>", list(d.inner)),
        CellKind::Conjugate(d) => {
            format!("<mover accent=\"true\">{}<mo>&#xAF;</mo></mover>", list(d.inner))
        }
        CellKind::Sqrt(d) => format!("<msqrt>{}</msqrt>", list(d.inner)),
        CellKind::Paren { delimited, print } => {
            if *print {
                format!("<mrow><mo>(</mo>{}<mo>)</mo></mrow>", list(delimited.inner))
            } else {
                list(delimited.inner)
            }
        }
        CellKind::Function { name, arg } => {
            format!("<mrow>{}<mo>&#x2061;</mo>{}</mrow>", list(*name), list(*arg))
        }
        CellKind::At { base, index } => {
            format!("<msub><mrow>{}<mo>|</mo></mrow>{}</msub>", list(*base), list(*index))
        }
        CellKind::Diff { diff, base } => format!("<mrow>{}{}</mrow>", list(*diff), list(*base)),
        CellKind::Matrix { rows } => {
            let mut out = String::from("<mrow><mo>(</mo><mtable>");
            for row in rows {
                out.push_str("<mtr>");
                for &entry in row {
                    out.push_str(&format!("<mtd>{}</mtd>", list(entry)));
                }
                out.push_str("</mtr>");
            }
            out.push_str("</mtable><mo>)</mo></mrow>");
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::TextStyle;

    fn leaf(tree: &mut CellTree, value: &str, kind: TextKind) -> CellId {
        tree.text(value, kind, kind.default_style())
    }

    #[test]
    fn test_leaf_tags() {
        let mut tree = CellTree::new();
        let x = leaf(&mut tree, "x", TextKind::Variable);
        assert_eq!(to_mathml(&tree, x), "<mi>x</mi>");
        let n = leaf(&mut tree, "42", TextKind::Number);
        assert_eq!(to_mathml(&tree, n), "<mn>42</mn>");
        let lt = leaf(&mut tree, "<", TextKind::Operator);
        assert_eq!(to_mathml(&tree, lt), "<mo>&lt;</mo>");
        let alpha = leaf(&mut tree, "alpha", TextKind::Variable);
        assert_eq!(to_mathml(&tree, alpha), "<mi>α</mi>");
        let times = leaf(&mut tree, "*", TextKind::Operator);
        tree[times].is_hidden = true;
        assert_eq!(to_mathml(&tree, times), "<mo>&#x2062;</mo>");
    }

    #[test]
    fn test_lists_wrap_in_mrow() {
        let mut tree = CellTree::new();
        let a = leaf(&mut tree, "a", TextKind::Variable);
        let plus = leaf(&mut tree, "+", TextKind::Operator);
        tree.append(a, plus);
        let one = leaf(&mut tree, "1", TextKind::Number);
        tree.append(a, one);
        let b = leaf(&mut tree, "b", TextKind::Variable);
        let frac = tree.fraction(a, b, FracStyle::Normal);
        assert_eq!(
            to_mathml(&tree, frac),
            "<mfrac><mrow><mi>a</mi><mo>+</mo><mn>1</mn></mrow><mi>b</mi></mfrac>"
        );
    }

    #[test]
    fn test_highlighted_run() {
        let mut tree = CellTree::new();
        let a = leaf(&mut tree, "a", TextKind::Variable);
        let b = leaf(&mut tree, "b", TextKind::Variable);
        tree.append(a, b);
        let c = leaf(&mut tree, "c", TextKind::Variable);
        tree.append(a, c);
        tree[b].highlight = true;
        tree[c].highlight = true;
        assert_eq!(
            list_to_mathml(&tree, a),
            "<mrow><mi>a</mi><mrow mathcolor=\"red\"><mi>b</mi><mi>c</mi></mrow></mrow>"
        );
    }

    #[test]
    fn test_labels_become_table_rows() {
        let mut tree = CellTree::new();
        let label = tree.text("(%o1)", TextKind::Text, TextStyle::Label);
        let x = leaf(&mut tree, "x", TextKind::Variable);
        tree.append(label, x);
        let second = tree.text("(%o2)", TextKind::Text, TextStyle::Label);
        tree.append(label, second);
        let y = leaf(&mut tree, "y", TextKind::Variable);
        tree.append(label, y);
        let out = list_to_mathml(&tree, label);
        assert!(out.starts_with("<mtable><mlabeledtr"));
        assert_eq!(out.matches("<mlabeledtr").count(), 2);
        assert!(out.contains("<mtd><mtext>(%o2)</mtext></mtd><mtd><mi>y</mi></mtd>"));
    }

    #[test]
    fn test_function_and_sum() {
        let mut tree = CellTree::new();
        let name = leaf(&mut tree, "f", TextKind::Variable);
        let x = leaf(&mut tree, "x", TextKind::Variable);
        let arg = tree.paren(x, true);
        let fun = tree.function(name, arg);
        assert_eq!(
            to_mathml(&tree, fun),
            "<mrow><mi>f</mi><mo>&#x2061;</mo><mrow><mo>(</mo><mi>x</mi><mo>)</mo></mrow></mrow>"
        );

        let i = leaf(&mut tree, "i", TextKind::Variable);
        let n = leaf(&mut tree, "n", TextKind::Variable);
        let base = leaf(&mut tree, "i", TextKind::Variable);
        let sum = tree.sum(i, n, base, SumStyle::Sum);
        let doc = to_mathml_document(&tree, sum);
        assert!(doc.starts_with("<math xmlns=\"http://www.w3.org/1998/Math/MathML\""));
        assert!(doc.contains("<munderover><mo>&#x2211;</mo><mi>i</mi><mi>n</mi></munderover>"));
    }
}
