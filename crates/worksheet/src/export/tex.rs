//! TeX transcription

use super::{greek_tex, KNOWN_FUNCTIONS};
use crate::cell::{CellId, CellKind, FracStyle, SumStyle, TextKind, TextStyle};
use crate::export::text::list_to_string;
use crate::layout::display_text;
use crate::tree::CellTree;

/// Escape characters TeX treats specially
pub fn escape_tex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\ensuremath{\\backslash}"),
            '_' | '%' | '#' | '&' | '$' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            _ => out.push(c),
        }
    }
    out
}

/// TeX for a whole list. Labels and hard breaks start a new display.
pub fn list_to_tex(tree: &CellTree, head: CellId) -> String {
    let mut out = String::new();
    for id in tree.list(head) {
        let cell = &tree[id];
        if (cell.style.is_label() || cell.force_break_line) && !out.is_empty() {
            out.push_str("\\]\\[");
        }
        out.push_str(&to_tex(tree, id));
    }
    out
}

fn operator_tex(value: &str) -> String {
    match value {
        "*" => "\\cdot ".to_string(),
        "->" | "→" => "\\to ".to_string(),
        "<=" => "\\le ".to_string(),
        ">=" => "\\ge ".to_string(),
        "#" => "\\neq ".to_string(),
        "..." => "\\ldots ".to_string(),
        _ => escape_tex(value),
    }
}

fn symbol_tex(value: &str) -> Option<&'static str> {
    match value {
        "%e" => Some("e"),
        "%i" => Some("i"),
        "inf" => Some("\\infty "),
        "minf" => Some("-\\infty "),
        _ => greek_tex(value),
    }
}

fn text_tex(tree: &CellTree, id: CellId) -> String {
    let cell = &tree[id];
    let Some(text) = cell.kind.as_text() else {
        return String::new();
    };
    if cell.is_hidden {
        return String::new();
    }
    let value = display_text(cell);
    if cell.style.is_label() {
        return format!("\\mbox{{{}}}", escape_tex(value));
    }
    match text.kind {
        TextKind::Space => "\\;".to_string(),
        TextKind::String | TextKind::Text => format!("\\mbox{{{}}}", escape_tex(value)),
        TextKind::Number => escape_tex(value),
        TextKind::Operator => operator_tex(value),
        TextKind::Variable => {
            if let Some(symbol) = symbol_tex(value) {
                symbol.to_string()
            } else if value.chars().count() > 1 && cell.style != TextStyle::Function {
                format!("\\mathit{{{}}}", escape_tex(value))
            } else {
                escape_tex(value)
            }
        }
    }
}

/// TeX for a single cell
pub fn to_tex(tree: &CellTree, id: CellId) -> String {
    let cell = &tree[id];
    match &cell.kind {
        CellKind::Text(_) => text_tex(tree, id),
        CellKind::Image(_) => "\\mbox{ (Graphics) }".to_string(),
        CellKind::Fraction(frac) => {
            let command = match frac.style {
                FracStyle::Choose => "binom",
                FracStyle::Normal | FracStyle::Diff => "frac",
            };
            format!(
                "\\{command}{{{}}}{{{}}}",
                list_to_tex(tree, frac.num),
                list_to_tex(tree, frac.den)
            )
        }
        CellKind::Exponent(expt) => {
            format!("{{{}}}^{{{}}}", list_to_tex(tree, expt.base), list_to_tex(tree, expt.power))
        }
        CellKind::Subscript { base, index } => {
            format!("{{{}}}_{{{}}}", list_to_tex(tree, *base), list_to_tex(tree, *index))
        }
        CellKind::SubSup { base, sub, sup } => format!(
            "{{{}}}_{{{}}}^{{{}}}",
            list_to_tex(tree, *base),
            list_to_tex(tree, *sub),
            list_to_tex(tree, *sup)
        ),
        CellKind::Integral(int) => {
            let limits = match int.limits {
                Some((under, over)) => {
                    format!("_{{{}}}^{{{}}}", list_to_tex(tree, under), list_to_tex(tree, over))
                }
                None => String::new(),
            };
            format!(
                "\\int{limits}{{{}}}\\;{}",
                list_to_tex(tree, int.base),
                list_to_tex(tree, int.var)
            )
        }
        CellKind::Sum(sum) => {
            let command = match sum.style {
                SumStyle::Sum => "sum",
                SumStyle::Product => "prod",
            };
            format!(
                "\\{command}_{{{}}}^{{{}}}{{{}}}",
                list_to_tex(tree, sum.under),
                list_to_tex(tree, sum.over),
                list_to_tex(tree, sum.base)
            )
        }
        CellKind::Limit { under, base, .. } => {
            format!("\\lim_{{{}}} {}", list_to_tex(tree, *under), list_to_tex(tree, *base))
        }
        CellKind::Abs(d) => format!("\\left| {}\\right| ", list_to_tex(tree, d.inner)),
        CellKind::Conjugate(d) => format!("\\overline{{{}}}", list_to_tex(tree, d.inner)),
        CellKind::Sqrt(d) => format!("\\sqrt{{{}}}", list_to_tex(tree, d.inner)),
        CellKind::Paren { delimited, print } => {
            let inner = list_to_tex(tree, delimited.inner);
            if !*print {
                inner
            } else if inner.chars().all(|c| c.is_alphanumeric() || c == ' ') {
                format!("({inner})")
            } else {
                format!("\\left( {inner}\\right) ")
            }
        }
        CellKind::Function { name, arg } => {
            let plain = list_to_string(tree, *name);
            let name_tex = if KNOWN_FUNCTIONS.contains(&plain.as_str()) {
                format!("\\{plain}")
            } else {
                format!("\\operatorname{{{}}}", escape_tex(&plain))
            };
            format!("{name_tex}{}", list_to_tex(tree, *arg))
        }
        CellKind::At { base, index } => {
            format!("\\left. {}\\right|_{{{}}}", list_to_tex(tree, *base), list_to_tex(tree, *index))
        }
        CellKind::Diff { diff, base } => {
            format!("{}{}", list_to_tex(tree, *diff), list_to_tex(tree, *base))
        }
        CellKind::Matrix { rows } => {
            let rows: Vec<String> = rows
                .iter()
                .map(|row| {
                    let entries: Vec<String> = row.iter().map(|&e| list_to_tex(tree, e)).collect();
                    entries.join(" & ")
                })
                .collect();
            format!("\\begin{{pmatrix}}{}\\end{{pmatrix}}", rows.join("\\\\\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(tree: &mut CellTree, name: &str) -> CellId {
        tree.text(name, TextKind::Variable, TextStyle::Variable)
    }

    #[test]
    fn test_escape_tex() {
        assert_eq!(escape_tex("a_b%c"), "a\\_b\\%c");
        assert_eq!(escape_tex("x^y"), "x\\^{}y");
        assert_eq!(escape_tex("plain"), "plain");
    }

    #[test]
    fn test_leaf_forms() {
        let mut tree = CellTree::new();
        let x = var(&mut tree, "x");
        assert_eq!(to_tex(&tree, x), "x");
        let long = var(&mut tree, "speed");
        assert_eq!(to_tex(&tree, long), "\\mathit{speed}");
        let pi = var(&mut tree, "%pi");
        assert_eq!(to_tex(&tree, pi), "\\pi");
        let times = tree.text("*", TextKind::Operator, TextStyle::Operator);
        assert_eq!(to_tex(&tree, times), "\\cdot ");
        tree[times].is_hidden = true;
        assert_eq!(to_tex(&tree, times), "");
        let label = tree.text("(%o1)", TextKind::Text, TextStyle::Label);
        assert_eq!(to_tex(&tree, label), "\\mbox{(\\%o1)}");
    }

    #[test]
    fn test_composites() {
        let mut tree = CellTree::new();
        let a = var(&mut tree, "a");
        let b = var(&mut tree, "b");
        let frac = tree.fraction(a, b, FracStyle::Normal);
        assert_eq!(to_tex(&tree, frac), "\\frac{a}{b}");

        let x = var(&mut tree, "x");
        let two = tree.text("2", TextKind::Number, TextStyle::Number);
        let expt = tree.exponent(x, two, false);
        assert_eq!(to_tex(&tree, expt), "{x}^{2}");

        let x = var(&mut tree, "x");
        let sqrt = tree.sqrt(x);
        assert_eq!(to_tex(&tree, sqrt), "\\sqrt{x}");

        let f = var(&mut tree, "f");
        let dx = var(&mut tree, "dx");
        let int = tree.integral(f, dx, None);
        assert_eq!(to_tex(&tree, int), "\\int{f}\\;\\mathit{dx}");
    }

    #[test]
    fn test_function_names() {
        let mut tree = CellTree::new();
        let name = tree.text("sin", TextKind::Variable, TextStyle::Function);
        let inner = var(&mut tree, "x");
        let arg = tree.paren(inner, true);
        let sin = tree.function(name, arg);
        assert_eq!(to_tex(&tree, sin), "\\sin(x)");

        let name = tree.text("foo", TextKind::Variable, TextStyle::Function);
        let inner = var(&mut tree, "x");
        let arg = tree.paren(inner, true);
        let foo = tree.function(name, arg);
        assert_eq!(to_tex(&tree, foo), "\\operatorname{foo}(x)");
    }

    #[test]
    fn test_list_splits_displays_at_labels() {
        let mut tree = CellTree::new();
        let label = tree.text("(%o1)", TextKind::Text, TextStyle::Label);
        let x = var(&mut tree, "x");
        tree.append(label, x);
        let second = tree.text("(%o2)", TextKind::Text, TextStyle::Label);
        tree.append(label, second);
        let y = var(&mut tree, "y");
        tree.append(label, y);
        assert_eq!(list_to_tex(&tree, label), "\\mbox{(\\%o1)}x\\]\\[\\mbox{(\\%o2)}y");
    }
}
