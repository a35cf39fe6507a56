//! Linear text form, the notation Maxima reads back

use super::is_compound;
use crate::cell::{CellId, CellKind, FracStyle, SumStyle};
use crate::layout::display_text;
use crate::tree::CellTree;

/// Text form of a whole list. A hard break starts a new line.
pub fn list_to_string(tree: &CellTree, head: CellId) -> String {
    let mut out = String::new();
    for (index, id) in tree.list(head).enumerate() {
        if index > 0 && tree[id].force_break_line && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&to_string(tree, id));
    }
    out
}

fn operand(tree: &CellTree, head: CellId) -> String {
    let text = list_to_string(tree, head);
    if is_compound(tree, head) {
        format!("({text})")
    } else {
        text
    }
}

/// Variable of integration without its leading `d`
fn integration_variable(tree: &CellTree, head: CellId) -> String {
    let text = list_to_string(tree, head);
    let trimmed = text.trim();
    trimmed.strip_prefix('d').unwrap_or(trimmed).trim().to_string()
}

/// Variables a differential operator differentiates by, as `x,2,y`
///
/// Reads the denominator of `d^2/dx^2` style fractions: every `dx` names a
/// variable and an exponent on it contributes the order.
fn diff_part(tree: &CellTree, diff: CellId) -> Option<String> {
    let frac = tree.list(diff).find_map(|id| match &tree[id].kind {
        CellKind::Fraction(frac) => Some(*frac),
        _ => None,
    })?;
    let mut parts = Vec::new();
    for id in tree.list(frac.den) {
        match &tree[id].kind {
            CellKind::Text(text) => {
                if let Some(var) = text.value.strip_prefix('d').filter(|v| !v.is_empty()) {
                    parts.push(var.to_string());
                }
            }
            CellKind::Exponent(expt) => {
                let base = list_to_string(tree, expt.base);
                if let Some(var) = base.strip_prefix('d').filter(|v| !v.is_empty()) {
                    parts.push(var.to_string());
                    parts.push(list_to_string(tree, expt.power));
                }
            }
            _ => {}
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

/// Text form of a single cell
pub fn to_string(tree: &CellTree, id: CellId) -> String {
    let cell = &tree[id];
    if let Some(alt) = &cell.alt_copy_text {
        return alt.clone();
    }
    match &cell.kind {
        CellKind::Text(_) => display_text(cell).to_string(),
        CellKind::Image(_) => " (Graphics) ".to_string(),
        CellKind::Fraction(frac) => match frac.style {
            FracStyle::Choose => format!(
                "binomial({},{})",
                list_to_string(tree, frac.num),
                list_to_string(tree, frac.den)
            ),
            FracStyle::Normal | FracStyle::Diff => {
                format!("{}/{}", operand(tree, frac.num), operand(tree, frac.den))
            }
        },
        CellKind::Exponent(expt) => {
            let op = if expt.is_matrix { "^^" } else { "^" };
            format!("{}{op}{}", operand(tree, expt.base), operand(tree, expt.power))
        }
        CellKind::Subscript { base, index } => {
            format!("{}[{}]", list_to_string(tree, *base), list_to_string(tree, *index))
        }
        CellKind::SubSup { base, sub, sup } => format!(
            "{}[{}]^{}",
            list_to_string(tree, *base),
            list_to_string(tree, *sub),
            operand(tree, *sup)
        ),
        CellKind::Integral(int) => {
            let mut out = format!(
                "integrate({},{}",
                list_to_string(tree, int.base),
                integration_variable(tree, int.var)
            );
            if let Some((under, over)) = int.limits {
                out.push_str(&format!(",{},{}", list_to_string(tree, under), list_to_string(tree, over)));
            }
            out.push(')');
            out
        }
        CellKind::Sum(sum) => {
            let name = match sum.style {
                SumStyle::Sum => "sum",
                SumStyle::Product => "product",
            };
            let under = list_to_string(tree, sum.under);
            let (var, from) = under.split_once('=').unwrap_or((under.as_str(), ""));
            format!(
                "{name}({},{},{},{})",
                list_to_string(tree, sum.base),
                var.trim(),
                from.trim(),
                list_to_string(tree, sum.over)
            )
        }
        CellKind::Limit { under, base, .. } => {
            let under = list_to_string(tree, *under);
            let base = list_to_string(tree, *base);
            let split = under.split_once("->").or_else(|| under.split_once('→'));
            match split {
                Some((var, value)) => format!("limit({base},{},{})", var.trim(), value.trim()),
                None => format!("limit({base},{under})"),
            }
        }
        CellKind::Abs(d) => format!("abs({})", list_to_string(tree, d.inner)),
        CellKind::Conjugate(d) => format!("conjugate({})", list_to_string(tree, d.inner)),
        CellKind::Sqrt(d) => format!("sqrt({})", list_to_string(tree, d.inner)),
        CellKind::Paren { delimited, print } => {
            let inner = list_to_string(tree, delimited.inner);
            if *print {
                format!("({inner})")
            } else {
                inner
            }
        }
        CellKind::Function { name, arg } => {
            format!("{}{}", list_to_string(tree, *name), list_to_string(tree, *arg))
        }
        CellKind::At { base, index } => {
            format!("at({},{})", list_to_string(tree, *base), list_to_string(tree, *index))
        }
        CellKind::Diff { diff, base } => {
            let base_text = list_to_string(tree, *base);
            match diff_part(tree, *diff) {
                Some(vars) => format!("diff({base_text},{vars})"),
                None => format!("{}{base_text}", list_to_string(tree, *diff)),
            }
        }
        CellKind::Matrix { rows } => {
            let rows: Vec<String> = rows
                .iter()
                .map(|row| {
                    let entries: Vec<String> = row.iter().map(|&e| list_to_string(tree, e)).collect();
                    format!("[{}]", entries.join(","))
                })
                .collect();
            format!("matrix({})", rows.join(","))
        }
    }
}
