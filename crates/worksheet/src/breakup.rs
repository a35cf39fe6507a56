//! Breaking composites into flat runs
//!
//! A composite that does not fit on a line is broken: its decorations and
//! child lists are spliced into the draw chain right after it, so the line
//! breaker can wrap them like ordinary cells. The logical chain is never
//! touched, which is what makes [`unbreak`] exact.

use crate::cell::{CellId, CellKind};
use crate::layout::broken_height;
use crate::tree::CellTree;

/// Lists and decorations a broken cell is drawn as, in order
pub fn segments(kind: &CellKind) -> Vec<CellId> {
    match kind {
        CellKind::Fraction(frac) => vec![
            frac.open_num,
            frac.num,
            frac.close_num,
            frac.divide,
            frac.open_den,
            frac.den,
            frac.close_den,
        ],
        CellKind::Exponent(expt) => vec![expt.base, expt.open, expt.power, expt.close],
        CellKind::Abs(d) | CellKind::Conjugate(d) | CellKind::Sqrt(d) => {
            vec![d.open, d.inner, d.close]
        }
        CellKind::Paren { delimited, .. } => {
            vec![delimited.open, delimited.inner, delimited.close]
        }
        CellKind::Function { name, arg } => vec![*name, *arg],
        _ => Vec::new(),
    }
}

/// Last cell reached from `head` through the draw chain
fn draw_last(tree: &CellTree, head: CellId) -> CellId {
    let mut last = head;
    while let Some(next) = tree[last].next_to_draw {
        last = next;
    }
    last
}

fn link_draw(tree: &mut CellTree, from: CellId, to: Option<CellId>) {
    tree[from].next_to_draw = to;
    if let Some(to) = to {
        tree[to].previous_to_draw = Some(from);
    }
}

/// Splice the parts of `id` into the draw chain after it.
///
/// A measured cell takes width 0 and the height and center of its tallest
/// part. Returns `false` when the cell is already broken or its variant
/// cannot be broken.
pub fn break_up(tree: &mut CellTree, id: CellId) -> bool {
    if tree[id].is_broken {
        return false;
    }
    let parts = segments(&tree[id].kind);
    if parts.is_empty() {
        return false;
    }
    let after = tree[id].next_to_draw;
    let mut previous = id;
    for part in parts {
        // Each part still ends its own draw chain; find where before linking.
        let last = draw_last(tree, part);
        link_draw(tree, previous, Some(part));
        previous = last;
    }
    link_draw(tree, previous, after);
    tree[id].is_broken = true;
    if tree[id].geometry.height.is_some() {
        let (height, center) = broken_height(tree, &tree[id].kind);
        let height = height.max(1.0);
        let geometry = &mut tree[id].geometry;
        geometry.width = Some(0.0);
        geometry.height = Some(height);
        geometry.center = Some(center.clamp(0.0, height));
    }
    tracing::debug!(kind = tree[id].kind.name(), "broke up cell");
    true
}

/// Undo [`break_up`] for `id` and everything it owns
pub fn unbreak(tree: &mut CellTree, id: CellId) {
    let was_broken = tree[id].is_broken;
    for owned in tree[id].kind.owned() {
        unbreak_list(tree, owned);
    }
    let next = tree[id].next;
    link_draw(tree, id, next);
    let cell = &mut tree[id];
    cell.is_broken = false;
    if was_broken {
        cell.reset_size();
    }
}

/// Undo [`break_up`] for every cell of a list. Soft line breaks of the
/// list are cleared with it.
pub fn unbreak_list(tree: &mut CellTree, head: CellId) {
    let ids: Vec<CellId> = tree.list(head).collect();
    for id in ids {
        unbreak(tree, id);
    }
    tree.reset_breaks_list(head);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{FracStyle, Geometry, TextKind, TextStyle};

    fn var(tree: &mut CellTree, name: &str) -> CellId {
        tree.text(name, TextKind::Variable, TextStyle::Variable)
    }

    fn drawn(tree: &CellTree, head: CellId) -> Vec<String> {
        tree.draw_list(head)
            .map(|id| match tree[id].kind.as_text() {
                Some(text) => text.value.clone(),
                None => format!("<{}>", tree[id].kind.name()),
            })
            .collect()
    }

    #[test]
    fn test_break_up_fraction() {
        let mut tree = CellTree::new();
        let head = var(&mut tree, "y");
        let num = var(&mut tree, "a");
        let den = var(&mut tree, "b");
        let frac = tree.fraction(num, den, FracStyle::Normal);
        let tail = var(&mut tree, "z");
        tree.append(head, frac);
        tree.append(head, tail);

        assert!(break_up(&mut tree, frac));
        assert!(tree[frac].is_broken());
        assert_eq!(
            drawn(&tree, head),
            vec!["y", "<fraction>", "(", "a", ")", "/", "(", "b", ")", "z"]
        );
        // The logical chain is unchanged.
        assert_eq!(tree.list(head).collect::<Vec<_>>(), vec![head, frac, tail]);
        assert_eq!(tree[tail].previous_to_draw(), tree[frac].kind.decorations().last().copied());
    }

    #[test]
    fn test_broken_cell_takes_tallest_part() {
        let mut tree = CellTree::new();
        let num = var(&mut tree, "a");
        let den = var(&mut tree, "b");
        let frac = tree.fraction(num, den, FracStyle::Normal);
        for part in segments(&tree[frac].kind) {
            tree[part].geometry = Geometry {
                width: Some(8.0),
                height: Some(10.0),
                center: Some(5.0),
            };
        }
        tree[num].geometry.height = Some(20.0);
        tree[num].geometry.center = Some(12.0);
        tree[frac].geometry = Geometry {
            width: Some(30.0),
            height: Some(32.0),
            center: Some(16.0),
        };

        assert!(break_up(&mut tree, frac));
        assert_eq!(tree[frac].width(), 0.0);
        assert_eq!(tree[frac].height(), 20.0);
        assert_eq!(tree[frac].center(), 12.0);
    }

    #[test]
    fn test_unbreak_clears_soft_breaks() {
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "x");
        let second = var(&mut tree, "y");
        tree.append(inner, second);
        let abs = tree.abs(inner);
        assert!(break_up(&mut tree, abs));
        tree[second].break_line = true;

        unbreak_list(&mut tree, abs);
        assert!(!tree[second].break_line);
        assert!(!tree[second].break_line_here());
    }

    #[test]
    fn test_double_break_is_refused() {
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "x");
        let abs = tree.abs(inner);
        assert!(break_up(&mut tree, abs));
        let chain = drawn(&tree, abs);
        assert!(!break_up(&mut tree, abs));
        assert_eq!(drawn(&tree, abs), chain);
    }

    #[test]
    fn test_leaf_cannot_break() {
        let mut tree = CellTree::new();
        let x = var(&mut tree, "x");
        assert!(!break_up(&mut tree, x));
        let index = var(&mut tree, "i");
        let base = var(&mut tree, "a");
        let sub = tree.subscript(base, index);
        assert!(!break_up(&mut tree, sub));
    }

    #[test]
    fn test_unbreak_restores_draw_chain() {
        let mut tree = CellTree::new();
        let head = var(&mut tree, "f");
        let inner = var(&mut tree, "x");
        let plus = tree.text("+", TextKind::Operator, TextStyle::Operator);
        tree.append(inner, plus);
        let one = tree.text("1", TextKind::Number, TextStyle::Number);
        tree.append(inner, one);
        let paren = tree.paren(inner, true);
        tree.append(head, paren);
        let before = drawn(&tree, head);

        assert!(break_up(&mut tree, paren));
        assert_eq!(drawn(&tree, head), vec!["f", "<paren>", "(", "x", "+", "1", ")"]);

        unbreak(&mut tree, paren);
        assert!(!tree[paren].is_broken());
        assert_eq!(drawn(&tree, head), before);
        for id in tree.list(inner).collect::<Vec<_>>() {
            assert_eq!(tree[id].next_to_draw(), tree[id].next());
        }
    }

    #[test]
    fn test_nested_break_and_unbreak() {
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "x");
        let sqrt = tree.sqrt(inner);
        let power = var(&mut tree, "2");
        let expt = tree.exponent(sqrt, power, false);

        assert!(break_up(&mut tree, expt));
        assert!(break_up(&mut tree, sqrt));
        assert_eq!(
            drawn(&tree, expt),
            vec!["<exponent>", "<sqrt>", "sqrt(", "x", ")", "^(", "2", ")"]
        );

        unbreak(&mut tree, expt);
        assert!(!tree[sqrt].is_broken());
        assert_eq!(drawn(&tree, expt), vec!["<exponent>"]);
        assert_eq!(drawn(&tree, sqrt), vec!["<sqrt>"]);
    }

    #[test]
    fn test_every_breakable_variant_round_trips() {
        let mut tree = CellTree::new();
        let mut build: Vec<CellId> = Vec::new();
        let a = var(&mut tree, "a");
        let b = var(&mut tree, "b");
        build.push(tree.fraction(a, b, FracStyle::Choose));
        let a = var(&mut tree, "a");
        let b = var(&mut tree, "b");
        build.push(tree.exponent(a, b, true));
        let a = var(&mut tree, "a");
        build.push(tree.conjugate(a));
        let a = var(&mut tree, "a");
        build.push(tree.sqrt(a));
        let a = var(&mut tree, "a");
        build.push(tree.paren(a, false));
        let a = var(&mut tree, "sin");
        let b = var(&mut tree, "x");
        build.push(tree.function(a, b));

        for id in build {
            assert!(break_up(&mut tree, id), "{}", tree[id].kind.name());
            assert!(!break_up(&mut tree, id));
            unbreak(&mut tree, id);
            assert!(!tree[id].is_broken());
            assert_eq!(tree[id].next_to_draw(), tree[id].next());
            for owned in tree[id].kind.owned() {
                assert_eq!(tree[owned].next_to_draw(), tree[owned].next());
            }
        }
    }
}
