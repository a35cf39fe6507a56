//! Hit testing and selection
//!
//! Works on the placements recorded by the last render pass. A rectangle
//! selects the run of cells it touches along the draw chain; when it falls
//! inside a single composite, the selection narrows into the most specific
//! child list that contains it.

use crate::cell::CellId;
use crate::geometry::{Point, Rect};
use crate::paint::RenderOutput;
use crate::tree::CellTree;

/// Screen rectangle of a cell. Broken and never drawn cells have none.
pub fn cell_rect(tree: &CellTree, output: &RenderOutput, id: CellId) -> Option<Rect> {
    let cell = tree.get(id)?;
    if cell.is_broken() {
        return None;
    }
    let point = output.placement(id)?;
    Some(Rect::new(point.x, point.y - cell.center(), cell.width(), cell.height()))
}

/// Screen rectangle covering a whole list
pub fn list_rect(tree: &CellTree, output: &RenderOutput, head: CellId) -> Option<Rect> {
    tree.list(head)
        .filter_map(|id| cell_rect(tree, output, id))
        .reduce(|a, b| a.union(&b))
}

/// First cell at or after `head` in draw order whose rectangle meets `rect`
pub fn select_first(tree: &CellTree, output: &RenderOutput, head: CellId, rect: &Rect) -> Option<CellId> {
    tree.draw_list(head)
        .find(|&id| cell_rect(tree, output, id).is_some_and(|r| r.intersects(rect)))
}

/// Last cell from `first` on in draw order whose rectangle meets `rect`
pub fn select_last(tree: &CellTree, output: &RenderOutput, first: CellId, rect: &Rect) -> CellId {
    tree.draw_list(first)
        .filter(|&id| cell_rect(tree, output, id).is_some_and(|r| r.intersects(rect)))
        .last()
        .unwrap_or(first)
}

/// Range of cells of the list at `head` selected by `rect`
pub fn select_rect(
    tree: &CellTree,
    output: &RenderOutput,
    head: CellId,
    rect: &Rect,
) -> Option<(CellId, CellId)> {
    let first = select_first(tree, output, head, rect)?;
    let last = select_last(tree, output, first, rect);
    if first == last {
        Some(select_inner(tree, output, first, rect))
    } else {
        Some((first, last))
    }
}

/// Narrow a selection inside `id`. A leaf, or a composite none of whose
/// child lists contains `rect`, selects itself.
pub fn select_inner(tree: &CellTree, output: &RenderOutput, id: CellId, rect: &Rect) -> (CellId, CellId) {
    for list in tree[id].kind.child_lists() {
        let contains = list_rect(tree, output, list).is_some_and(|r| r.contains(rect));
        if contains {
            if let Some(range) = select_rect(tree, output, list, rect) {
                return range;
            }
        }
    }
    (id, id)
}

/// Innermost drawn cell under `point`, searching the list at `head`
pub fn cell_at(tree: &CellTree, output: &RenderOutput, head: CellId, point: Point) -> Option<CellId> {
    let hit = tree
        .draw_list(head)
        .find(|&id| cell_rect(tree, output, id).is_some_and(|r| r.contains_point(point)))?;
    for list in tree[hit].kind.child_lists() {
        if let Some(inner) = cell_at(tree, output, list, point) {
            return Some(inner);
        }
    }
    Some(hit)
}

/// Tooltip for the cell under `point`, falling back to the nearest
/// enclosing composite that has one. Records the cell under the pointer.
pub fn tooltip_at(tree: &mut CellTree, output: &RenderOutput, head: CellId, point: Point) -> Option<String> {
    let hit = cell_at(tree, output, head, point);
    tree.pointers_mut().set_cell_under_pointer(hit);
    let mut current = hit;
    while let Some(id) = current {
        if let Some(tooltip) = &tree[id].tooltip {
            return Some(tooltip.clone());
        }
        current = tree[id].parent();
    }
    None
}
