//! Cell arena
//!
//! [`CellTree`] owns every cell of a worksheet. Lists are chains of
//! handles through [`Cell::next()`]; composites own their child lists by
//! handle. Deleting a list frees the whole remaining chain together with
//! its children and clears [`CellPointers`] before any slot is reused.

use crate::cell::{
    Cell, CellId, CellKind, Delimited, ExptCell, FracCell, FracStyle, ImageCell, IntCell, SumCell,
    SumStyle, TextKind, TextStyle,
};
use crate::parser::PLACEHOLDER;
use slotmap::SlotMap;
use std::collections::HashSet;
use std::ops::{Index, IndexMut};

// =============================================================================
// Pointer registry
// =============================================================================

/// Weak references into the tree held by the surrounding worksheet.
///
/// The tree clears every slot that refers to a deleted cell as part of
/// [`CellTree::delete_list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellPointers {
    selection_start: Option<CellId>,
    selection_end: Option<CellId>,
    cell_under_pointer: Option<CellId>,
}

impl CellPointers {
    pub fn set_selection(&mut self, start: CellId, end: CellId) {
        self.selection_start = Some(start);
        self.selection_end = Some(end);
    }

    pub fn clear_selection(&mut self) {
        self.selection_start = None;
        self.selection_end = None;
    }

    pub fn selection_start(&self) -> Option<CellId> {
        self.selection_start
    }

    pub fn selection_end(&self) -> Option<CellId> {
        self.selection_end
    }

    pub fn set_cell_under_pointer(&mut self, cell: Option<CellId>) {
        self.cell_under_pointer = cell;
    }

    pub fn cell_under_pointer(&self) -> Option<CellId> {
        self.cell_under_pointer
    }

    /// Drop every reference to `cell`. A selection loses both ends when
    /// either end goes away.
    pub fn forget(&mut self, cell: CellId) {
        if self.selection_start == Some(cell) || self.selection_end == Some(cell) {
            self.clear_selection();
        }
        if self.cell_under_pointer == Some(cell) {
            self.cell_under_pointer = None;
        }
    }
}

// =============================================================================
// Tree
// =============================================================================

/// Arena holding the cells of a worksheet
#[derive(Debug, Clone, Default)]
pub struct CellTree {
    cells: SlotMap<CellId, Cell>,
    pointers: CellPointers,
}

impl Index<CellId> for CellTree {
    type Output = Cell;

    fn index(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }
}

impl IndexMut<CellId> for CellTree {
    fn index_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id]
    }
}

impl CellTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: Cell) -> CellId {
        let id = self.cells.insert(cell);
        // A fresh cell draws where it sits logically.
        let next = self.cells[id].next;
        self.cells[id].next_to_draw = next;
        id
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pointers(&self) -> &CellPointers {
        &self.pointers
    }

    pub fn pointers_mut(&mut self) -> &mut CellPointers {
        &mut self.pointers
    }

    /// Current selection, if both ends are still alive
    pub fn selection(&self) -> Option<(CellId, CellId)> {
        let start = self.pointers.selection_start.filter(|&id| self.contains(id))?;
        let end = self.pointers.selection_end.filter(|&id| self.contains(id))?;
        Some((start, end))
    }

    /// Cell under the mouse pointer, if it is still alive
    pub fn cell_under_pointer(&self) -> Option<CellId> {
        self.pointers.cell_under_pointer.filter(|&id| self.contains(id))
    }

    // -------------------------------------------------------------------------
    // Lists
    // -------------------------------------------------------------------------

    /// Iterate a list in document order
    pub fn list(&self, head: CellId) -> ListIter<'_> {
        ListIter {
            tree: self,
            current: Some(head),
        }
    }

    /// Iterate a list in draw order
    pub fn draw_list(&self, head: CellId) -> DrawIter<'_> {
        DrawIter {
            tree: self,
            current: Some(head),
        }
    }

    /// Last cell of the list containing `id`, in document order
    pub fn last(&self, id: CellId) -> CellId {
        let mut last = id;
        while let Some(next) = self.cells[last].next {
            last = next;
        }
        last
    }

    /// First cell of the list containing `id`, in document order
    pub fn first(&self, id: CellId) -> CellId {
        let mut first = id;
        while let Some(previous) = self.cells[first].previous {
            first = previous;
        }
        first
    }

    pub fn list_len(&self, head: CellId) -> usize {
        self.list(head).count()
    }

    /// Append the list starting at `tail` to the list containing `list`,
    /// linking both the logical and the draw chain.
    pub fn append(&mut self, list: CellId, tail: CellId) {
        let last = self.last(list);
        let parent = self.cells[last].parent;
        self.cells[last].next = Some(tail);
        self.cells[last].next_to_draw = Some(tail);
        self.cells[tail].previous = Some(last);
        self.cells[tail].previous_to_draw = Some(last);
        self.set_parent_list(tail, parent);
    }

    /// Point every cell of a list at its owning composite
    pub fn set_parent_list(&mut self, head: CellId, parent: Option<CellId>) {
        let mut current = Some(head);
        while let Some(id) = current {
            self.cells[id].parent = parent;
            current = self.cells[id].next;
        }
    }

    /// Forget cached geometry for a list and everything it owns
    pub fn reset_size_list(&mut self, head: CellId) {
        let mut current = Some(head);
        while let Some(id) = current {
            self.cells[id].reset_size();
            for owned in self.cells[id].kind.owned() {
                self.reset_size_list(owned);
            }
            current = self.cells[id].next;
        }
    }

    /// Clear soft line breaks, keeping the hard ones
    pub fn reset_breaks_list(&mut self, head: CellId) {
        let mut current = Some(head);
        while let Some(id) = current {
            let cell = &mut self.cells[id];
            cell.break_line = cell.force_break_line;
            current = cell.next;
        }
    }

    // -------------------------------------------------------------------------
    // Copy and delete
    // -------------------------------------------------------------------------

    /// Deep copy of a single cell and everything it owns. The copy is not
    /// linked to any list.
    pub fn copy_cell(&mut self, id: CellId) -> CellId {
        let source = self.cells[id].kind.clone();
        let kind = source.map_ids(&mut |owned| self.copy_list(owned));
        let copy = self.cells[id].copy_data(kind);
        let new_id = self.insert(copy);
        self.adopt(new_id);
        new_id
    }

    /// Deep copy of `head` and the rest of its list
    pub fn copy_list(&mut self, head: CellId) -> CellId {
        let first = self.copy_cell(head);
        let mut current = self.cells[head].next;
        while let Some(id) = current {
            let copy = self.copy_cell(id);
            self.append(first, copy);
            current = self.cells[id].next;
        }
        first
    }

    /// Delete `head`, the rest of its list, and everything those cells own.
    ///
    /// The list is cut from its predecessor first. A whole child list of a
    /// composite is replaced by a placeholder leaf, so the composite never
    /// holds a freed handle. Pointer registry entries for removed cells are
    /// cleared before the slots are released.
    pub fn delete_list(&mut self, head: CellId) {
        if !self.contains(head) {
            return;
        }
        match self.cells[head].previous.take() {
            Some(previous) => {
                self.cells[previous].next = None;
                if self.cells[previous].next_to_draw == Some(head) {
                    self.cells[previous].next_to_draw = None;
                }
            }
            None => {
                if let Some(parent) = self.cells[head].parent {
                    self.detach_from_parent(parent, head);
                }
            }
        }
        if let Some(previous) = self.cells[head].previous_to_draw.take() {
            if let Some(cell) = self.cells.get_mut(previous) {
                if cell.next_to_draw == Some(head) {
                    cell.next_to_draw = None;
                }
            }
        }

        let mut doomed = Vec::new();
        self.collect_list(head, &mut doomed);
        let doomed_set: HashSet<CellId> = doomed.iter().copied().collect();

        for &id in &doomed {
            self.pointers.forget(id);
        }
        // Cells outside the deleted range must not keep draw links into it.
        for (id, cell) in self.cells.iter_mut() {
            if doomed_set.contains(&id) {
                continue;
            }
            if cell.next_to_draw.is_some_and(|next| doomed_set.contains(&next)) {
                cell.next_to_draw = None;
            }
            if cell
                .previous_to_draw
                .is_some_and(|previous| doomed_set.contains(&previous))
            {
                cell.previous_to_draw = None;
            }
        }
        for id in doomed {
            self.cells.remove(id);
        }
    }

    /// Swap the child list `head` of `parent` for a placeholder leaf
    fn detach_from_parent(&mut self, parent: CellId, head: CellId) {
        let owns_head = self
            .cells
            .get(parent)
            .is_some_and(|owner| owner.kind.owned().contains(&head));
        if !owns_head {
            return;
        }
        let mut placeholder = Cell::text(PLACEHOLDER, TextKind::Text, TextStyle::Placeholder);
        placeholder.highlight = self.cells[head].highlight;
        placeholder.parent = Some(parent);
        let placeholder = self.insert(placeholder);
        let kind = self.cells[parent]
            .kind
            .map_ids(&mut |owned| if owned == head { placeholder } else { owned });
        let owner = &mut self.cells[parent];
        owner.kind = kind;
        owner.reset_size();
        tracing::debug!(kind = owner.kind.name(), "replaced deleted child list with placeholder");
    }

    fn collect_list(&self, head: CellId, out: &mut Vec<CellId>) {
        let mut current = Some(head);
        while let Some(id) = current {
            out.push(id);
            for owned in self.cells[id].kind.owned() {
                self.collect_list(owned, out);
            }
            current = self.cells[id].next;
        }
    }

    /// Set the parent of every list and decoration owned by `id`
    fn adopt(&mut self, id: CellId) {
        for owned in self.cells[id].kind.owned() {
            self.set_parent_list(owned, Some(id));
        }
    }

    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    fn composite(&mut self, kind: CellKind) -> CellId {
        let id = self.insert(Cell::new(kind, TextStyle::Default));
        self.adopt(id);
        id
    }

    /// Insert a text leaf
    pub fn text(&mut self, value: impl Into<String>, kind: TextKind, style: TextStyle) -> CellId {
        self.insert(Cell::text(value, kind, style))
    }

    fn decoration(&mut self, value: &str) -> CellId {
        self.text(value, TextKind::Operator, TextStyle::Default)
    }

    fn delimited(&mut self, inner: CellId, open: &str, close: &str) -> Delimited {
        Delimited {
            inner,
            open: self.decoration(open),
            close: self.decoration(close),
        }
    }

    pub fn image(&mut self, source: impl Into<String>, width: f32, height: f32) -> CellId {
        let image = ImageCell {
            source: source.into(),
            width,
            height,
        };
        self.insert(Cell::new(CellKind::Image(image), TextStyle::Default))
    }

    pub fn fraction(&mut self, num: CellId, den: CellId, style: FracStyle) -> CellId {
        let frac = FracCell {
            num,
            den,
            style,
            open_num: self.decoration("("),
            close_num: self.decoration(")"),
            divide: self.decoration("/"),
            open_den: self.decoration("("),
            close_den: self.decoration(")"),
        };
        self.composite(CellKind::Fraction(frac))
    }

    pub fn exponent(&mut self, base: CellId, power: CellId, is_matrix: bool) -> CellId {
        let open = self.decoration(if is_matrix { "^^(" } else { "^(" });
        let expt = ExptCell {
            base,
            power,
            is_matrix,
            open,
            close: self.decoration(")"),
        };
        self.composite(CellKind::Exponent(expt))
    }

    pub fn subscript(&mut self, base: CellId, index: CellId) -> CellId {
        self.composite(CellKind::Subscript { base, index })
    }

    pub fn subsup(&mut self, base: CellId, sub: CellId, sup: CellId) -> CellId {
        self.composite(CellKind::SubSup { base, sub, sup })
    }

    pub fn integral(&mut self, base: CellId, var: CellId, limits: Option<(CellId, CellId)>) -> CellId {
        self.composite(CellKind::Integral(IntCell { base, var, limits }))
    }

    pub fn sum(&mut self, under: CellId, over: CellId, base: CellId, style: SumStyle) -> CellId {
        self.composite(CellKind::Sum(SumCell {
            under,
            over,
            base,
            style,
        }))
    }

    pub fn limit(&mut self, name: CellId, under: CellId, base: CellId) -> CellId {
        self.composite(CellKind::Limit { name, under, base })
    }

    pub fn abs(&mut self, inner: CellId) -> CellId {
        let delimited = self.delimited(inner, "abs(", ")");
        self.composite(CellKind::Abs(delimited))
    }

    pub fn conjugate(&mut self, inner: CellId) -> CellId {
        let delimited = self.delimited(inner, "conjugate(", ")");
        self.composite(CellKind::Conjugate(delimited))
    }

    pub fn sqrt(&mut self, inner: CellId) -> CellId {
        let delimited = self.delimited(inner, "sqrt(", ")");
        self.composite(CellKind::Sqrt(delimited))
    }

    /// Parenthesised group. Unprinted parentheses keep empty decorations.
    pub fn paren(&mut self, inner: CellId, print: bool) -> CellId {
        let (open, close) = if print { ("(", ")") } else { ("", "") };
        let delimited = self.delimited(inner, open, close);
        self.composite(CellKind::Paren { delimited, print })
    }

    pub fn function(&mut self, name: CellId, arg: CellId) -> CellId {
        self.composite(CellKind::Function { name, arg })
    }

    pub fn at(&mut self, base: CellId, index: CellId) -> CellId {
        self.composite(CellKind::At { base, index })
    }

    pub fn diff(&mut self, diff: CellId, base: CellId) -> CellId {
        self.composite(CellKind::Diff { diff, base })
    }

    pub fn matrix(&mut self, rows: Vec<Vec<CellId>>) -> CellId {
        self.composite(CellKind::Matrix { rows })
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Iterator over a list in document order
pub struct ListIter<'a> {
    tree: &'a CellTree,
    current: Option<CellId>,
}

impl Iterator for ListIter<'_> {
    type Item = CellId;

    fn next(&mut self) -> Option<CellId> {
        let id = self.current?;
        self.current = self.tree.get(id).and_then(|cell| cell.next);
        Some(id)
    }
}

/// Iterator over a list in draw order
pub struct DrawIter<'a> {
    tree: &'a CellTree,
    current: Option<CellId>,
}

impl Iterator for DrawIter<'_> {
    type Item = CellId;

    fn next(&mut self) -> Option<CellId> {
        let id = self.current?;
        self.current = self.tree.get(id).and_then(|cell| cell.next_to_draw);
        Some(id)
    }
}
