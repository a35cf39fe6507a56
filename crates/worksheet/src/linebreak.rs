//! Line breaking
//!
//! [`LineBreaker::layout`] takes a freshly parsed or edited list and brings
//! it into a drawable state:
//!
//! 1. measure widths along the logical chain
//! 2. break up every composite wider than the line
//! 3. mark soft line breaks greedily along the draw chain
//! 4. measure heights, now that broken cells are known
//! 5. collect the draw chain into [`LineBox`]es
//!
//! Every step tolerates degenerate input; nothing here can fail.

use crate::breakup::{break_up, unbreak_list};
use crate::cell::CellId;
use crate::geometry::Size;
use crate::layout::{
    advance, is_suppressed, recalculate_height, recalculate_height_list, recalculate_widths,
    recalculate_widths_list, LayoutContext,
};
use crate::tree::CellTree;
use serde::{Deserialize, Serialize};

/// One laid out line of a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineBox {
    /// Cells drawn on this line, in draw order. Broken cells are left out.
    pub cells: Vec<CellId>,
    pub width: f32,
    pub center: f32,
    pub drop: f32,
    /// y of the center line, relative to the top of the list
    pub baseline: f32,
}

impl LineBox {
    pub fn height(&self) -> f32 {
        self.center + self.drop
    }

    pub fn top(&self) -> f32 {
        self.baseline - self.center
    }
}

/// Result of laying out a list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub lines: Vec<LineBox>,
    pub size: Size,
}

/// Drives the layout passes for one top-level list
pub struct LineBreaker<'a> {
    ctx: LayoutContext<'a>,
}

impl<'a> LineBreaker<'a> {
    pub fn new(ctx: LayoutContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &LayoutContext<'a> {
        &self.ctx
    }

    /// Run all layout passes over the list starting at `head`
    pub fn layout(&self, tree: &mut CellTree, head: CellId) -> LayoutResult {
        let font_size = self.ctx.config.math_font_size();
        unbreak_list(tree, head);
        recalculate_widths_list(tree, head, font_size, &self.ctx);
        self.break_up_cells(tree, head, font_size);
        self.break_lines(tree, head);
        recalculate_height_list(tree, head, font_size, &self.ctx);
        self.measure(tree, head)
    }

    /// Break every cell that is wider than a line on its own. Parts of a
    /// broken cell follow it in the draw chain and are checked in turn.
    pub fn break_up_cells(&self, tree: &mut CellTree, head: CellId, font_size: f32) {
        let limit = self.ctx.config.line_width();
        let mut current = Some(head);
        while let Some(id) = current {
            let cell = &tree[id];
            if !cell.is_broken() && cell.width() > limit && break_up(tree, id) {
                let size = if tree[id].font_size > 0.0 {
                    tree[id].font_size
                } else {
                    font_size
                };
                recalculate_widths(tree, id, size, &self.ctx);
                recalculate_height(tree, id, size, &self.ctx);
            }
            current = tree[id].next_to_draw();
        }
    }

    /// Mark soft line breaks. A break falls in front of a cell exactly when
    /// the running line extent plus the gap plus the cell's width exceeds
    /// the line width.
    pub fn break_lines(&self, tree: &mut CellTree, head: CellId) {
        let limit = self.ctx.config.line_width();
        let gap = self.ctx.config.cell_skip();
        let mut running: Option<f32> = None;
        let mut pending_break = false;
        let mut current = Some(head);
        while let Some(id) = current {
            let cell = &mut tree[id];
            cell.break_line = cell.force_break_line;
            current = cell.next_to_draw;

            if cell.is_broken {
                // A hard break on a broken cell moves to its first part.
                pending_break |= cell.force_break_line;
                continue;
            }
            let width = cell.width();
            if cell.force_break_line || pending_break {
                cell.break_line = true;
                pending_break = false;
                running = (width > 0.0).then_some(width);
                continue;
            }
            if width <= 0.0 {
                continue;
            }
            running = match running {
                None => Some(width),
                Some(extent) if extent + gap + width > limit => {
                    cell.break_line = true;
                    Some(width)
                }
                Some(extent) => Some(extent + gap + width),
            };
        }
    }

    /// Collect the draw chain into lines and place them vertically
    pub fn measure(&self, tree: &CellTree, head: CellId) -> LayoutResult {
        let gap = self.ctx.config.cell_skip();
        let mut lines: Vec<LineBox> = Vec::new();
        let mut current: Option<LineBox> = None;

        for id in tree.draw_list(head) {
            let cell = &tree[id];
            if cell.is_broken() {
                continue;
            }
            if cell.break_line_here() {
                if let Some(line) = current.take().filter(|line| !line.cells.is_empty()) {
                    lines.push(line);
                }
            }
            let line = current.get_or_insert_with(|| LineBox {
                cells: Vec::new(),
                width: 0.0,
                center: 0.0,
                drop: 0.0,
                baseline: 0.0,
            });
            line.cells.push(id);
            line.width += advance(cell, gap);
            if !is_suppressed(cell, self.ctx.config) {
                line.center = line.center.max(cell.center());
                line.drop = line.drop.max(cell.drop());
            }
        }
        if let Some(line) = current.filter(|line| !line.cells.is_empty()) {
            lines.push(line);
        }

        let mut width = 0.0_f32;
        let mut bottom = 0.0_f32;
        let mut previous_big_skip: Option<bool> = None;
        for line in &mut lines {
            // The trailing gap of the last cell is not part of the line.
            if line.width > 0.0 {
                line.width = (line.width - gap).max(0.0);
            }
            let skip = match previous_big_skip {
                None => 0.0,
                Some(true) => self.ctx.config.big_skip(),
                Some(false) => self.ctx.config.line_skip(),
            };
            line.baseline = bottom + skip + line.center;
            bottom = line.baseline + line.drop;
            width = width.max(line.width);
            previous_big_skip = line.cells.last().map(|&id| tree[id].big_skip);
        }

        LayoutResult {
            lines,
            size: Size::new(width, bottom),
        }
    }
}
