//! Painting
//!
//! The renderer turns a laid out tree into device-space paint commands. It
//! never mutates the tree; where each cell was drawn is returned alongside
//! the commands so hit testing can use it.

use crate::cell::{CellId, CellKind, FracStyle, SumStyle, TextStyle};
use crate::geometry::{Point, Rect};
use crate::layout::{
    advance, display_text, integral_sign, is_suppressed, list_metrics, matrix_grid, paren_width,
    script_overlap, sqrt_sign_width, sum_sign, LayoutContext, ListMetrics, MATRIX_BRACKET,
    MATRIX_COLUMN_GAP, MATRIX_ROW_GAP,
};
use crate::linebreak::LayoutResult;
use crate::tree::CellTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Paint commands
// =============================================================================

/// A color in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const GREEN: Color = Color::rgb(0, 128, 0);

    /// Color a cell of `style` is drawn in
    pub fn for_style(style: TextStyle, highlight: bool) -> Color {
        if highlight {
            return Color::RED;
        }
        match style {
            TextStyle::Error | TextStyle::Placeholder => Color::RED,
            TextStyle::Label | TextStyle::UserLabel | TextStyle::MainPrompt | TextStyle::OtherPrompt => {
                Color::GRAY
            }
            TextStyle::Input => Color::BLUE,
            TextStyle::Warning => Color::GREEN,
            _ => Color::BLACK,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// A drawing instruction in device coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaintCommand {
    /// Draw text with its top-left corner at `position`
    Text {
        text: String,
        position: Point,
        font_size: f32,
        style: TextStyle,
        color: Color,
    },
    /// Draw a straight line
    Line {
        start: Point,
        end: Point,
        thickness: f32,
        color: Color,
    },
    /// Draw part of an ellipse. Angles are in degrees, clockwise from the
    /// positive x axis.
    Arc {
        center: Point,
        radius_x: f32,
        radius_y: f32,
        start_angle: f32,
        end_angle: f32,
        thickness: f32,
        color: Color,
    },
    /// Copy a picture into `rect`
    Bitmap { source: String, rect: Rect },
}

/// Everything a render pass produced
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub primitives: Vec<PaintCommand>,
    /// Left end of the center line of every cell that was visited, visible
    /// or not
    pub placements: HashMap<CellId, Point>,
    pub bounds: Rect,
}

impl RenderOutput {
    pub fn placement(&self, id: CellId) -> Option<Point> {
        self.placements.get(&id).copied()
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Converts laid out cells into paint commands
pub struct Renderer<'a> {
    ctx: LayoutContext<'a>,
}

impl<'a> Renderer<'a> {
    pub fn new(ctx: LayoutContext<'a>) -> Self {
        Self { ctx }
    }

    /// Draw all lines of a laid out list with its top-left corner at `origin`
    pub fn render(&self, tree: &CellTree, layout: &LayoutResult, origin: Point) -> RenderOutput {
        let gap = self.ctx.config.cell_skip();
        let mut out = RenderOutput {
            bounds: Rect::from_origin_size(origin, layout.size),
            ..Default::default()
        };
        for line in &layout.lines {
            let mut point = Point::new(origin.x, origin.y + line.baseline);
            for &id in &line.cells {
                self.draw_cell(tree, id, point, &mut out);
                point.x += advance(&tree[id], gap);
            }
        }
        out
    }

    /// Draw a list on a single line with the left end of its center line at
    /// `point`
    pub fn render_list(&self, tree: &CellTree, head: CellId, point: Point) -> RenderOutput {
        let metrics = list_metrics(tree, head, self.ctx.config.cell_skip());
        let mut out = RenderOutput {
            bounds: Rect::new(point.x, point.y - metrics.center, metrics.width, metrics.height()),
            ..Default::default()
        };
        self.draw_list(tree, head, point, &mut out);
        out
    }

    fn draw_list(&self, tree: &CellTree, head: CellId, mut point: Point, out: &mut RenderOutput) {
        let gap = self.ctx.config.cell_skip();
        for id in tree.draw_list(head) {
            self.draw_cell(tree, id, point, out);
            point.x += advance(&tree[id], gap);
        }
    }

    fn px(&self, length: f32) -> f32 {
        self.ctx.config.px(length)
    }

    fn metrics(&self, tree: &CellTree, head: CellId) -> ListMetrics {
        list_metrics(tree, head, self.ctx.config.cell_skip())
    }

    fn line(&self, out: &mut RenderOutput, start: Point, end: Point, color: Color) {
        out.primitives.push(PaintCommand::Line {
            start,
            end,
            thickness: self.ctx.config.stroke_width(),
            color,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn arc(
        &self,
        out: &mut RenderOutput,
        center: Point,
        radius_x: f32,
        radius_y: f32,
        start_angle: f32,
        end_angle: f32,
        color: Color,
    ) {
        out.primitives.push(PaintCommand::Arc {
            center,
            radius_x,
            radius_y,
            start_angle,
            end_angle,
            thickness: self.ctx.config.stroke_width(),
            color,
        });
    }

    /// Tall parentheses filling `top..bottom` at both ends of `x..x + width`
    fn paren_pair(&self, out: &mut RenderOutput, x: f32, width: f32, top: f32, bottom: f32, color: Color) {
        let pw = paren_width(&self.ctx);
        let radius_y = ((bottom - top) / 2.0).max(1.0);
        let mid = (top + bottom) / 2.0;
        let radius_x = (pw - self.px(2.0)).max(1.0);
        self.arc(out, Point::new(x + pw, mid), radius_x, radius_y, 90.0, 270.0, color);
        self.arc(out, Point::new(x + width - pw, mid), radius_x, radius_y, 270.0, 450.0, color);
    }

    fn draw_cell(&self, tree: &CellTree, id: CellId, point: Point, out: &mut RenderOutput) {
        out.placements.insert(id, point);
        let cell = &tree[id];
        if cell.is_broken() || is_suppressed(cell, self.ctx.config) {
            return;
        }
        let top = point.y - cell.center();
        let bottom = point.y + cell.drop();
        if !self.ctx.config.is_visible(top, bottom) {
            return;
        }
        let (x, y) = (point.x, point.y);
        let width = cell.width();
        let gap = self.ctx.config.cell_skip();
        let color = Color::for_style(cell.style, cell.highlight);

        match &cell.kind {
            CellKind::Text(_) => {
                out.primitives.push(PaintCommand::Text {
                    text: display_text(cell).to_string(),
                    position: Point::new(x, top + self.ctx.config.text_padding()),
                    font_size: self.px(cell.font_size) * cell.style.relative_size(),
                    style: cell.style,
                    color,
                });
            }
            CellKind::Image(image) => {
                let border = self.px(1.0);
                let scale = self.ctx.config.scale_factor();
                out.primitives.push(PaintCommand::Bitmap {
                    source: image.source.clone(),
                    rect: Rect::new(x + border, top + border, image.width * scale, image.height * scale),
                });
            }
            CellKind::Fraction(frac) => {
                let (x0, inner) = match frac.style {
                    FracStyle::Choose => {
                        let pw = paren_width(&self.ctx);
                        self.paren_pair(out, x, width, top, bottom, color);
                        (x + pw, width - 2.0 * pw)
                    }
                    _ => (x, width),
                };
                let num = self.metrics(tree, frac.num);
                let den = self.metrics(tree, frac.den);
                self.draw_list(
                    tree,
                    frac.num,
                    Point::new(x0 + (inner - num.width) / 2.0, y - self.px(2.0) - num.drop),
                    out,
                );
                self.draw_list(
                    tree,
                    frac.den,
                    Point::new(x0 + (inner - den.width) / 2.0, y + self.px(2.0) + den.center),
                    out,
                );
                if frac.style != FracStyle::Choose {
                    self.line(
                        out,
                        Point::new(x0 + self.px(1.0), y),
                        Point::new(x0 + inner - self.px(1.0), y),
                        color,
                    );
                }
            }
            CellKind::Exponent(expt) => {
                let base = self.metrics(tree, expt.base);
                let power = self.metrics(tree, expt.power);
                let overlap = script_overlap(base.height(), power.height());
                self.draw_list(tree, expt.base, point, out);
                self.draw_list(
                    tree,
                    expt.power,
                    Point::new(x + base.width, y - base.center - power.drop + overlap),
                    out,
                );
            }
            CellKind::Subscript { base: b, index } => {
                let base = self.metrics(tree, *b);
                let sub = self.metrics(tree, *index);
                let overlap = script_overlap(base.height(), sub.height());
                self.draw_list(tree, *b, point, out);
                self.draw_list(
                    tree,
                    *index,
                    Point::new(x + base.width, y + base.drop - overlap + sub.center),
                    out,
                );
            }
            CellKind::SubSup { base: b, sub: s, sup: p } => {
                let base = self.metrics(tree, *b);
                let sub = self.metrics(tree, *s);
                let sup = self.metrics(tree, *p);
                self.draw_list(tree, *b, point, out);
                self.draw_list(
                    tree,
                    *p,
                    Point::new(
                        x + base.width,
                        y - base.center - sup.drop + script_overlap(base.height(), sup.height()),
                    ),
                    out,
                );
                self.draw_list(
                    tree,
                    *s,
                    Point::new(
                        x + base.width,
                        y + base.drop - script_overlap(base.height(), sub.height()) + sub.center,
                    ),
                    out,
                );
            }
            CellKind::At { base: b, index } => {
                let base = self.metrics(tree, *b);
                let sub = self.metrics(tree, *index);
                self.draw_list(tree, *b, point, out);
                let bar = x + base.width + self.px(2.0);
                self.line(out, Point::new(bar, top), Point::new(bar, bottom), color);
                self.draw_list(
                    tree,
                    *index,
                    Point::new(
                        bar + self.px(2.0),
                        y + base.drop - script_overlap(base.height(), sub.height()) + sub.center,
                    ),
                    out,
                );
            }
            CellKind::Integral(int) => {
                let sign = integral_sign(tree, int, cell.font_size, &self.ctx);
                let stem = x + sign.half;
                let sign_top = y - sign.size / 2.0;
                let sign_bottom = y + sign.size / 2.0;
                let radius = self.px(3.0);
                self.line(
                    out,
                    Point::new(stem, sign_top + radius),
                    Point::new(stem, sign_bottom - radius),
                    color,
                );
                self.arc(out, Point::new(stem + radius, sign_top + radius), radius, radius, 180.0, 270.0, color);
                self.arc(out, Point::new(stem - radius, sign_bottom - radius), radius, radius, 0.0, 90.0, color);
                if let Some((under, over)) = int.limits {
                    let over_metrics = self.metrics(tree, over);
                    let under_metrics = self.metrics(tree, under);
                    self.draw_list(
                        tree,
                        over,
                        Point::new(stem - over_metrics.width / 2.0, sign_top - over_metrics.drop),
                        out,
                    );
                    self.draw_list(
                        tree,
                        under,
                        Point::new(stem - under_metrics.width / 2.0, sign_bottom + under_metrics.center),
                        out,
                    );
                }
                let base_x = x + 2.0 * sign.half;
                let base = self.metrics(tree, int.base);
                self.draw_list(tree, int.base, Point::new(base_x, y), out);
                self.draw_list(tree, int.var, Point::new(base_x + base.width + gap, y), out);
            }
            CellKind::Sum(sum) => {
                let sign = sum_sign(tree, sum, cell.font_size, &self.ctx);
                let stem = x + sign.half;
                let half = sign.half * 0.8;
                let (left, right) = (stem - half, stem + half);
                let sign_top = y - sign.size / 2.0;
                let sign_bottom = y + sign.size / 2.0;
                match sum.style {
                    SumStyle::Sum => {
                        let l = Point::new(left, sign_top);
                        self.line(out, l, Point::new(right, sign_top), color);
                        self.line(out, l, Point::new(stem, y), color);
                        self.line(out, Point::new(stem, y), Point::new(left, sign_bottom), color);
                        self.line(out, Point::new(left, sign_bottom), Point::new(right, sign_bottom), color);
                    }
                    SumStyle::Product => {
                        let inset = half / 2.5;
                        self.line(out, Point::new(left, sign_top), Point::new(right, sign_top), color);
                        self.line(
                            out,
                            Point::new(left + inset, sign_top),
                            Point::new(left + inset, sign_bottom),
                            color,
                        );
                        self.line(
                            out,
                            Point::new(right - inset, sign_top),
                            Point::new(right - inset, sign_bottom),
                            color,
                        );
                    }
                }
                let over = self.metrics(tree, sum.over);
                let under = self.metrics(tree, sum.under);
                self.draw_list(tree, sum.over, Point::new(stem - over.width / 2.0, sign_top - over.drop), out);
                self.draw_list(
                    tree,
                    sum.under,
                    Point::new(stem - under.width / 2.0, sign_bottom + under.center),
                    out,
                );
                self.draw_list(tree, sum.base, Point::new(x + 2.0 * sign.half + gap, y), out);
            }
            CellKind::Limit { name, under, base } => {
                let name_metrics = self.metrics(tree, *name);
                let under_metrics = self.metrics(tree, *under);
                let column = name_metrics.width.max(under_metrics.width);
                self.draw_list(tree, *name, Point::new(x + (column - name_metrics.width) / 2.0, y), out);
                self.draw_list(
                    tree,
                    *under,
                    Point::new(
                        x + (column - under_metrics.width) / 2.0,
                        y + name_metrics.drop + under_metrics.center,
                    ),
                    out,
                );
                self.draw_list(tree, *base, Point::new(x + column + gap, y), out);
            }
            CellKind::Abs(d) => {
                let left = x + self.px(2.0);
                let right = x + width - self.px(2.0);
                let (from, to) = (top + self.px(1.0), bottom - self.px(1.0));
                self.line(out, Point::new(left, from), Point::new(left, to), color);
                self.line(out, Point::new(right, from), Point::new(right, to), color);
                self.draw_list(
                    tree,
                    d.inner,
                    Point::new(x + self.px(4.0) + self.ctx.config.stroke_width(), y),
                    out,
                );
            }
            CellKind::Conjugate(d) => {
                let bar = top + self.px(1.0);
                self.line(
                    out,
                    Point::new(x + self.px(2.0), bar),
                    Point::new(x + width - self.px(2.0), bar),
                    color,
                );
                self.draw_list(tree, d.inner, Point::new(x + self.px(4.0), y), out);
            }
            CellKind::Sqrt(d) => {
                let sign = sqrt_sign_width(cell.font_size, &self.ctx);
                let bar = top + self.px(1.0);
                let tick = Point::new(x, y);
                let valley = Point::new(x + sign / 3.0, bottom - self.px(1.0));
                let peak = Point::new(x + sign, bar);
                self.line(out, tick, valley, color);
                self.line(out, valley, peak, color);
                self.line(out, peak, Point::new(x + width, bar), color);
                self.draw_list(tree, d.inner, Point::new(x + sign + self.px(1.0), y), out);
            }
            CellKind::Paren { delimited, print } => {
                if *print {
                    if !self.ctx.config.hide_brackets() || is_active(tree, id) {
                        self.paren_pair(out, x, width, top, bottom, color);
                    }
                    self.draw_list(tree, delimited.inner, Point::new(x + paren_width(&self.ctx), y), out);
                } else {
                    self.draw_list(tree, delimited.inner, point, out);
                }
            }
            CellKind::Function { name: first, arg: second } => {
                let lead = self.metrics(tree, *first);
                self.draw_list(tree, *first, point, out);
                self.draw_list(tree, *second, Point::new(x + lead.width, y), out);
            }
            CellKind::Diff { diff, base } => {
                let lead = self.metrics(tree, *diff);
                self.draw_list(tree, *diff, point, out);
                self.draw_list(tree, *base, Point::new(x + lead.width + gap, y), out);
            }
            CellKind::Matrix { rows } => {
                let bracket = self.px(MATRIX_BRACKET);
                let (from, to) = (top + self.px(1.0), bottom - self.px(1.0));
                let (left, right) = (x + self.px(2.0), x + width - self.px(2.0));
                self.line(out, Point::new(left, from), Point::new(left, to), color);
                self.line(out, Point::new(left, from), Point::new(x + bracket, from), color);
                self.line(out, Point::new(left, to), Point::new(x + bracket, to), color);
                self.line(out, Point::new(right, from), Point::new(right, to), color);
                self.line(out, Point::new(right, from), Point::new(x + width - bracket, from), color);
                self.line(out, Point::new(right, to), Point::new(x + width - bracket, to), color);

                let (columns, row_metrics) = matrix_grid(tree, rows, gap);
                let mut row_top = top + self.px(2.0);
                for (row, (center, drop)) in rows.iter().zip(row_metrics) {
                    let mut column_x = x + bracket;
                    for (&entry, column_width) in row.iter().zip(&columns) {
                        let entry_width = self.metrics(tree, entry).width;
                        self.draw_list(
                            tree,
                            entry,
                            Point::new(column_x + (column_width - entry_width) / 2.0, row_top + center),
                            out,
                        );
                        column_x += column_width + self.px(MATRIX_COLUMN_GAP);
                    }
                    row_top += center + drop + self.px(MATRIX_ROW_GAP);
                }
            }
        }
    }
}

/// Whether the cell under the pointer or an end of the selection lies
/// inside `id`
fn is_active(tree: &CellTree, id: CellId) -> bool {
    let mut anchors: Vec<CellId> = tree.cell_under_pointer().into_iter().collect();
    if let Some((start, end)) = tree.selection() {
        anchors.extend([start, end]);
    }
    anchors.into_iter().any(|anchor| {
        let mut current = Some(anchor);
        while let Some(cell) = current {
            if cell == id {
                return true;
            }
            current = tree[cell].parent();
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::TextKind;
    use crate::config::{Configuration, Viewport};
    use crate::linebreak::LineBreaker;
    use crate::metrics::ApproxMeasure;

    fn var(tree: &mut CellTree, name: &str) -> CellId {
        tree.text(name, TextKind::Variable, TextStyle::Variable)
    }

    fn texts(output: &RenderOutput) -> Vec<String> {
        output
            .primitives
            .iter()
            .filter_map(|p| match p {
                PaintCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_color_creation() {
        let color = Color::rgb(255, 128, 0);
        assert_eq!(color.a, 255);
        assert_eq!(Color::default(), Color::BLACK);
        assert_eq!(Color::for_style(TextStyle::Variable, true), Color::RED);
    }

    #[test]
    fn test_render_fraction() {
        let config = Configuration::default();
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let num = var(&mut tree, "a");
        let den = var(&mut tree, "b");
        let frac = tree.fraction(num, den, FracStyle::Normal);
        let layout = LineBreaker::new(ctx).layout(&mut tree, frac);
        let output = Renderer::new(ctx).render(&tree, &layout, Point::origin());

        assert_eq!(texts(&output), vec!["a", "b"]);
        assert!(output
            .primitives
            .iter()
            .any(|p| matches!(p, PaintCommand::Line { .. })));
        let a = output.placement(num).unwrap();
        let b = output.placement(den).unwrap();
        assert!(a.y < b.y);
    }

    #[test]
    fn test_hidden_brackets_show_when_active() {
        let config = Configuration {
            hide_brackets: true,
            ..Default::default()
        };
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "x");
        let paren = tree.paren(inner, true);
        let layout = LineBreaker::new(ctx).layout(&mut tree, paren);
        let arcs = |output: &RenderOutput| {
            output
                .primitives
                .iter()
                .filter(|p| matches!(p, PaintCommand::Arc { .. }))
                .count()
        };

        let idle = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert_eq!(arcs(&idle), 0);
        assert_eq!(texts(&idle), vec!["x"]);

        tree.pointers_mut().set_cell_under_pointer(Some(inner));
        let active = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert_eq!(arcs(&active), 2);
        assert_eq!(active.placement(inner), idle.placement(inner));
    }

    #[test]
    fn test_render_is_repeatable() {
        let config = Configuration::default();
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "x");
        let sqrt = tree.sqrt(inner);
        let lower = var(&mut tree, "0");
        let upper = var(&mut tree, "1");
        let base = tree.paren(sqrt, true);
        let dx = var(&mut tree, "dx");
        let int = tree.integral(base, dx, Some((lower, upper)));
        let layout = LineBreaker::new(ctx).layout(&mut tree, int);
        let renderer = Renderer::new(ctx);
        let first = renderer.render(&tree, &layout, Point::origin());
        let second = renderer.render(&tree, &layout, Point::origin());
        assert_eq!(first.primitives, second.primitives);
        assert_eq!(first.placements, second.placements);
        assert!(first.primitives.iter().any(|p| matches!(p, PaintCommand::Arc { .. })));
    }

    #[test]
    fn test_broken_cell_draws_its_parts() {
        let config = Configuration {
            client_width: 30.0,
            ..Default::default()
        };
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "alpha");
        let next = var(&mut tree, "beta");
        tree.append(inner, next);
        let abs = tree.abs(inner);
        let layout = LineBreaker::new(ctx).layout(&mut tree, abs);
        let output = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert!(tree[abs].is_broken());
        assert_eq!(texts(&output), vec!["abs(", "alpha", "beta", ")"]);
    }

    #[test]
    fn test_viewport_culls_offscreen_lines() {
        let config = Configuration {
            viewport: Some(Viewport::new(0.0, 10.0)),
            ..Default::default()
        };
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let head = var(&mut tree, "a");
        let below = var(&mut tree, "b");
        tree[below].force_break_line = true;
        tree.append(head, below);
        let layout = LineBreaker::new(ctx).layout(&mut tree, head);
        let output = Renderer::new(ctx).render(&tree, &layout, Point::new(0.0, 100.0));
        assert!(texts(&output).is_empty());
        // Positions are still recorded for hit testing.
        assert!(output.placement(below).is_some());

        let output = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert_eq!(texts(&output), vec!["a"]);
    }

    #[test]
    fn test_image_paints_bitmap() {
        let config = Configuration::default();
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let image = tree.image("plot.png", 40.0, 30.0);
        let layout = LineBreaker::new(ctx).layout(&mut tree, image);
        let output = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert!(matches!(
            &output.primitives[..],
            [PaintCommand::Bitmap { source, .. }] if source == "plot.png"
        ));
    }
}
