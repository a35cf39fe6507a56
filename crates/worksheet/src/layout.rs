//! Cell measurement
//!
//! Layout runs in two passes. The width pass measures every cell of a list
//! (children first, then the composite from its children). The height pass
//! does the same for height and center once line breaking has settled which
//! cells are broken. Both passes store their results in [`Cell::geometry`].

use crate::breakup::segments;
use crate::cell::{Cell, CellId, CellKind, FracStyle, IntCell, SumCell, TextStyle};
use crate::config::Configuration;
use crate::metrics::TextMeasure;
use crate::tree::CellTree;

/// Smallest font size a script or limit is reduced to
pub const MIN_FONT_SIZE: f32 = 6.0;
/// Smallest font size for integral and sum limits
pub const MIN_LIMIT_FONT_SIZE: f32 = 8.0;

/// Everything layout and painting read besides the tree itself
#[derive(Clone, Copy)]
pub struct LayoutContext<'a> {
    pub config: &'a Configuration,
    pub measure: &'a dyn TextMeasure,
}

impl<'a> LayoutContext<'a> {
    pub fn new(config: &'a Configuration, measure: &'a dyn TextMeasure) -> Self {
        Self { config, measure }
    }

    fn px(&self, length: f32) -> f32 {
        self.config.px(length)
    }
}

/// Extent of a list measured along its logical chain
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListMetrics {
    pub width: f32,
    pub center: f32,
    pub drop: f32,
}

impl ListMetrics {
    pub fn height(&self) -> f32 {
        self.center + self.drop
    }
}

// =============================================================================
// Font sizes
// =============================================================================

fn script_size(font_size: f32) -> f32 {
    (font_size - 2.0).max(MIN_FONT_SIZE)
}

fn limit_size(font_size: f32) -> f32 {
    (font_size - 5.0).max(MIN_LIMIT_FONT_SIZE)
}

fn at_size(font_size: f32) -> f32 {
    (font_size - 4.0).max(MIN_LIMIT_FONT_SIZE)
}

/// Font size each owned list of a variant is laid out at
pub(crate) fn child_font_sizes(kind: &CellKind, font_size: f32) -> Vec<(CellId, f32)> {
    let mut sizes: Vec<(CellId, f32)> = match kind {
        CellKind::Exponent(expt) => vec![(expt.base, font_size), (expt.power, script_size(font_size))],
        CellKind::Subscript { base, index } => {
            vec![(*base, font_size), (*index, script_size(font_size))]
        }
        CellKind::SubSup { base, sub, sup } => vec![
            (*base, font_size),
            (*sub, script_size(font_size)),
            (*sup, script_size(font_size)),
        ],
        CellKind::Integral(int) => {
            let mut sizes = vec![(int.base, font_size), (int.var, font_size)];
            if let Some((under, over)) = int.limits {
                sizes.push((under, limit_size(font_size)));
                sizes.push((over, limit_size(font_size)));
            }
            sizes
        }
        CellKind::Sum(sum) => vec![
            (sum.under, limit_size(font_size)),
            (sum.over, limit_size(font_size)),
            (sum.base, font_size),
        ],
        CellKind::Limit { name, under, base } => vec![
            (*name, font_size),
            (*under, (font_size - 1.0).max(MIN_FONT_SIZE)),
            (*base, font_size),
        ],
        CellKind::At { base, index } => vec![(*base, font_size), (*index, at_size(font_size))],
        other => other.child_lists().into_iter().map(|id| (id, font_size)).collect(),
    };
    sizes.extend(kind.decorations().into_iter().map(|id| (id, font_size)));
    sizes
}

/// Cells that take no room: hidden ones and those switched off in the
/// configuration.
pub fn is_suppressed(cell: &Cell, config: &Configuration) -> bool {
    cell.is_hidden
        || (cell.style == TextStyle::Label && !config.show_automatic_labels)
        || (cell.style == TextStyle::Input && !config.show_code_cells)
}

/// Text a leaf shows on screen
pub fn display_text(cell: &Cell) -> &str {
    match &cell.kind {
        CellKind::Text(text) => match (&text.user_label, cell.style) {
            (Some(label), TextStyle::UserLabel) => label,
            _ => &text.value,
        },
        _ => "",
    }
}

// =============================================================================
// List metrics
// =============================================================================

/// Horizontal room a cell takes including the gap to its successor
pub fn advance(cell: &Cell, gap: f32) -> f32 {
    let width = cell.width();
    if width > 0.0 {
        width + gap
    } else {
        0.0
    }
}

/// Width of a list laid out on a single line
pub fn full_width(tree: &CellTree, head: CellId, gap: f32) -> f32 {
    let total: f32 = tree.list(head).map(|id| advance(&tree[id], gap)).sum();
    (total - gap).max(0.0)
}

/// Width, center, and drop of a list laid out on a single line
pub fn list_metrics(tree: &CellTree, head: CellId, gap: f32) -> ListMetrics {
    let mut metrics = ListMetrics {
        width: full_width(tree, head, gap),
        ..Default::default()
    };
    for id in tree.list(head) {
        let cell = &tree[id];
        metrics.center = metrics.center.max(cell.center());
        metrics.drop = metrics.drop.max(cell.drop());
    }
    metrics
}

// =============================================================================
// Sign sizes shared with painting
// =============================================================================

/// Size of a big operator sign (integral or sum) and its half width
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SignMetrics {
    pub half: f32,
    pub size: f32,
}

pub(crate) fn integral_sign(
    tree: &CellTree,
    int: &IntCell,
    font_size: f32,
    ctx: &LayoutContext<'_>,
) -> SignMetrics {
    let gap = ctx.config.cell_skip();
    let base = list_metrics(tree, int.base, gap);
    let var = list_metrics(tree, int.var, gap);
    let mut half = ctx.px(6.0);
    if let Some((under, over)) = int.limits {
        half = half
            .max(full_width(tree, under, gap) / 2.0)
            .max(full_width(tree, over, gap) / 2.0);
    }
    let size = base
        .height()
        .max(var.height())
        .max(ctx.px(font_size * 1.5))
        + ctx.px(4.0);
    SignMetrics { half, size }
}

pub(crate) fn sum_sign(
    tree: &CellTree,
    sum: &SumCell,
    font_size: f32,
    ctx: &LayoutContext<'_>,
) -> SignMetrics {
    let gap = ctx.config.cell_skip();
    let half = ctx
        .px(font_size * 0.6)
        .max(full_width(tree, sum.under, gap) / 2.0)
        .max(full_width(tree, sum.over, gap) / 2.0);
    let size = list_metrics(tree, sum.base, gap)
        .height()
        .max(ctx.px(font_size * 1.5));
    SignMetrics { half, size }
}

pub(crate) fn sqrt_sign_width(font_size: f32, ctx: &LayoutContext<'_>) -> f32 {
    ctx.px(font_size * 0.6) + ctx.px(4.0)
}

pub(crate) fn paren_width(ctx: &LayoutContext<'_>) -> f32 {
    ctx.px(6.0) + ctx.config.stroke_width()
}

/// How far two stacked boxes overlap vertically
pub(crate) fn script_overlap(a: f32, b: f32) -> f32 {
    a.min(b) / 2.0
}

pub(crate) const MATRIX_COLUMN_GAP: f32 = 10.0;
pub(crate) const MATRIX_ROW_GAP: f32 = 6.0;
pub(crate) const MATRIX_BRACKET: f32 = 6.0;

/// Column widths and per-row (center, drop) of a matrix
pub(crate) fn matrix_grid(
    tree: &CellTree,
    rows: &[Vec<CellId>],
    gap: f32,
) -> (Vec<f32>, Vec<(f32, f32)>) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0.0_f32; columns];
    let mut row_metrics = Vec::with_capacity(rows.len());
    for row in rows {
        let mut center = 0.0_f32;
        let mut drop = 0.0_f32;
        for (column, &entry) in row.iter().enumerate() {
            let metrics = list_metrics(tree, entry, gap);
            widths[column] = widths[column].max(metrics.width);
            center = center.max(metrics.center);
            drop = drop.max(metrics.drop);
        }
        row_metrics.push((center, drop));
    }
    (widths, row_metrics)
}

// =============================================================================
// Width pass
// =============================================================================

pub fn recalculate_widths_list(tree: &mut CellTree, head: CellId, font_size: f32, ctx: &LayoutContext<'_>) {
    let ids: Vec<CellId> = tree.list(head).collect();
    for id in ids {
        recalculate_widths(tree, id, font_size, ctx);
    }
}

/// Measure the width of one cell after measuring everything it owns
pub fn recalculate_widths(tree: &mut CellTree, id: CellId, font_size: f32, ctx: &LayoutContext<'_>) {
    for (child, size) in child_font_sizes(&tree[id].kind, font_size) {
        recalculate_widths_list(tree, child, size, ctx);
    }
    let cell = &tree[id];
    let width = if cell.is_broken || is_suppressed(cell, ctx.config) {
        0.0
    } else {
        own_width(tree, cell, font_size, ctx)
    };
    let cell = &mut tree[id];
    cell.font_size = font_size;
    cell.geometry.width = Some(width);
}

fn own_width(tree: &CellTree, cell: &Cell, font_size: f32, ctx: &LayoutContext<'_>) -> f32 {
    let gap = ctx.config.cell_skip();
    let width = |list: CellId| full_width(tree, list, gap);
    match &cell.kind {
        CellKind::Text(_) => {
            let extent = ctx
                .measure
                .text_extent(display_text(cell), cell.style, ctx.px(font_size));
            extent.width.max(1.0)
        }
        CellKind::Image(image) => {
            image.width * ctx.config.scale_factor() + 2.0 * ctx.px(1.0)
        }
        CellKind::Fraction(frac) => {
            let inner = width(frac.num).max(width(frac.den)) + ctx.px(4.0);
            match frac.style {
                FracStyle::Choose => inner + 2.0 * paren_width(ctx),
                _ => inner,
            }
        }
        CellKind::Exponent(expt) => width(expt.base) + width(expt.power),
        CellKind::Subscript { base, index } => width(*base) + width(*index),
        CellKind::SubSup { base, sub, sup } => width(*base) + width(*sub).max(width(*sup)),
        CellKind::Integral(int) => {
            let sign = integral_sign(tree, int, font_size, ctx);
            2.0 * sign.half + width(int.base) + gap + width(int.var)
        }
        CellKind::Sum(sum) => {
            let sign = sum_sign(tree, sum, font_size, ctx);
            2.0 * sign.half + gap + width(sum.base)
        }
        CellKind::Limit { name, under, base } => {
            width(*name).max(width(*under)) + gap + width(*base)
        }
        CellKind::Abs(d) => width(d.inner) + ctx.px(8.0) + 2.0 * ctx.config.stroke_width(),
        CellKind::Conjugate(d) => width(d.inner) + ctx.px(8.0),
        CellKind::Sqrt(d) => sqrt_sign_width(font_size, ctx) + width(d.inner) + ctx.px(2.0),
        CellKind::Paren { delimited, print } => {
            if *print {
                width(delimited.inner) + 2.0 * paren_width(ctx)
            } else {
                width(delimited.inner)
            }
        }
        CellKind::Function { name, arg } => width(*name) + width(*arg),
        CellKind::At { base, index } => width(*base) + ctx.px(4.0) + width(*index),
        CellKind::Diff { diff, base } => width(*diff) + gap + width(*base),
        CellKind::Matrix { rows } => {
            let (columns, _) = matrix_grid(tree, rows, gap);
            let spacing = columns.len().saturating_sub(1) as f32 * ctx.px(MATRIX_COLUMN_GAP);
            columns.iter().sum::<f32>() + spacing + 2.0 * ctx.px(MATRIX_BRACKET)
        }
    }
}

// =============================================================================
// Height pass
// =============================================================================

pub fn recalculate_height_list(tree: &mut CellTree, head: CellId, font_size: f32, ctx: &LayoutContext<'_>) {
    let ids: Vec<CellId> = tree.list(head).collect();
    for id in ids {
        recalculate_height(tree, id, font_size, ctx);
    }
}

/// Measure height and center of one cell after measuring everything it owns.
///
/// A cell whose width was never measured gets its width pass first.
pub fn recalculate_height(tree: &mut CellTree, id: CellId, font_size: f32, ctx: &LayoutContext<'_>) {
    if tree[id].geometry.width.is_none() {
        tracing::trace!(kind = tree[id].kind.name(), "height requested before width, measuring width first");
        recalculate_widths(tree, id, font_size, ctx);
    }
    for (child, size) in child_font_sizes(&tree[id].kind, font_size) {
        recalculate_height_list(tree, child, size, ctx);
    }
    let cell = &tree[id];
    let (height, center) = if cell.is_broken {
        broken_height(tree, &cell.kind)
    } else {
        own_height(tree, cell, font_size, ctx)
    };
    let height = height.max(1.0);
    let cell = &mut tree[id];
    cell.geometry.height = Some(height);
    cell.geometry.center = Some(center.clamp(0.0, height));
}

/// Height and center of a broken cell: as tall as the tallest of its parts
pub(crate) fn broken_height(tree: &CellTree, kind: &CellKind) -> (f32, f32) {
    let mut center = 0.0_f32;
    let mut drop = 0.0_f32;
    for part in segments(kind) {
        let metrics = list_metrics(tree, part, 0.0);
        center = center.max(metrics.center);
        drop = drop.max(metrics.drop);
    }
    (center + drop, center)
}

fn own_height(tree: &CellTree, cell: &Cell, font_size: f32, ctx: &LayoutContext<'_>) -> (f32, f32) {
    let gap = ctx.config.cell_skip();
    let metrics = |list: CellId| list_metrics(tree, list, gap);
    match &cell.kind {
        CellKind::Text(_) => {
            let extent = ctx
                .measure
                .text_extent(display_text(cell), cell.style, ctx.px(font_size));
            let height = extent.height.max(1.0) + 2.0 * ctx.config.text_padding();
            (height, height / 2.0)
        }
        CellKind::Image(image) => {
            let height = image.height * ctx.config.scale_factor() + 2.0 * ctx.px(1.0);
            (height, height / 2.0)
        }
        CellKind::Fraction(frac) => {
            let num = metrics(frac.num).height();
            let den = metrics(frac.den).height();
            (num + den + ctx.px(4.0), num + ctx.px(2.0))
        }
        CellKind::Exponent(expt) => {
            let base = metrics(expt.base);
            let power = metrics(expt.power).height();
            let height = power + base.height() - script_overlap(base.height(), power);
            (height, height - base.drop)
        }
        CellKind::Subscript { base, index } => {
            let base = metrics(*base);
            let index = metrics(*index).height();
            let height = base.height() + index - script_overlap(base.height(), index);
            (height, base.center)
        }
        CellKind::SubSup { base, sub, sup } => {
            let base = metrics(*base);
            let sub = metrics(*sub).height();
            let sup = metrics(*sup).height();
            let above = sup - script_overlap(base.height(), sup);
            let below = sub - script_overlap(base.height(), sub);
            (above + base.height() + below, above + base.center)
        }
        CellKind::Integral(int) => {
            let sign = integral_sign(tree, int, font_size, ctx);
            match int.limits {
                Some((under, over)) => {
                    let base = metrics(int.base);
                    let over = metrics(over).height();
                    let under = metrics(under).height();
                    let center = over + (sign.size / 2.0).max(base.center);
                    let drop = (sign.size / 2.0 + under).max(base.drop);
                    (center + drop, center)
                }
                None => (sign.size + ctx.px(6.0), sign.size / 2.0 + ctx.px(3.0)),
            }
        }
        CellKind::Sum(sum) => {
            let sign = sum_sign(tree, sum, font_size, ctx);
            let base = metrics(sum.base);
            let over = metrics(sum.over).height();
            let under = metrics(sum.under).height();
            let center = over + (sign.size / 2.0).max(base.center);
            let drop = (sign.size / 2.0 + under).max(base.drop);
            (center + drop, center)
        }
        CellKind::Limit { name, under, base } => {
            let name = metrics(*name);
            let under = metrics(*under).height();
            let base = metrics(*base);
            let center = name.center.max(base.center);
            let drop = (name.drop + under).max(base.drop);
            (center + drop, center)
        }
        CellKind::Abs(d) | CellKind::Conjugate(d) => {
            let inner = metrics(d.inner);
            (inner.height() + ctx.px(4.0), inner.center + ctx.px(2.0))
        }
        CellKind::Sqrt(d) => {
            let inner = metrics(d.inner);
            (inner.height() + ctx.px(3.0), inner.center + ctx.px(3.0))
        }
        CellKind::Paren { delimited, print } => {
            let inner = metrics(delimited.inner);
            if *print {
                (inner.height() + ctx.px(2.0), inner.center + ctx.px(1.0))
            } else {
                (inner.height(), inner.center)
            }
        }
        CellKind::Function { name: a, arg: b } | CellKind::Diff { diff: a, base: b } => {
            let a = metrics(*a);
            let b = metrics(*b);
            let center = a.center.max(b.center);
            (center + a.drop.max(b.drop), center)
        }
        CellKind::At { base, index } => {
            let base = metrics(*base);
            let index = metrics(*index).height();
            let height = base.height() + index - script_overlap(base.height(), index);
            (height, base.center)
        }
        CellKind::Matrix { rows } => {
            let (_, row_metrics) = matrix_grid(tree, rows, gap);
            let content: f32 = row_metrics.iter().map(|(c, d)| c + d).sum();
            let spacing = row_metrics.len().saturating_sub(1) as f32 * ctx.px(MATRIX_ROW_GAP);
            let height = (content + spacing + ctx.px(4.0)).max(ctx.px(font_size));
            (height, height / 2.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{SumStyle, TextKind};
    use crate::geometry::Size;
    use crate::metrics::ApproxMeasure;

    /// Every character is 10 units wide and 10 units tall
    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn text_extent(&self, text: &str, _style: TextStyle, _font_size: f32) -> Size {
            Size::new(10.0 * text.chars().count() as f32, 10.0)
        }
    }

    fn var(tree: &mut CellTree, name: &str) -> CellId {
        tree.text(name, TextKind::Variable, TextStyle::Variable)
    }

    fn measure(tree: &mut CellTree, head: CellId, config: &Configuration) {
        let ctx = LayoutContext::new(config, &FixedMeasure);
        recalculate_widths_list(tree, head, 12.0, &ctx);
        recalculate_height_list(tree, head, 12.0, &ctx);
    }

    #[test]
    fn test_text_geometry() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let x = var(&mut tree, "xy");
        measure(&mut tree, x, &config);
        assert_eq!(tree[x].width(), 20.0);
        // 10 units of text plus one unit of padding above and below
        assert_eq!(tree[x].height(), 12.0);
        assert_eq!(tree[x].center(), 6.0);
    }

    #[test]
    fn test_empty_text_is_clamped() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let empty = tree.text("", TextKind::Text, TextStyle::Default);
        measure(&mut tree, empty, &config);
        assert_eq!(tree[empty].width(), 1.0);
    }

    #[test]
    fn test_full_width_counts_gaps() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let a = var(&mut tree, "a");
        let b = var(&mut tree, "b");
        let c = var(&mut tree, "c");
        tree.append(a, b);
        tree.append(a, c);
        measure(&mut tree, a, &config);
        assert_eq!(full_width(&tree, a, config.cell_skip()), 34.0);
    }

    #[test]
    fn test_fraction_stacks_children() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let num = var(&mut tree, "abc");
        let den = var(&mut tree, "d");
        let frac = tree.fraction(num, den, FracStyle::Normal);
        measure(&mut tree, frac, &config);
        assert_eq!(tree[frac].width(), 34.0);
        assert_eq!(tree[frac].height(), 28.0);
        assert_eq!(tree[frac].center(), 14.0);
    }

    #[test]
    fn test_exponent_uses_smaller_font() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let base = var(&mut tree, "x");
        let power = var(&mut tree, "2");
        let expt = tree.exponent(base, power, false);
        measure(&mut tree, expt, &config);
        assert_eq!(tree[power].font_size, 10.0);
        assert_eq!(tree[base].font_size, 12.0);
        assert!(tree[expt].center() > tree[base].center());
    }

    #[test]
    fn test_hidden_cell_has_no_width() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let times = tree.text("*", TextKind::Operator, TextStyle::Operator);
        tree[times].is_hidden = true;
        measure(&mut tree, times, &config);
        assert_eq!(tree[times].width(), 0.0);
        assert!(tree[times].height() > 0.0);
    }

    #[test]
    fn test_automatic_labels_can_be_switched_off() {
        let config = Configuration {
            show_automatic_labels: false,
            ..Default::default()
        };
        let mut tree = CellTree::new();
        let label = tree.text("(%o1)", TextKind::Text, TextStyle::Label);
        measure(&mut tree, label, &config);
        assert_eq!(tree[label].width(), 0.0);
    }

    #[test]
    fn test_height_before_width_measures_width() {
        let config = Configuration::default();
        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let mut tree = CellTree::new();
        let inner = var(&mut tree, "x");
        let root = tree.sqrt(inner);
        recalculate_height(&mut tree, root, 12.0, &ctx);
        assert!(tree[root].geometry.is_known());
        assert!(tree[inner].geometry.is_known());
    }

    #[test]
    fn test_every_variant_gets_known_geometry() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let cells = {
            let a = var(&mut tree, "a");
            let b = var(&mut tree, "b");
            let c = var(&mut tree, "c");
            let d = var(&mut tree, "d");
            let int = tree.integral(a, b, Some((c, d)));
            let e = var(&mut tree, "e");
            let f = var(&mut tree, "f");
            let g = var(&mut tree, "g");
            let sum = tree.sum(e, f, g, SumStyle::Product);
            let h = var(&mut tree, "h");
            let i = var(&mut tree, "i");
            let j = var(&mut tree, "j");
            let k = var(&mut tree, "k");
            let matrix = tree.matrix(vec![vec![h, i], vec![j, k]]);
            let image = tree.image("plot.png", 40.0, 30.0);
            vec![int, sum, matrix, image]
        };
        for id in cells {
            measure(&mut tree, id, &config);
            assert!(tree[id].geometry.is_known(), "{}", tree[id].kind.name());
            assert!(tree[id].width() > 0.0);
            assert!(tree[id].center() <= tree[id].height());
        }
    }
}
