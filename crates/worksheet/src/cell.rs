//! Cell model
//!
//! A worksheet is a tree of cells stored in a [`CellTree`](crate::tree::CellTree)
//! arena. Every cell carries two successor links: the logical link that
//! defines document order and owns the rest of the list, and the draw link
//! that defines the order cells are painted in once composites have been
//! broken up for line wrapping.

use serde::{Deserialize, Serialize};

slotmap::new_key_type! {
    /// Handle to a cell in a [`CellTree`](crate::tree::CellTree)
    pub struct CellId;
}

// =============================================================================
// Styles
// =============================================================================

/// Text style of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextStyle {
    #[default]
    Default,
    Variable,
    Number,
    Function,
    Special,
    Greek,
    String,
    Operator,
    Label,
    UserLabel,
    Input,
    Error,
    Warning,
    MainPrompt,
    OtherPrompt,
    Text,
    Title,
    Section,
    Subsection,
    Subsubsection,
    Placeholder,
}

impl TextStyle {
    /// Font size multiplier relative to the cell's font size
    pub fn relative_size(self) -> f32 {
        match self {
            TextStyle::Title => 1.6,
            TextStyle::Section => 1.4,
            TextStyle::Subsection => 1.2,
            TextStyle::Subsubsection => 1.1,
            _ => 1.0,
        }
    }

    pub fn is_label(self) -> bool {
        matches!(self, TextStyle::Label | TextStyle::UserLabel)
    }

    pub fn is_heading(self) -> bool {
        matches!(
            self,
            TextStyle::Title | TextStyle::Section | TextStyle::Subsection | TextStyle::Subsubsection
        )
    }

    /// Styles that come from the surrounding markup rather than the leaf tag
    pub fn is_contextual(self) -> bool {
        self.is_label() || self.is_heading() || matches!(self, TextStyle::Input | TextStyle::Error)
    }
}

/// How a fraction is typeset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FracStyle {
    /// Numerator over denominator with a bar
    #[default]
    Normal,
    /// Binomial coefficient, no bar, in parentheses
    Choose,
    /// The `d/dx` part of a differential
    Diff,
}

/// Whether a sum cell is a sum or a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SumStyle {
    #[default]
    Sum,
    Product,
}

/// Markup element a text leaf was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextKind {
    Variable,
    Number,
    Operator,
    String,
    #[default]
    Text,
    Space,
}

impl TextKind {
    /// Style a leaf of this kind gets outside any styling context
    pub fn default_style(self) -> TextStyle {
        match self {
            TextKind::Variable => TextStyle::Variable,
            TextKind::Number => TextStyle::Number,
            TextKind::Operator => TextStyle::Operator,
            TextKind::String => TextStyle::String,
            TextKind::Text | TextKind::Space => TextStyle::Default,
        }
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Cached layout results. `None` means not measured since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub center: Option<f32>,
}

impl Geometry {
    pub fn is_known(&self) -> bool {
        self.width.is_some() && self.height.is_some() && self.center.is_some()
    }

    /// Extent below the center line
    pub fn drop(&self) -> Option<f32> {
        match (self.height, self.center) {
            (Some(height), Some(center)) => Some(height - center),
            _ => None,
        }
    }
}

// =============================================================================
// Variants
// =============================================================================

/// A run of text
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub value: String,
    pub kind: TextKind,
    /// Label text chosen by the user, shown instead of the automatic one
    pub user_label: Option<String>,
}

/// An embedded picture
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCell {
    /// File name or other reference the host resolves
    pub source: String,
    pub width: f32,
    pub height: f32,
}

/// A single inner list between an opening and a closing decoration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delimited {
    pub inner: CellId,
    pub open: CellId,
    pub close: CellId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FracCell {
    pub num: CellId,
    pub den: CellId,
    pub style: FracStyle,
    pub open_num: CellId,
    pub close_num: CellId,
    pub divide: CellId,
    pub open_den: CellId,
    pub close_den: CellId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExptCell {
    pub base: CellId,
    pub power: CellId,
    /// Exponent of a matrix (`^^` in linear form)
    pub is_matrix: bool,
    pub open: CellId,
    pub close: CellId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntCell {
    pub base: CellId,
    pub var: CellId,
    /// Lower and upper limit; `None` for an indefinite integral
    pub limits: Option<(CellId, CellId)>,
}

impl IntCell {
    pub fn is_definite(&self) -> bool {
        self.limits.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SumCell {
    pub under: CellId,
    pub over: CellId,
    pub base: CellId,
    pub style: SumStyle,
}

/// Per-variant payload of a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Text(TextCell),
    Image(ImageCell),
    Fraction(FracCell),
    Exponent(ExptCell),
    Subscript { base: CellId, index: CellId },
    SubSup { base: CellId, sub: CellId, sup: CellId },
    Integral(IntCell),
    Sum(SumCell),
    Limit { name: CellId, under: CellId, base: CellId },
    Abs(Delimited),
    Conjugate(Delimited),
    Sqrt(Delimited),
    Paren { delimited: Delimited, print: bool },
    Function { name: CellId, arg: CellId },
    At { base: CellId, index: CellId },
    Diff { diff: CellId, base: CellId },
    Matrix { rows: Vec<Vec<CellId>> },
}

impl CellKind {
    /// Heads of the child lists this variant owns, in logical order
    pub fn child_lists(&self) -> Vec<CellId> {
        match self {
            CellKind::Text(_) | CellKind::Image(_) => Vec::new(),
            CellKind::Fraction(frac) => vec![frac.num, frac.den],
            CellKind::Exponent(expt) => vec![expt.base, expt.power],
            CellKind::Subscript { base, index } => vec![*base, *index],
            CellKind::SubSup { base, sub, sup } => vec![*base, *sub, *sup],
            CellKind::Integral(int) => match int.limits {
                Some((under, over)) => vec![under, over, int.base, int.var],
                None => vec![int.base, int.var],
            },
            CellKind::Sum(sum) => vec![sum.under, sum.over, sum.base],
            CellKind::Limit { name, under, base } => vec![*name, *under, *base],
            CellKind::Abs(d) | CellKind::Conjugate(d) | CellKind::Sqrt(d) => vec![d.inner],
            CellKind::Paren { delimited, .. } => vec![delimited.inner],
            CellKind::Function { name, arg } => vec![*name, *arg],
            CellKind::At { base, index } => vec![*base, *index],
            CellKind::Diff { diff, base } => vec![*diff, *base],
            CellKind::Matrix { rows } => rows.iter().flatten().copied().collect(),
        }
    }

    /// Synthetic text cells that only appear in the draw list when broken
    pub fn decorations(&self) -> Vec<CellId> {
        match self {
            CellKind::Fraction(frac) => vec![
                frac.open_num,
                frac.close_num,
                frac.divide,
                frac.open_den,
                frac.close_den,
            ],
            CellKind::Exponent(expt) => vec![expt.open, expt.close],
            CellKind::Abs(d) | CellKind::Conjugate(d) | CellKind::Sqrt(d) => vec![d.open, d.close],
            CellKind::Paren { delimited, .. } => vec![delimited.open, delimited.close],
            _ => Vec::new(),
        }
    }

    /// Child lists and decorations together
    pub fn owned(&self) -> Vec<CellId> {
        let mut ids = self.child_lists();
        ids.extend(self.decorations());
        ids
    }

    pub fn is_breakable(&self) -> bool {
        matches!(
            self,
            CellKind::Fraction(_)
                | CellKind::Exponent(_)
                | CellKind::Abs(_)
                | CellKind::Conjugate(_)
                | CellKind::Sqrt(_)
                | CellKind::Paren { .. }
                | CellKind::Function { .. }
        )
    }

    pub fn as_text(&self) -> Option<&TextCell> {
        match self {
            CellKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextCell> {
        match self {
            CellKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short name used in log messages
    pub fn name(&self) -> &'static str {
        match self {
            CellKind::Text(_) => "text",
            CellKind::Image(_) => "image",
            CellKind::Fraction(_) => "fraction",
            CellKind::Exponent(_) => "exponent",
            CellKind::Subscript { .. } => "subscript",
            CellKind::SubSup { .. } => "subsup",
            CellKind::Integral(_) => "integral",
            CellKind::Sum(_) => "sum",
            CellKind::Limit { .. } => "limit",
            CellKind::Abs(_) => "abs",
            CellKind::Conjugate(_) => "conjugate",
            CellKind::Sqrt(_) => "sqrt",
            CellKind::Paren { .. } => "paren",
            CellKind::Function { .. } => "function",
            CellKind::At { .. } => "at",
            CellKind::Diff { .. } => "diff",
            CellKind::Matrix { .. } => "matrix",
        }
    }

    /// Same variant with every owned handle passed through `f`
    pub(crate) fn map_ids(&self, f: &mut impl FnMut(CellId) -> CellId) -> CellKind {
        fn delimited(d: &Delimited, f: &mut impl FnMut(CellId) -> CellId) -> Delimited {
            Delimited {
                inner: f(d.inner),
                open: f(d.open),
                close: f(d.close),
            }
        }
        match self {
            CellKind::Text(text) => CellKind::Text(text.clone()),
            CellKind::Image(image) => CellKind::Image(image.clone()),
            CellKind::Fraction(frac) => CellKind::Fraction(FracCell {
                num: f(frac.num),
                den: f(frac.den),
                style: frac.style,
                open_num: f(frac.open_num),
                close_num: f(frac.close_num),
                divide: f(frac.divide),
                open_den: f(frac.open_den),
                close_den: f(frac.close_den),
            }),
            CellKind::Exponent(expt) => CellKind::Exponent(ExptCell {
                base: f(expt.base),
                power: f(expt.power),
                is_matrix: expt.is_matrix,
                open: f(expt.open),
                close: f(expt.close),
            }),
            CellKind::Subscript { base, index } => CellKind::Subscript {
                base: f(*base),
                index: f(*index),
            },
            CellKind::SubSup { base, sub, sup } => CellKind::SubSup {
                base: f(*base),
                sub: f(*sub),
                sup: f(*sup),
            },
            CellKind::Integral(int) => CellKind::Integral(IntCell {
                base: f(int.base),
                var: f(int.var),
                limits: int.limits.map(|(under, over)| (f(under), f(over))),
            }),
            CellKind::Sum(sum) => CellKind::Sum(SumCell {
                under: f(sum.under),
                over: f(sum.over),
                base: f(sum.base),
                style: sum.style,
            }),
            CellKind::Limit { name, under, base } => CellKind::Limit {
                name: f(*name),
                under: f(*under),
                base: f(*base),
            },
            CellKind::Abs(d) => CellKind::Abs(delimited(d, f)),
            CellKind::Conjugate(d) => CellKind::Conjugate(delimited(d, f)),
            CellKind::Sqrt(d) => CellKind::Sqrt(delimited(d, f)),
            CellKind::Paren { delimited: d, print } => CellKind::Paren {
                delimited: delimited(d, f),
                print: *print,
            },
            CellKind::Function { name, arg } => CellKind::Function {
                name: f(*name),
                arg: f(*arg),
            },
            CellKind::At { base, index } => CellKind::At {
                base: f(*base),
                index: f(*index),
            },
            CellKind::Diff { diff, base } => CellKind::Diff {
                diff: f(*diff),
                base: f(*base),
            },
            CellKind::Matrix { rows } => CellKind::Matrix {
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|&entry| f(entry)).collect())
                    .collect(),
            },
        }
    }
}

// =============================================================================
// Cell
// =============================================================================

/// A node of the worksheet tree
#[derive(Debug, Clone)]
pub struct Cell {
    pub kind: CellKind,
    pub style: TextStyle,
    pub geometry: Geometry,
    /// Font size the cell was last measured at
    pub font_size: f32,
    /// Hard line break before this cell
    pub force_break_line: bool,
    pub is_hidden: bool,
    pub highlight: bool,
    /// Use the larger line gap after a line ending in this cell
    pub big_skip: bool,
    pub tooltip: Option<String>,
    /// Text used instead of the generated one when copying as text
    pub alt_copy_text: Option<String>,
    pub(crate) break_line: bool,
    pub(crate) is_broken: bool,
    pub(crate) next: Option<CellId>,
    pub(crate) previous: Option<CellId>,
    pub(crate) next_to_draw: Option<CellId>,
    pub(crate) previous_to_draw: Option<CellId>,
    pub(crate) parent: Option<CellId>,
}

impl Cell {
    pub fn new(kind: CellKind, style: TextStyle) -> Self {
        Self {
            kind,
            style,
            geometry: Geometry::default(),
            font_size: 0.0,
            force_break_line: false,
            is_hidden: false,
            highlight: false,
            big_skip: false,
            tooltip: None,
            alt_copy_text: None,
            break_line: false,
            is_broken: false,
            next: None,
            previous: None,
            next_to_draw: None,
            previous_to_draw: None,
            parent: None,
        }
    }

    pub fn text(value: impl Into<String>, kind: TextKind, style: TextStyle) -> Self {
        Self::new(
            CellKind::Text(TextCell {
                value: value.into(),
                kind,
                user_label: None,
            }),
            style,
        )
    }

    pub fn next(&self) -> Option<CellId> {
        self.next
    }

    pub fn previous(&self) -> Option<CellId> {
        self.previous
    }

    pub fn next_to_draw(&self) -> Option<CellId> {
        self.next_to_draw
    }

    pub fn previous_to_draw(&self) -> Option<CellId> {
        self.previous_to_draw
    }

    /// Composite owning the list this cell belongs to
    pub fn parent(&self) -> Option<CellId> {
        self.parent
    }

    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    /// Whether a line starts at this cell after the last layout
    pub fn break_line_here(&self) -> bool {
        (!self.is_broken && self.break_line) || self.force_break_line
    }

    pub fn width(&self) -> f32 {
        self.geometry.width.unwrap_or(0.0)
    }

    pub fn height(&self) -> f32 {
        self.geometry.height.unwrap_or(0.0)
    }

    pub fn center(&self) -> f32 {
        self.geometry.center.unwrap_or(0.0)
    }

    pub fn drop(&self) -> f32 {
        self.geometry.drop().unwrap_or(0.0)
    }

    /// Forget cached geometry so the next layout measures again
    pub fn reset_size(&mut self) {
        self.geometry = Geometry::default();
    }

    /// Structural copy of flags and attributes, without links or geometry
    pub(crate) fn copy_data(&self, kind: CellKind) -> Cell {
        let mut copy = Cell::new(kind, self.style);
        copy.font_size = self.font_size;
        copy.force_break_line = self.force_break_line;
        copy.break_line = self.force_break_line;
        copy.is_hidden = self.is_hidden;
        copy.highlight = self.highlight;
        copy.big_skip = self.big_skip;
        copy.tooltip = self.tooltip.clone();
        copy.alt_copy_text = self.alt_copy_text.clone();
        copy
    }
}
