//! Math markup to cell lists
//!
//! Recursive descent over the element tree built by [`crate::markup`].
//! Parsing never fails on content: a required child that is missing or
//! empty is replaced by a `?` placeholder and an unknown tag contributes
//! its children. Only markup the XML reader cannot tokenize is an error.

use crate::cell::{CellId, FracStyle, SumStyle, TextKind, TextStyle};
use crate::config::Configuration;
use crate::error::WorksheetResult;
use crate::markup::{attrs, parse_fragment, tags, MarkupElement, MarkupNode};
use crate::tree::CellTree;

/// Text shown instead of markup longer than the configured limit
pub const TOO_LONG_MESSAGE: &str = " << Expression too long to display! >>";

/// Text of a substituted required child
pub const PLACEHOLDER: &str = "?";

/// State inherited by a subtree. Tags that change it hand a modified copy
/// to their children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseContext {
    pub style: TextStyle,
    pub frac_style: FracStyle,
    pub highlight: bool,
}

impl ParseContext {
    pub fn new(style: TextStyle) -> Self {
        Self {
            style,
            frac_style: FracStyle::Normal,
            highlight: false,
        }
    }

    fn with_style(self, style: TextStyle) -> Self {
        Self { style, ..self }
    }

    fn with_frac_style(self, frac_style: FracStyle) -> Self {
        Self { frac_style, ..self }
    }

    fn highlighted(self) -> Self {
        Self {
            highlight: true,
            ..self
        }
    }

    /// Style for a leaf whose tag suggests `kind`
    fn leaf_style(&self, kind: TextKind) -> TextStyle {
        if self.style == TextStyle::Default {
            kind.default_style()
        } else {
            self.style
        }
    }
}

/// Walks the significant children of an element in order
struct Children<'m> {
    nodes: std::slice::Iter<'m, MarkupNode>,
}

impl<'m> Children<'m> {
    fn new(element: &'m MarkupElement) -> Self {
        Self {
            nodes: element.children.iter(),
        }
    }

    fn next_significant(&mut self) -> Option<&'m MarkupNode> {
        self.nodes.by_ref().find(|node| node.is_significant())
    }
}

pub struct MathParser<'c> {
    config: &'c Configuration,
    tags_parsed: usize,
}

impl<'c> MathParser<'c> {
    pub fn new(config: &'c Configuration) -> Self {
        Self {
            config,
            tags_parsed: 0,
        }
    }

    /// Number of tags dispatched by the last [`MathParser::parse_line`]
    pub fn tags_parsed(&self) -> usize {
        self.tags_parsed
    }

    /// Parse one line of markup into a new list of `tree`
    ///
    /// Returns `None` when the markup holds nothing to show.
    pub fn parse_line(
        &mut self,
        tree: &mut CellTree,
        markup: &str,
        style: TextStyle,
    ) -> WorksheetResult<Option<CellId>> {
        self.tags_parsed = 0;
        if markup.len() > self.config.max_markup_length() && !self.config.show_long_expressions() {
            tracing::warn!(
                length = markup.len(),
                limit = self.config.max_markup_length(),
                "markup too long, showing placeholder"
            );
            let id = tree.text(TOO_LONG_MESSAGE, TextKind::Text, TextStyle::Placeholder);
            tree[id].force_break_line = true;
            return Ok(Some(id));
        }

        let root = parse_fragment(markup)?;
        let head = self.parse_children(tree, &root, ParseContext::new(style));
        tracing::trace!(tags = self.tags_parsed, "parsed markup line");
        Ok(head)
    }

    /// Concatenate the results of every significant child
    fn parse_children(&mut self, tree: &mut CellTree, element: &MarkupElement, ctx: ParseContext) -> Option<CellId> {
        self.parse_remaining(tree, &mut Children::new(element), ctx)
    }

    fn parse_remaining(&mut self, tree: &mut CellTree, children: &mut Children<'_>, ctx: ParseContext) -> Option<CellId> {
        let mut head: Option<CellId> = None;
        while let Some(node) = children.next_significant() {
            if let Some(list) = self.parse_node(tree, node, ctx) {
                match head {
                    Some(head) => tree.append(head, list),
                    None => head = Some(list),
                }
            }
        }
        head
    }

    fn parse_node(&mut self, tree: &mut CellTree, node: &MarkupNode, ctx: ParseContext) -> Option<CellId> {
        match node {
            MarkupNode::Text(text) => {
                if text.trim().is_empty() {
                    return None;
                }
                Some(self.leaf(tree, text, TextKind::Text, ctx))
            }
            MarkupNode::Element(element) => {
                self.tags_parsed += 1;
                let head = self.parse_element(tree, element, ctx)?;
                apply_common_attributes(tree, head, element);
                Some(head)
            }
        }
    }

    fn leaf(&mut self, tree: &mut CellTree, value: &str, kind: TextKind, ctx: ParseContext) -> CellId {
        let id = tree.text(value, kind, ctx.leaf_style(kind));
        tree[id].highlight = ctx.highlight;
        id
    }

    fn placeholder(&mut self, tree: &mut CellTree, parent: &str, ctx: ParseContext) -> CellId {
        tracing::warn!(tag = parent, "missing child, using placeholder");
        let id = tree.text(PLACEHOLDER, TextKind::Text, TextStyle::Placeholder);
        tree[id].highlight = ctx.highlight;
        id
    }

    /// Next significant child as a list, or a placeholder
    fn required(
        &mut self,
        tree: &mut CellTree,
        children: &mut Children<'_>,
        parent: &str,
        ctx: ParseContext,
    ) -> CellId {
        let parsed = children
            .next_significant()
            .and_then(|node| self.parse_node(tree, node, ctx));
        match parsed {
            Some(list) => list,
            None => self.placeholder(tree, parent, ctx),
        }
    }

    /// All remaining significant children as one list, or a placeholder
    fn rest(&mut self, tree: &mut CellTree, children: &mut Children<'_>, parent: &str, ctx: ParseContext) -> CellId {
        match self.parse_remaining(tree, children, ctx) {
            Some(head) => head,
            None => self.placeholder(tree, parent, ctx),
        }
    }

    fn mark(tree: &mut CellTree, id: CellId, ctx: ParseContext) -> CellId {
        let cell = &mut tree[id];
        cell.style = ctx.style;
        cell.highlight = ctx.highlight;
        id
    }

    fn parse_element(&mut self, tree: &mut CellTree, element: &MarkupElement, ctx: ParseContext) -> Option<CellId> {
        let name = element.name.as_str();
        let mut children = Children::new(element);
        // Composites reset the fraction mode for their own children.
        let inner = ctx.with_frac_style(FracStyle::Normal);
        let id = match name {
            tags::FRAC => {
                let num = self.required(tree, &mut children, name, inner);
                let den = self.required(tree, &mut children, name, inner);
                let style = if element.attr_is("choose", "yes") {
                    FracStyle::Choose
                } else {
                    ctx.frac_style
                };
                tree.fraction(num, den, style)
            }
            tags::SUP => {
                let base = self.required(tree, &mut children, name, inner);
                let power = self.required(tree, &mut children, name, inner);
                tree.exponent(base, power, element.attr_is("mat", "yes"))
            }
            tags::SUB => {
                let base = self.required(tree, &mut children, name, inner);
                let index = self.required(tree, &mut children, name, inner);
                tree.subscript(base, index)
            }
            tags::SUBSUP => {
                let base = self.required(tree, &mut children, name, inner);
                let sub = self.required(tree, &mut children, name, inner);
                let sup = self.required(tree, &mut children, name, inner);
                tree.subsup(base, sub, sup)
            }
            tags::INT => {
                let limits = if element.attr_is("def", "false") {
                    None
                } else {
                    let under = self.required(tree, &mut children, name, inner);
                    let over = self.required(tree, &mut children, name, inner);
                    Some((under, over))
                };
                let base = self.required(tree, &mut children, name, inner);
                let var = self.rest(tree, &mut children, name, inner);
                tree.integral(base, var, limits)
            }
            tags::SUM => {
                let under = self.required(tree, &mut children, name, inner);
                let over = self.required(tree, &mut children, name, inner);
                let base = self.required(tree, &mut children, name, inner);
                let style = if element.attr_is("type", "prod") {
                    SumStyle::Product
                } else {
                    SumStyle::Sum
                };
                tree.sum(under, over, base, style)
            }
            tags::LIMIT => {
                let limit_name = self.required(tree, &mut children, name, inner);
                let under = self.required(tree, &mut children, name, inner);
                let base = self.required(tree, &mut children, name, inner);
                tree.limit(limit_name, under, base)
            }
            tags::ABS => {
                let inside = self.rest(tree, &mut children, name, inner);
                tree.abs(inside)
            }
            tags::CONJ => {
                let inside = self.rest(tree, &mut children, name, inner);
                tree.conjugate(inside)
            }
            tags::SQRT => {
                let inside = self.rest(tree, &mut children, name, inner);
                tree.sqrt(inside)
            }
            tags::PAREN => {
                let inside = self.rest(tree, &mut children, name, inner);
                tree.paren(inside, !element.attr_is("print", "no"))
            }
            tags::FUN => {
                let name_ctx = if inner.style == TextStyle::Default {
                    inner.with_style(TextStyle::Function)
                } else {
                    inner
                };
                let fun_name = self.required(tree, &mut children, name, name_ctx);
                let arg = self.required(tree, &mut children, name, inner);
                tree.function(fun_name, arg)
            }
            tags::AT => {
                let base = self.required(tree, &mut children, name, inner);
                let index = self.required(tree, &mut children, name, inner);
                tree.at(base, index)
            }
            tags::DIFF => {
                let diff = self.required(tree, &mut children, name, inner.with_frac_style(FracStyle::Diff));
                let base = self.rest(tree, &mut children, name, inner);
                tree.diff(diff, base)
            }
            tags::TABLE => return Some(self.parse_table(tree, element, inner)),
            tags::IDENTIFIER => return Some(self.leaf(tree, &element.text(), TextKind::Variable, ctx)),
            tags::NUMBER => return Some(self.leaf(tree, &element.text(), TextKind::Number, ctx)),
            tags::OPERATOR => return Some(self.leaf(tree, &element.text(), TextKind::Operator, ctx)),
            tags::STRING => return Some(self.leaf(tree, &element.text(), TextKind::String, ctx)),
            tags::TEXT => return Some(self.leaf(tree, &element.text(), TextKind::Text, ctx)),
            tags::SPACE => return Some(self.leaf(tree, " ", TextKind::Space, ctx)),
            tags::IMAGE => {
                let size = |key: &str| element.attr(key).and_then(|v| v.trim().parse::<f32>().ok());
                let id = tree.image(element.text().trim(), size("width").unwrap_or(0.0), size("height").unwrap_or(0.0));
                return Some(Self::mark(tree, id, ctx));
            }
            tags::LINE => {
                let head = match self.parse_children(tree, element, ctx) {
                    Some(head) => head,
                    None => self.leaf(tree, " ", TextKind::Space, ctx),
                };
                tree[head].force_break_line = true;
                return Some(head);
            }
            tags::LABEL => {
                let user_label = element
                    .attr("userdefinedlabel")
                    .filter(|_| element.attr_is("userdefined", "yes"));
                let style = if user_label.is_some() {
                    TextStyle::UserLabel
                } else {
                    TextStyle::Label
                };
                let head = self.parse_children(tree, element, ctx.with_style(style))?;
                if let (Some(label), Some(text)) = (user_label, tree[head].kind.as_text_mut()) {
                    text.user_label = Some(label.to_string());
                }
                let cell = &mut tree[head];
                cell.force_break_line = true;
                cell.big_skip = true;
                return Some(head);
            }
            tags::INPUT => return self.parse_children(tree, element, ctx.with_style(TextStyle::Input)),
            tags::ERROR => return self.parse_children(tree, element, ctx.with_style(TextStyle::Error)),
            tags::TITLE | tags::SECTION | tags::SUBSECTION | tags::SUBSUBSECTION => {
                let style = match name {
                    tags::TITLE => TextStyle::Title,
                    tags::SECTION => TextStyle::Section,
                    tags::SUBSECTION => TextStyle::Subsection,
                    _ => TextStyle::Subsubsection,
                };
                let head = self.parse_children(tree, element, ctx.with_style(style))?;
                let cell = &mut tree[head];
                cell.force_break_line = true;
                cell.big_skip = true;
                return Some(head);
            }
            tags::HIGHLIGHT => return self.parse_children(tree, element, ctx.highlighted()),
            tags::ROW | tags::MATH => return self.parse_children(tree, element, ctx),
            _ => {
                tracing::debug!(tag = name, "unknown tag, parsing children");
                return self.parse_children(tree, element, ctx);
            }
        };
        Some(Self::mark(tree, id, ctx))
    }

    /// `mtable` of `mtr` rows of `mtd` entries
    fn parse_table(&mut self, tree: &mut CellTree, element: &MarkupElement, ctx: ParseContext) -> CellId {
        let mut rows = Vec::new();
        for row in element.elements().filter(|e| e.name == tags::TABLE_ROW) {
            self.tags_parsed += 1;
            let mut entries = Vec::new();
            for entry in row.elements().filter(|e| e.name == tags::TABLE_CELL) {
                self.tags_parsed += 1;
                let mut children = Children::new(entry);
                entries.push(self.rest(tree, &mut children, tags::TABLE_CELL, ctx));
            }
            if !entries.is_empty() {
                rows.push(entries);
            }
        }
        if rows.is_empty() {
            return self.placeholder(tree, tags::TABLE, ctx);
        }
        let id = tree.matrix(rows);
        Self::mark(tree, id, ctx)
    }
}

/// Attributes any element may carry; they act on the first cell it
/// produced
fn apply_common_attributes(tree: &mut CellTree, head: CellId, element: &MarkupElement) {
    let cell = &mut tree[head];
    match element.attr(attrs::BREAKLINE) {
        Some("true") => cell.force_break_line = true,
        Some("false") => cell.force_break_line = false,
        _ => {}
    }
    if let Some(tooltip) = element.attr(attrs::TOOLTIP) {
        cell.tooltip = Some(tooltip.to_string());
    }
    if let Some(alt) = element.attr(attrs::ALT_COPY) {
        cell.alt_copy_text = Some(alt.to_string());
    }
    if element.attr_is(attrs::HIDDEN, "true") {
        cell.is_hidden = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellKind;
    use crate::export::list_to_string;

    fn parse(markup: &str) -> (CellTree, CellId, usize) {
        let config = Configuration::default();
        let mut parser = MathParser::new(&config);
        let mut tree = CellTree::new();
        let head = parser
            .parse_line(&mut tree, markup, TextStyle::Default)
            .unwrap()
            .expect("markup produced no cells");
        (tree, head, parser.tags_parsed())
    }

    #[test]
    fn test_parse_leaves() {
        let (tree, head, tags) = parse("<mi>x</mi><mo>+</mo><mn>1</mn>");
        assert_eq!(tree.list_len(head), 3);
        assert_eq!(tags, 3);
        assert_eq!(list_to_string(&tree, head), "x+1");
        assert_eq!(tree[head].style, TextStyle::Variable);
    }

    #[test]
    fn test_parse_fraction() {
        let (tree, head, _) = parse("<mfrac><mi>a</mi><mrow><mi>b</mi><mo>+</mo><mn>1</mn></mrow></mfrac>");
        let CellKind::Fraction(frac) = &tree[head].kind else {
            panic!("expected a fraction");
        };
        assert_eq!(frac.style, FracStyle::Normal);
        assert_eq!(tree.list_len(frac.den), 3);
        assert_eq!(tree[frac.den].parent(), Some(head));
        assert_eq!(list_to_string(&tree, head), "a/(b+1)");
    }

    #[test]
    fn test_missing_child_is_placeholder() {
        let (tree, head, _) = parse("<mfrac><mi>a</mi></mfrac>");
        let CellKind::Fraction(frac) = &tree[head].kind else {
            panic!("expected a fraction");
        };
        assert_eq!(tree[frac.den].style, TextStyle::Placeholder);
        assert_eq!(tree[frac.den].kind.as_text().unwrap().value, "?");
        assert_eq!(list_to_string(&tree, head), "a/?");
    }

    #[test]
    fn test_empty_row_is_placeholder_but_empty_leaf_is_kept() {
        let (tree, head, _) = parse("<mfrac><mrow></mrow><mi></mi></mfrac>");
        let CellKind::Fraction(frac) = &tree[head].kind else {
            panic!("expected a fraction");
        };
        assert_eq!(tree[frac.num].style, TextStyle::Placeholder);
        let den = tree[frac.den].kind.as_text().unwrap();
        assert_eq!(den.value, "");
        assert_eq!(tree[frac.den].style, TextStyle::Variable);
    }

    #[test]
    fn test_whitespace_between_children_is_skipped() {
        let (tree, head, _) = parse("<msup>\n  <mi>x</mi>\n  <mn>2</mn>\n</msup>");
        assert_eq!(list_to_string(&tree, head), "x^2");
    }

    #[test]
    fn test_diff_fractions_get_diff_style() {
        let (tree, head, _) = parse("<mdiff><mfrac><mi>d</mi><mi>dx</mi></mfrac><mi>f</mi></mdiff>");
        let CellKind::Diff { diff, .. } = &tree[head].kind else {
            panic!("expected a differential");
        };
        let CellKind::Fraction(frac) = &tree[*diff].kind else {
            panic!("expected a fraction");
        };
        assert_eq!(frac.style, FracStyle::Diff);
        assert_eq!(list_to_string(&tree, head), "diff(f,x)");
    }

    #[test]
    fn test_context_style_wins_over_tag() {
        let (tree, head, _) = parse("<input><mi>x</mi></input><mi>y</mi>");
        assert_eq!(tree[head].style, TextStyle::Input);
        let y = tree[head].next().unwrap();
        assert_eq!(tree[y].style, TextStyle::Variable);
    }

    #[test]
    fn test_labels_break_and_skip() {
        let (tree, head, _) = parse("<lbl>(%o1) </lbl><mi>x</mi>");
        assert_eq!(tree[head].style, TextStyle::Label);
        assert!(tree[head].force_break_line);
        assert!(tree[head].big_skip);

        let (tree, head, _) = parse("<lbl userdefined=\"yes\" userdefinedlabel=\"result\">(%o1)</lbl>");
        assert_eq!(tree[head].style, TextStyle::UserLabel);
        assert_eq!(list_to_string(&tree, head), "result");
    }

    #[test]
    fn test_common_attributes() {
        let (tree, head, _) = parse(
            "<mi tooltip=\"a variable\" altCopy=\"xx\" breakline=\"true\">x</mi><mo hidden=\"true\">*</mo>",
        );
        assert_eq!(tree[head].tooltip.as_deref(), Some("a variable"));
        assert_eq!(tree[head].alt_copy_text.as_deref(), Some("xx"));
        assert!(tree[head].force_break_line);
        let times = tree[head].next().unwrap();
        assert!(tree[times].is_hidden);

        let (tree, head, _) = parse("<lbl breakline=\"false\">(%o1)</lbl>");
        assert!(!tree[head].force_break_line);
    }

    #[test]
    fn test_highlight_and_unknown_tags() {
        let (tree, head, tags) = parse("<hl><mi>x</mi></hl><mystery><mi>y</mi></mystery>");
        assert!(tree[head].highlight);
        let y = tree[head].next().unwrap();
        assert!(!tree[y].highlight);
        assert_eq!(tags, 4);
    }

    #[test]
    fn test_table() {
        let (tree, head, _) = parse(
            "<mtable><mtr><mtd><mi>a</mi></mtd><mtd><mi>b</mi></mtd></mtr>\
             <mtr><mtd><mi>c</mi></mtd><mtd></mtd></mtr></mtable>",
        );
        assert_eq!(list_to_string(&tree, head), "matrix([a,b],[c,?])");
    }

    #[test]
    fn test_empty_line_gives_nothing() {
        let config = Configuration::default();
        let mut parser = MathParser::new(&config);
        let mut tree = CellTree::new();
        assert_eq!(parser.parse_line(&mut tree, "  ", TextStyle::Default).unwrap(), None);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_oversized_markup_is_not_parsed() {
        let config = Configuration {
            max_markup_length: 16,
            ..Default::default()
        };
        let mut parser = MathParser::new(&config);
        let mut tree = CellTree::new();
        let head = parser
            .parse_line(&mut tree, "<mi>x</mi><mi>y</mi><mi>z</mi>", TextStyle::Default)
            .unwrap()
            .unwrap();
        assert_eq!(parser.tags_parsed(), 0);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[head].kind.as_text().unwrap().value, TOO_LONG_MESSAGE);
        assert!(tree[head].force_break_line);
    }

    #[test]
    fn test_broken_markup_is_an_error() {
        let config = Configuration::default();
        let mut parser = MathParser::new(&config);
        let mut tree = CellTree::new();
        assert!(parser.parse_line(&mut tree, "<mi>x</mi><!-- never closed", TextStyle::Default).is_err());
    }
}
