//! Worksheet Crate - cell tree and layout for computer algebra output
//!
//! This crate turns the math markup a Maxima session prints into a tree of
//! cells and lays it out for display:
//! - An arena of cells linked in a logical chain and a draw chain
//! - Two-pass measurement with greedy line breaking that breaks
//!   oversized composites into flat runs
//! - Paint commands, hit testing and selection over the laid out tree
//! - Export to plain text, TeX, MathML, OMML and the input markup
//! - A permissive markup parser that never fails on content

pub mod breakup;
pub mod cell;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod layout;
pub mod linebreak;
pub mod markup;
pub mod metrics;
pub mod paint;
pub mod parser;
pub mod select;
pub mod tree;

pub use breakup::{break_up, unbreak, unbreak_list};
pub use cell::{Cell, CellId, CellKind, FracStyle, Geometry, SumStyle, TextKind, TextStyle};
pub use config::{Configuration, Viewport};
pub use error::*;
pub use export::{
    list_to_mathml, list_to_omml, list_to_string, list_to_tex, list_to_xml, to_mathml,
    to_mathml_document, to_omml, to_string, to_tex, to_xml,
};
pub use geometry::{Point, Rect, Size};
pub use layout::{recalculate_height, recalculate_widths, LayoutContext};
pub use linebreak::{LayoutResult, LineBox, LineBreaker};
pub use metrics::{ApproxMeasure, TextMeasure};
pub use paint::{Color, PaintCommand, RenderOutput, Renderer};
pub use parser::{MathParser, ParseContext};
pub use select::{cell_at, select_inner, select_rect, tooltip_at};
pub use tree::{CellPointers, CellTree};

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================================
    // Integration Tests
    // =============================================================================

    fn parse(tree: &mut CellTree, config: &Configuration, markup: &str) -> CellId {
        MathParser::new(config)
            .parse_line(tree, markup, TextStyle::Default)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_parse_layout_render_pipeline() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let head = parse(
            &mut tree,
            &config,
            "<lbl>(%o1) </lbl><mfrac><msup><mi>x</mi><mn>2</mn></msup><mi>y</mi></mfrac>",
        );

        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let layout = LineBreaker::new(ctx).layout(&mut tree, head);
        assert_eq!(layout.lines.len(), 1);
        assert!(layout.size.width > 0.0);
        assert!(layout.size.height > 0.0);

        let output = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert!(!output.primitives.is_empty());
        assert!(output.placement(head).is_some());
    }

    #[test]
    fn test_all_exports_of_one_expression() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let head = parse(&mut tree, &config, "<msqrt><mi>a</mi><mo>+</mo><mi>b</mi></msqrt>");

        assert_eq!(list_to_string(&tree, head), "sqrt(a+b)");
        assert_eq!(list_to_tex(&tree, head), "\\sqrt{a+b}");
        assert_eq!(
            list_to_mathml(&tree, head),
            "<msqrt><mrow><mi>a</mi><mo>+</mo><mi>b</mi></mrow></msqrt>"
        );
        assert!(list_to_omml(&tree, head).unwrap().contains("<m:rad>"));
        assert_eq!(
            list_to_xml(&tree, head).unwrap(),
            "<msqrt><mi>a</mi><mo>+</mo><mi>b</mi></msqrt>"
        );
    }

    #[test]
    fn test_xml_round_trip_keeps_text() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let markup = "<lbl>(%o2) </lbl><mfun><mi>sin</mi><mparen><mi>x</mi></mparen></mfun>\
                      <mo>+</mo><mint def=\"false\"><mi>f</mi><mi>dx</mi></mint>\
                      <hl><msub><mi>a</mi><mi>i</mi></msub></hl>";
        let head = parse(&mut tree, &config, markup);
        let text = list_to_string(&tree, head);
        assert_eq!(text, "(%o2) sin(x)+integrate(f,x)a[i]");

        let xml = list_to_xml(&tree, head).unwrap();
        let mut again = CellTree::new();
        let copy = parse(&mut again, &config, &xml);
        assert_eq!(list_to_string(&again, copy), text);
    }

    #[test]
    fn test_exports_ignore_breaking() {
        let config = Configuration {
            client_width: 15.0,
            ..Default::default()
        };
        let mut tree = CellTree::new();
        let head = parse(
            &mut tree,
            &config,
            "<mfrac><mrow><mi>a</mi><mo>+</mo><mi>b</mi></mrow><mrow><mi>c</mi><mo>+</mo><mi>d</mi></mrow></mfrac>",
        );
        let before = (list_to_string(&tree, head), list_to_tex(&tree, head));

        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        LineBreaker::new(ctx).layout(&mut tree, head);
        assert!(tree[head].is_broken());
        assert_eq!((list_to_string(&tree, head), list_to_tex(&tree, head)), before);
    }

    #[test]
    fn test_delete_clears_selection() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let head = parse(&mut tree, &config, "<mi>x</mi><mo>=</mo><mn>1</mn>");
        let last = tree.last(head);
        tree.pointers_mut().set_selection(head, last);
        tree.delete_list(head);
        assert!(tree.selection().is_none());
        assert!(tree.pointers().selection_start().is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_deleted_denominator_becomes_placeholder() {
        let config = Configuration::default();
        let mut tree = CellTree::new();
        let head = parse(&mut tree, &config, "<mfrac><mi>a</mi><mi>b</mi></mfrac>");
        let CellKind::Fraction(frac) = tree[head].kind.clone() else {
            panic!("expected fraction");
        };
        tree.delete_list(frac.den);
        assert_eq!(list_to_string(&tree, head), "a/?");

        let measure = ApproxMeasure::default();
        let ctx = LayoutContext::new(&config, &measure);
        let layout = LineBreaker::new(ctx).layout(&mut tree, head);
        let output = Renderer::new(ctx).render(&tree, &layout, Point::origin());
        assert!(output.placement(head).is_some());
    }
}
