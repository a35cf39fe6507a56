//! Property tests for line breaking and markup round trips
//!
//! Line breaking is checked against its greedy rule on random rows of
//! fixed-width cells. Markup is generated from a small grammar, parsed,
//! written back and parsed again; the text form must not change.

use proptest::prelude::*;
use worksheet::{
    list_to_string, list_to_xml, CellId, CellTree, Configuration, LayoutContext, LineBreaker,
    MathParser, Size, TextKind, TextMeasure, TextStyle,
};

/// Every character is 10 units wide and tall
struct FixedMeasure;

impl TextMeasure for FixedMeasure {
    fn text_extent(&self, text: &str, _style: TextStyle, _font_size: f32) -> Size {
        Size::new(10.0 * text.chars().count() as f32, 10.0)
    }
}

fn row_of(tree: &mut CellTree, lengths: &[usize]) -> CellId {
    let mut head: Option<CellId> = None;
    for &len in lengths {
        let cell = tree.text("x".repeat(len), TextKind::Variable, TextStyle::Variable);
        match head {
            Some(head) => tree.append(head, cell),
            None => head = Some(cell),
        }
    }
    head.expect("at least one cell")
}

fn parse(tree: &mut CellTree, config: &Configuration, markup: &str) -> Option<CellId> {
    MathParser::new(config)
        .parse_line(tree, markup, TextStyle::Default)
        .expect("generated markup is well formed")
}

#[test]
fn test_greedy_boundary() {
    let config = Configuration {
        client_width: 100.0,
        ..Default::default()
    };
    let mut tree = CellTree::new();
    let head = row_of(&mut tree, &[4, 4, 4]);
    let ctx = LayoutContext::new(&config, &FixedMeasure);
    let layout = LineBreaker::new(ctx).layout(&mut tree, head);

    let cells: Vec<CellId> = tree.list(head).collect();
    assert_eq!(layout.lines.len(), 2);
    assert_eq!(layout.lines[0].cells, vec![cells[0], cells[1]]);
    assert_eq!(layout.lines[0].width, 82.0);
    assert_eq!(layout.lines[1].cells, vec![cells[2]]);
}

#[test]
fn test_round_trip_of_labelled_output() {
    let config = Configuration::default();
    let mut tree = CellTree::new();
    let markup = "<lbl userdefined=\"yes\" userdefinedlabel=\"eq\">(%o3)</lbl>\
                  <msum type=\"prod\"><mrow><mi>k</mi><mo>=</mo><mn>1</mn></mrow><mi>n</mi><mi>k</mi></msum>\
                  <mth><mtext>done</mtext></mth>";
    let head = parse(&mut tree, &config, markup).unwrap();
    let text = list_to_string(&tree, head);
    assert_eq!(text, "eqproduct(k,k,1,n)\ndone");

    let xml = list_to_xml(&tree, head).unwrap();
    let mut again = CellTree::new();
    let copy = parse(&mut again, &config, &xml).unwrap();
    assert_eq!(list_to_string(&again, copy), text);
}

fn leaf_markup() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,3}".prop_map(|s| format!("<mi>{s}</mi>")),
        "[0-9]{1,3}".prop_map(|s| format!("<mn>{s}</mn>")),
        prop::sample::select(vec!["+", "-", "=", "&lt;", "&amp;"]).prop_map(|s| format!("<mo>{s}</mo>")),
        Just("<mspace/>".to_string()),
    ]
}

fn expression_markup() -> impl Strategy<Value = String> {
    leaf_markup().prop_recursive(4, 48, 3, |inner| {
        let row = prop::collection::vec(inner.clone(), 1..4).prop_map(|parts| parts.concat());
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("<mfrac>{a}{b}</mfrac>")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("<msup>{a}{b}</msup>")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("<msub>{a}{b}</msub>")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("<mfun>{a}{b}</mfun>")),
            row.clone().prop_map(|r| format!("<msqrt>{r}</msqrt>")),
            row.clone().prop_map(|r| format!("<mabs>{r}</mabs>")),
            row.clone().prop_map(|r| format!("<mparen>{r}</mparen>")),
            row.clone().prop_map(|r| format!("<mrow>{r}</mrow>")),
            row.prop_map(|r| format!("<hl>{r}</hl>")),
        ]
    })
}

proptest! {
    #[test]
    fn greedy_lines_are_maximal(
        lengths in prop::collection::vec(1usize..7, 1..24),
        client_width in 60.0f32..300.0,
    ) {
        let config = Configuration { client_width, ..Default::default() };
        let mut tree = CellTree::new();
        let head = row_of(&mut tree, &lengths);
        let ctx = LayoutContext::new(&config, &FixedMeasure);
        let layout = LineBreaker::new(ctx).layout(&mut tree, head);

        let limit = config.line_width();
        let gap = config.cell_skip();
        let total: usize = layout.lines.iter().map(|line| line.cells.len()).sum();
        prop_assert_eq!(total, lengths.len());
        for line in &layout.lines {
            prop_assert!(line.width <= limit || line.cells.len() == 1);
        }
        for pair in layout.lines.windows(2) {
            let next = tree[pair[1].cells[0]].width();
            prop_assert!(pair[0].width + gap + next > limit);
        }
    }

    #[test]
    fn xml_round_trip_keeps_text(parts in prop::collection::vec(expression_markup(), 1..5)) {
        let config = Configuration::default();
        let markup = parts.concat();
        let mut tree = CellTree::new();
        let head = parse(&mut tree, &config, &markup).unwrap();
        let text = list_to_string(&tree, head);

        let xml = list_to_xml(&tree, head).unwrap();
        let mut again = CellTree::new();
        let copy = parse(&mut again, &config, &xml).unwrap();
        prop_assert_eq!(list_to_string(&again, copy), text);
    }
}
