//! Transcription of cell lists into other notations
//!
//! Every exporter walks the logical chain and reads each composite's child
//! lists directly, so a broken cell exports exactly as it does unbroken.

pub mod mathml;
pub mod omml;
pub mod tex;
pub mod text;
pub mod xml;

pub use mathml::{list_to_mathml, to_mathml, to_mathml_document};
pub use omml::{list_to_omml, to_omml};
pub use tex::{list_to_tex, to_tex};
pub use text::{list_to_string, to_string};
pub use xml::{list_to_xml, to_xml};

use crate::cell::{CellId, CellKind, TextKind};
use crate::tree::CellTree;

/// Function names with a dedicated TeX command
pub(crate) const KNOWN_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "coth", "arcsin", "arccos",
    "arctan", "log", "ln", "exp", "det", "min", "max", "deg", "dim", "gcd", "ker", "arg",
];

/// Greek letter names as Maxima spells them, with their TeX command and
/// Unicode character
const GREEK: &[(&str, &str, char)] = &[
    ("alpha", "\\alpha", 'α'),
    ("beta", "\\beta", 'β'),
    ("gamma", "\\gamma", 'γ'),
    ("delta", "\\delta", 'δ'),
    ("epsilon", "\\epsilon", 'ε'),
    ("zeta", "\\zeta", 'ζ'),
    ("eta", "\\eta", 'η'),
    ("theta", "\\theta", 'θ'),
    ("iota", "\\iota", 'ι'),
    ("kappa", "\\kappa", 'κ'),
    ("lambda", "\\lambda", 'λ'),
    ("mu", "\\mu", 'μ'),
    ("nu", "\\nu", 'ν'),
    ("xi", "\\xi", 'ξ'),
    ("%pi", "\\pi", 'π'),
    ("pi", "\\pi", 'π'),
    ("rho", "\\rho", 'ρ'),
    ("sigma", "\\sigma", 'σ'),
    ("tau", "\\tau", 'τ'),
    ("upsilon", "\\upsilon", 'υ'),
    ("phi", "\\phi", 'φ'),
    ("chi", "\\chi", 'χ'),
    ("psi", "\\psi", 'ψ'),
    ("omega", "\\omega", 'ω'),
    ("Gamma", "\\Gamma", 'Γ'),
    ("Delta", "\\Delta", 'Δ'),
    ("Theta", "\\Theta", 'Θ'),
    ("Lambda", "\\Lambda", 'Λ'),
    ("Xi", "\\Xi", 'Ξ'),
    ("Pi", "\\Pi", 'Π'),
    ("Sigma", "\\Sigma", 'Σ'),
    ("Phi", "\\Phi", 'Φ'),
    ("Psi", "\\Psi", 'Ψ'),
    ("Omega", "\\Omega", 'Ω'),
];

pub(crate) fn greek_tex(name: &str) -> Option<&'static str> {
    GREEK.iter().find(|(n, _, _)| *n == name).map(|(_, tex, _)| *tex)
}

pub(crate) fn greek_char(name: &str) -> Option<char> {
    GREEK.iter().find(|(n, _, _)| *n == name).map(|(_, _, c)| *c)
}

/// Whether a list needs parentheses when written inline as an operand
pub(crate) fn is_compound(tree: &CellTree, head: CellId) -> bool {
    let mut cells = tree.list(head);
    let Some(first) = cells.next() else {
        return false;
    };
    if cells.next().is_some() {
        return true;
    }
    match &tree[first].kind {
        CellKind::Text(text) => text.kind == TextKind::Operator,
        CellKind::Fraction(_) | CellKind::Exponent(_) => true,
        _ => false,
    }
}
