//! Text measurement
//!
//! Cells never talk to a font system directly. Layout asks a
//! [`TextMeasure`] implementation for the extent of each text run; the
//! host application supplies one backed by its real fonts.

use crate::cell::TextStyle;
use crate::geometry::Size;

/// Measures text runs for layout
pub trait TextMeasure {
    /// Extent of `text` rendered in `style` at `font_size` device units
    fn text_extent(&self, text: &str, style: TextStyle, font_size: f32) -> Size;
}

/// Approximate metrics derived from the font size alone.
///
/// Every character is treated as a fixed fraction of an em, which is
/// enough to get stable, proportional geometry without a font backend.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMeasure {
    /// Average glyph advance in em
    pub char_width: f32,
    /// Ascent above baseline in em
    pub ascent: f32,
    /// Descent below baseline in em
    pub descent: f32,
}

impl Default for ApproxMeasure {
    fn default() -> Self {
        Self {
            char_width: 0.5,
            ascent: 0.8,
            descent: 0.2,
        }
    }
}

impl TextMeasure for ApproxMeasure {
    fn text_extent(&self, text: &str, style: TextStyle, font_size: f32) -> Size {
        let em = font_size * style.relative_size();
        let chars = text.chars().count() as f32;
        Size::new(chars * em * self.char_width, em * (self.ascent + self.descent))
    }
}
