//! Worksheet configuration
//!
//! Layout and parsing read every tunable through [`Configuration`]. The
//! struct is plain data passed by reference; nothing in the crate keeps a
//! global copy.

use crate::error::WorksheetResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest allowed zoom factor
pub const MIN_ZOOM: f32 = 0.4;
/// Largest allowed zoom factor
pub const MAX_ZOOM: f32 = 8.0;

/// Vertical window of the drawing surface that is currently visible
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub top: f32,
    pub bottom: f32,
}

impl Viewport {
    pub fn new(top: f32, bottom: f32) -> Self {
        Self { top, bottom }
    }
}

/// Settings consumed by layout, painting, and the markup parser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
    /// Font size for text cells, in points
    pub font_size: f32,
    /// Font size for math cells, in points
    pub math_font_size: f32,
    /// User zoom, clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`] on read
    pub zoom_factor: f32,
    /// Device scale (e.g. printing or HiDPI)
    pub scale: f32,
    /// Width of the drawing surface in device units
    pub client_width: f32,
    /// Preferred line width in multiples of the font size
    pub line_width_em: f32,
    /// Horizontal gap between neighbouring cells
    pub cell_skip: f32,
    /// Vertical padding around text
    pub text_padding: f32,
    /// Gap between lines
    pub line_skip: f32,
    /// Gap after a line that ends in a big-skip cell
    pub big_skip: f32,
    /// Stroke width for lines drawn by cells
    pub default_line_width: f32,
    /// Currently visible region; `None` draws everything
    pub viewport: Option<Viewport>,
    /// Draw CAS-generated output labels
    pub show_automatic_labels: bool,
    /// Draw input cells
    pub show_code_cells: bool,
    /// Draw parentheses only while the pointer or the selection is inside them
    pub hide_brackets: bool,
    /// Parse markup longer than [`Configuration::max_markup_length`]
    pub show_long_expressions: bool,
    /// Markup size above which the parser substitutes a placeholder
    pub max_markup_length: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            math_font_size: 12.0,
            zoom_factor: 1.0,
            scale: 1.0,
            client_width: 800.0,
            line_width_em: 88.0,
            cell_skip: 2.0,
            text_padding: 1.0,
            line_skip: 2.0,
            big_skip: 8.0,
            default_line_width: 1.0,
            viewport: None,
            show_automatic_labels: true,
            show_code_cells: true,
            hide_brackets: false,
            show_long_expressions: false,
            max_markup_length: 50_000,
        }
    }
}

impl Configuration {
    /// Decode a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> WorksheetResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the configuration as pretty-printed JSON
    pub fn to_json(&self) -> WorksheetResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a configuration file, falling back to defaults when it is
    /// missing or cannot be decoded.
    pub fn load_or_default(path: &Path) -> WorksheetResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match Self::from_json(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!("Failed to parse configuration file, using defaults: {}", e);
                Ok(Self::default())
            }
        }
    }

    pub fn zoom_factor(&self) -> f32 {
        self.zoom_factor.clamp(MIN_ZOOM, MAX_ZOOM)
    }

    pub fn set_zoom_factor(&mut self, zoom: f32) {
        self.zoom_factor = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Combined zoom and device scale
    pub fn scale_factor(&self) -> f32 {
        self.zoom_factor() * self.scale
    }

    /// Convert a length in unscaled units to device units
    pub fn px(&self, length: f32) -> f32 {
        length * self.scale_factor()
    }

    pub fn math_font_size(&self) -> f32 {
        self.math_font_size
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Line width available to the soft line breaker
    pub fn line_width(&self) -> f32 {
        let preferred = self.px(self.font_size * self.line_width_em);
        if self.client_width > 0.0 {
            preferred.min(self.client_width)
        } else {
            preferred
        }
    }

    pub fn cell_skip(&self) -> f32 {
        self.px(self.cell_skip)
    }

    pub fn text_padding(&self) -> f32 {
        self.px(self.text_padding)
    }

    pub fn line_skip(&self) -> f32 {
        self.px(self.line_skip)
    }

    pub fn big_skip(&self) -> f32 {
        self.px(self.big_skip)
    }

    /// Stroke width for decorations, never thinner than one device unit
    pub fn stroke_width(&self) -> f32 {
        self.px(self.default_line_width).max(1.0)
    }

    /// Whether the vertical band `top..=bottom` intersects the viewport
    pub fn is_visible(&self, top: f32, bottom: f32) -> bool {
        match self.viewport {
            Some(viewport) => !(top > viewport.bottom || bottom < viewport.top),
            None => true,
        }
    }

    pub fn hide_brackets(&self) -> bool {
        self.hide_brackets
    }

    pub fn max_markup_length(&self) -> usize {
        self.max_markup_length
    }

    pub fn show_long_expressions(&self) -> bool {
        self.show_long_expressions
    }
}
