//! Document backend seam
//!
//! Rendering, searching and editing a paginated document is delegated to a
//! [`DocumentBackend`]. Coordinates are page space with a top-left origin.

use crate::domain::errors::BackendError;
use crate::domain::geometry::{Point, Quad, Rect, Rgb};
use image::RgbImage;

/// Font used when the backend has nothing closer to offer
pub const DEFAULT_FONT: &str = "helv";

/// Bounding box of one extracted character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharBox {
    pub c: char,
    pub bbox: Rect,
}

/// A run of text with uniform styling, as reported by extraction
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Raw text, possibly with surrounding whitespace
    pub text: String,
    pub bbox: Rect,
    pub font: String,
    pub size: f64,
    /// Packed `0xRRGGBB` colour
    pub color: u32,
    pub flags: u32,
    /// Per-character boxes aligned with `text`, when the backend provides them
    pub chars: Vec<CharBox>,
}

/// One match of a text search; a match wrapping across lines has several quads
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub quads: Vec<Quad>,
}

impl SearchHit {
    pub fn first_rect(&self) -> Option<Rect> {
        self.quads.first().map(Quad::rect)
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.quads.iter().map(Quad::rect).collect()
    }
}

/// Styling for inserted text
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: String,
    pub size: f64,
    pub color: Rgb,
}

/// One loaded page
pub trait PageHandle {
    /// Zero-based page index
    fn index(&self) -> usize;

    /// Text spans in reading order
    fn text_spans(&self) -> Result<Vec<TextSpan>, BackendError>;

    /// Rasterize `clip`; the image covers exactly the clip rectangle
    fn render_region(&self, clip: &Rect) -> Result<RgbImage, BackendError>;

    /// Case-insensitive search over the whole page
    fn search(&self, query: &str, max_hits: usize) -> Result<Vec<SearchHit>, BackendError>;

    /// Queue a redaction area filled with `fill`
    fn add_redaction(&mut self, rect: &Rect, fill: Rgb) -> Result<(), BackendError>;

    /// Flatten queued redactions, removing the covered content
    fn apply_redactions(&mut self) -> Result<(), BackendError>;

    /// Rendered width of `text`
    fn text_width(&self, text: &str, font: &str, size: f64) -> Result<f64, BackendError>;

    /// Draw `text` with its baseline starting at `origin`
    fn insert_text(
        &mut self,
        origin: Point,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), BackendError>;

    /// Closest font the backend can draw with
    fn closest_font(&self, _font: &str) -> String {
        DEFAULT_FONT.to_string()
    }
}

/// An opened document
pub trait DocumentBackend {
    fn page_count(&self) -> usize;

    fn load_page(&mut self, index: usize) -> Result<Box<dyn PageHandle + '_>, BackendError>;

    /// Serialize the (possibly mutated) document
    fn save(&mut self) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_hit_rects() {
        let hit = SearchHit {
            quads: vec![
                Quad::from_rect(&Rect::new(10.0, 10.0, 50.0, 20.0)),
                Quad::from_rect(&Rect::new(0.0, 22.0, 30.0, 32.0)),
            ],
        };
        assert_eq!(hit.first_rect(), Some(Rect::new(10.0, 10.0, 50.0, 20.0)));
        assert_eq!(hit.rects().len(), 2);
        assert_eq!(SearchHit { quads: vec![] }.first_rect(), None);
    }
}
