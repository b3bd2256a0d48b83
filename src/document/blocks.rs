//! Flattened text of a document and the blocks it was built from
//!
//! Extraction joins every non-blank span of every page with a single space.
//! Classifier offsets refer to that joined string; [`BlockIndex::find_block`]
//! maps them back to a block and block-relative offsets.

use crate::anonymization::models::SourceLocation;
use crate::document::backend::TextSpan;
use crate::domain::geometry::Rect;

/// One extracted span with its place in the joined text
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub page: usize,
    /// Trimmed span text
    pub text: String,
    pub bbox: Rect,
    pub font: String,
    pub size: f64,
    pub color: u32,
    pub flags: u32,
    /// Character offset of the block in the joined text
    pub start_char: usize,
}

impl TextBlock {
    /// Offset one past the block's last character
    pub fn end_char(&self) -> usize {
        self.start_char + self.text.chars().count()
    }
}

/// Joined document text plus its blocks
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    blocks: Vec<TextBlock>,
    text: String,
    cursor: usize,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page's spans; blank spans are skipped
    pub fn push_page(&mut self, page: usize, spans: &[TextSpan]) {
        for span in spans {
            let text = span.text.trim();
            if text.is_empty() {
                continue;
            }
            if !self.blocks.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(text);

            let len = text.chars().count();
            self.blocks.push(TextBlock {
                page,
                text: text.to_string(),
                bbox: span.bbox,
                font: span.font.clone(),
                size: span.size,
                color: span.color,
                flags: span.flags,
                start_char: self.cursor,
            });
            self.cursor += len + 1;
        }
    }

    /// The joined text handed to the classifier
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Locate the block holding `[start, end)`
    ///
    /// A range may run one character past a block, onto the joining space.
    pub fn find_block(&self, start: usize, end: usize) -> Option<SourceLocation> {
        let index = self
            .blocks
            .partition_point(|b| b.start_char <= start)
            .checked_sub(1)?;
        let block = &self.blocks[index];

        if end > block.end_char() + 1 {
            return None;
        }

        Some(SourceLocation {
            page: block.page,
            bbox: block.bbox,
            font: block.font.clone(),
            size: block.size,
            color: block.color,
            flags: block.flags,
            block_text: block.text.clone(),
            relative_start: start - block.start_char,
            relative_end: end - block.start_char,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f64) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            bbox: Rect::new(x, 10.0, x + 50.0, 22.0),
            font: "Helvetica".to_string(),
            size: 11.0,
            color: 0,
            flags: 0,
            chars: vec![],
        }
    }

    fn index() -> BlockIndex {
        let mut index = BlockIndex::new();
        index.push_page(0, &[span(" Sayın ", 0.0), span("  ", 60.0), span("Ahmet Yilmaz", 120.0)]);
        index.push_page(1, &[span("Tel: 0532", 0.0)]);
        index
    }

    #[test]
    fn test_joined_text() {
        let index = index();
        assert_eq!(index.text(), "Sayın Ahmet Yilmaz Tel: 0532");
        let starts: Vec<usize> = index.blocks().iter().map(|b| b.start_char).collect();
        assert_eq!(starts, vec![0, 6, 19]);
    }

    #[test]
    fn test_find_block_relative_offsets() {
        let index = index();
        let location = index.find_block(6, 11).unwrap();
        assert_eq!(location.block_text, "Ahmet Yilmaz");
        assert_eq!((location.relative_start, location.relative_end), (0, 5));
        assert_eq!(location.page, 0);

        let second_page = index.find_block(24, 28).unwrap();
        assert_eq!(second_page.page, 1);
        assert_eq!(second_page.relative_start, 5);
    }

    #[test]
    fn test_range_may_touch_joining_space() {
        let index = index();
        assert!(index.find_block(6, 19).is_some());
        assert!(index.find_block(6, 20).is_none());
    }

    #[test]
    fn test_empty_index() {
        assert!(BlockIndex::new().find_block(0, 1).is_none());
    }
}
