//! In-memory document backend shared by the integration tests
//!
//! Each page is a list of single-line spans laid out top to bottom. Every
//! character is `CHAR_WIDTH` wide, so rectangles are easy to predict.

#![allow(dead_code)]

use image::RgbImage;
use veil::document::{CharBox, DocumentBackend, PageHandle, SearchHit, TextSpan, TextStyle};
use veil::domain::{BackendError, Point, Quad, Rect, Rgb};

pub const CHAR_WIDTH: f64 = 6.0;
pub const LINE_HEIGHT: f64 = 12.0;
pub const LEFT: f64 = 50.0;
pub const TOP: f64 = 100.0;

/// Everything a page has had done to it
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub spans: Vec<TextSpan>,
    pub redactions: Vec<(Rect, Rgb)>,
    pub flattened: usize,
    pub inserted: Vec<(Point, String, TextStyle)>,
    /// Colour every render of this page returns
    pub paper: [u8; 3],
}

impl PageData {
    pub fn inserted_texts(&self) -> Vec<String> {
        self.inserted.iter().map(|(_, text, _)| text.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pub pages: Vec<PageData>,
    /// When false, page search finds nothing
    pub search_enabled: bool,
    pub fail_save: bool,
    /// Page whose text extraction fails
    pub fail_extract: Option<usize>,
    pub saves: usize,
}

impl MemoryDocument {
    /// One page per entry, one span per line
    pub fn from_pages(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|lines| PageData {
                    spans: lines
                        .iter()
                        .enumerate()
                        .map(|(i, line)| line_span(line, i, true))
                        .collect(),
                    paper: [255, 255, 255],
                    ..Default::default()
                })
                .collect(),
            search_enabled: true,
            ..Default::default()
        }
    }

    pub fn without_search(mut self) -> Self {
        self.search_enabled = false;
        self
    }

    pub fn without_char_boxes(mut self) -> Self {
        for page in &mut self.pages {
            for span in &mut page.spans {
                span.chars.clear();
            }
        }
        self
    }

    pub fn all_inserted(&self) -> Vec<String> {
        self.pages.iter().flat_map(PageData::inserted_texts).collect()
    }

    pub fn total_redactions(&self) -> usize {
        self.pages.iter().map(|p| p.redactions.len()).sum()
    }
}

/// Span for `text` on line `line`, with per-character boxes when `with_chars`
pub fn line_span(text: &str, line: usize, with_chars: bool) -> TextSpan {
    let y0 = TOP + line as f64 * (LINE_HEIGHT + 8.0);
    let n = text.chars().count();
    let chars = if with_chars {
        text.chars()
            .enumerate()
            .map(|(i, c)| CharBox {
                c,
                bbox: char_rect(i, i + 1, y0),
            })
            .collect()
    } else {
        vec![]
    };
    TextSpan {
        text: text.to_string(),
        bbox: char_rect(0, n, y0),
        font: "Helvetica".to_string(),
        size: 10.0,
        color: 0x202020,
        flags: 0,
        chars,
    }
}

/// Rectangle covering characters `[start, end)` of a line starting at `y0`
pub fn char_rect(start: usize, end: usize, y0: f64) -> Rect {
    Rect::new(
        LEFT + start as f64 * CHAR_WIDTH,
        y0,
        LEFT + end as f64 * CHAR_WIDTH,
        y0 + LINE_HEIGHT,
    )
}

pub struct MemoryPage<'a> {
    index: usize,
    data: &'a mut PageData,
    search_enabled: bool,
    fail_extract: bool,
}

impl PageHandle for MemoryPage<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn text_spans(&self) -> Result<Vec<TextSpan>, BackendError> {
        if self.fail_extract {
            return Err(BackendError::Extract {
                page: self.index,
                message: "corrupt content stream".to_string(),
            });
        }
        Ok(self.data.spans.clone())
    }

    fn render_region(&self, clip: &Rect) -> Result<RgbImage, BackendError> {
        let w = clip.width().ceil().max(1.0) as u32;
        let h = clip.height().ceil().max(1.0) as u32;
        Ok(RgbImage::from_pixel(w, h, image::Rgb(self.data.paper)))
    }

    fn search(&self, query: &str, max_hits: usize) -> Result<Vec<SearchHit>, BackendError> {
        if !self.search_enabled {
            return Ok(vec![]);
        }
        let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
        let mut hits = Vec::new();
        for span in &self.data.spans {
            let hay: Vec<char> = span.text.chars().flat_map(char::to_lowercase).collect();
            if needle.is_empty() || hay.len() < needle.len() {
                continue;
            }
            for start in 0..=hay.len() - needle.len() {
                if hay[start..start + needle.len()] == needle[..] {
                    let rect = char_rect(start, start + needle.len(), span.bbox.y0);
                    hits.push(SearchHit {
                        quads: vec![Quad::from_rect(&rect)],
                    });
                }
            }
        }
        hits.truncate(max_hits);
        Ok(hits)
    }

    fn add_redaction(&mut self, rect: &Rect, fill: Rgb) -> Result<(), BackendError> {
        self.data.redactions.push((*rect, fill));
        Ok(())
    }

    fn apply_redactions(&mut self) -> Result<(), BackendError> {
        self.data.flattened += 1;
        Ok(())
    }

    fn text_width(&self, text: &str, _font: &str, size: f64) -> Result<f64, BackendError> {
        Ok(text.chars().count() as f64 * CHAR_WIDTH * size / 10.0)
    }

    fn insert_text(
        &mut self,
        origin: Point,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), BackendError> {
        self.data
            .inserted
            .push((origin, text.to_string(), style.clone()));
        Ok(())
    }
}

impl DocumentBackend for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&mut self, index: usize) -> Result<Box<dyn PageHandle + '_>, BackendError> {
        let count = self.pages.len();
        let search_enabled = self.search_enabled;
        let fail_extract = self.fail_extract == Some(index);
        let data = self
            .pages
            .get_mut(index)
            .ok_or(BackendError::PageOutOfRange { index, count })?;
        Ok(Box::new(MemoryPage {
            index,
            data,
            search_enabled,
            fail_extract,
        }))
    }

    fn save(&mut self) -> Result<Vec<u8>, BackendError> {
        if self.fail_save {
            return Err(BackendError::Save("disk full".to_string()));
        }
        self.saves += 1;
        Ok(self.all_inserted().join("\n").into_bytes())
    }
}
