//! Mapping block-relative offsets back to page rectangles
//!
//! Strategies are tried in order and the first one producing rectangles wins:
//!
//! | Strategy | Source of the rectangles |
//! |----------|--------------------------|
//! | [`LocateStrategy::TextSearch`] | page search for the span text, hit closest to the block |
//! | [`LocateStrategy::CharacterBoxes`] | per-character boxes of the matching extracted span |
//! | [`LocateStrategy::InterpolatedSpan`] | proportional slice of the matching span's box |
//!
//! A span that no strategy can place is skipped by the caller and reported
//! as [`GeometryNotFound`](crate::domain::AnonymizationIssue::GeometryNotFound).

use crate::anonymization::models::SourceLocation;
use crate::config::GeometryConfig;
use crate::document::backend::{PageHandle, TextSpan};
use crate::document::normalize::{normalize_for_search, query_variants};
use crate::domain::geometry::Rect;
use serde::Serialize;

/// Geometry recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateStrategy {
    TextSearch,
    CharacterBoxes,
    InterpolatedSpan,
}

impl LocateStrategy {
    /// Strategies in the order they are tried
    pub const CHAIN: [LocateStrategy; 3] = [
        Self::TextSearch,
        Self::CharacterBoxes,
        Self::InterpolatedSpan,
    ];
}

/// Rectangles covering one span
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    /// One rectangle per visual line; never empty
    pub rects: Vec<Rect>,
    pub strategy: LocateStrategy,
}

/// Resolves [`SourceLocation`]s to rectangles on a page
#[derive(Debug, Clone)]
pub struct GeometryLocator {
    config: GeometryConfig,
}

impl GeometryLocator {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Locate the characters `location` refers to
    ///
    /// `spans` are the page's extracted spans, captured before any mutation.
    pub fn locate(
        &self,
        page: &dyn PageHandle,
        spans: &[TextSpan],
        location: &SourceLocation,
        span_text: &str,
    ) -> Option<Located> {
        LocateStrategy::CHAIN.iter().find_map(|&strategy| {
            let rects = match strategy {
                LocateStrategy::TextSearch => self.by_search(page, location, span_text),
                LocateStrategy::CharacterBoxes => self.by_char_boxes(spans, location),
                LocateStrategy::InterpolatedSpan => self.by_interpolation(spans, location),
            }?;

            tracing::trace!(page = location.page, ?strategy, rects = rects.len(), "Span located");
            Some(Located { rects, strategy })
        })
    }

    fn by_search(
        &self,
        page: &dyn PageHandle,
        location: &SourceLocation,
        span_text: &str,
    ) -> Option<Vec<Rect>> {
        let query = block_slice(location).unwrap_or_else(|| span_text.to_string());
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let anchor = location.bbox.top_left();
        for variant in query_variants(query, self.config.despace_max_chars) {
            let hits = match page.search(&variant, self.config.max_search_hits) {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::debug!(page = location.page, error = %e, "Text search failed");
                    return None;
                }
            };

            let closest = hits
                .iter()
                .filter_map(|hit| Some((hit.first_rect()?.top_left().manhattan(&anchor), hit)))
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, hit)| hit);

            if let Some(hit) = closest {
                return Some(hit.rects());
            }
        }
        None
    }

    fn by_char_boxes(&self, spans: &[TextSpan], location: &SourceLocation) -> Option<Vec<Rect>> {
        let (span, rel_start, rel_end) = self.matching_span(spans, location)?;
        if span.chars.is_empty() {
            return None;
        }

        let n = span.chars.len();
        let a = rel_start.min(n - 1);
        let b = (a + 1).max(rel_end.min(n));
        let rect = Rect::envelope(span.chars[a..b].iter().map(|c| &c.bbox))?;
        Some(vec![rect])
    }

    fn by_interpolation(
        &self,
        spans: &[TextSpan],
        location: &SourceLocation,
    ) -> Option<Vec<Rect>> {
        let (span, rel_start, rel_end) = self.matching_span(spans, location)?;
        let bbox = span.bbox;
        if bbox.width() <= 0.0 {
            return Some(vec![bbox]);
        }

        let len = span.text.chars().count().max(1) as f64;
        let x_start = bbox.x0 + bbox.width() * (rel_start as f64 / len);
        let x_end = bbox.x0 + bbox.width() * (rel_end as f64 / len);
        Some(vec![Rect::new(
            x_start.min(x_end),
            bbox.y0,
            x_start.max(x_end),
            bbox.y1,
        )])
    }

    /// Extracted span holding the block, with offsets shifted into the raw span text
    fn matching_span<'a>(
        &self,
        spans: &'a [TextSpan],
        location: &SourceLocation,
    ) -> Option<(&'a TextSpan, usize, usize)> {
        if location.block_text.is_empty() || location.relative_end <= location.relative_start {
            return None;
        }

        let target = normalize_for_search(&location.block_text);
        let anchor = location.bbox.top_left();
        let span = spans.iter().find(|s| {
            s.bbox.top_left().manhattan(&anchor) < self.config.span_match_tolerance
                && normalize_for_search(&s.text) == target
        })?;

        let leading = span.text.chars().take_while(|c| c.is_whitespace()).count();
        Some((
            span,
            location.relative_start + leading,
            location.relative_end + leading,
        ))
    }
}

/// The span's characters inside the block, when the offsets are in range
fn block_slice(location: &SourceLocation) -> Option<String> {
    let len = location.block_text.chars().count();
    if location.relative_start >= location.relative_end || location.relative_end > len {
        return None;
    }
    Some(
        location
            .block_text
            .chars()
            .skip(location.relative_start)
            .take(location.relative_end - location.relative_start)
            .collect(),
    )
}
