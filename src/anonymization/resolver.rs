//! Span filtering and overlap resolution
//!
//! Raw classifier output is noisy: spans without offsets, spans below the
//! confidence threshold and spans that overlap each other. The resolver turns
//! it into an ordered, pairwise-disjoint list of [`EntitySpan`]s.

use crate::anonymization::models::{EntitySpan, EntityType, RawSpan};
use crate::domain::errors::AnonymizationIssue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Threshold used when the configured one is not a probability
pub const FALLBACK_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Counters describing what the resolver dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub received: usize,
    pub invalid_range: usize,
    pub low_confidence: usize,
    pub overlapping: usize,
    pub kept: usize,
}

impl ResolutionStats {
    pub fn dropped(&self) -> usize {
        self.invalid_range + self.low_confidence + self.overlapping
    }
}

/// Result of a resolution pass
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Kept spans, sorted by start offset
    pub spans: Vec<EntitySpan>,
    pub stats: ResolutionStats,
    /// One entry per span excluded for a malformed range
    pub issues: Vec<AnonymizationIssue>,
}

/// Filters and deduplicates raw candidate spans
#[derive(Debug, Clone)]
pub struct SpanResolver {
    threshold: f32,
}

impl SpanResolver {
    /// Create a resolver; thresholds outside `[0, 1]` fall back to
    /// [`FALLBACK_CONFIDENCE_THRESHOLD`]
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
            threshold
        } else {
            tracing::warn!(
                threshold,
                fallback = FALLBACK_CONFIDENCE_THRESHOLD,
                "Invalid confidence threshold, using fallback"
            );
            FALLBACK_CONFIDENCE_THRESHOLD
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Resolve raw spans into ordered, disjoint entity spans
    pub fn resolve(&self, raw: Vec<RawSpan>) -> Resolution {
        let mut stats = ResolutionStats {
            received: raw.len(),
            ..Default::default()
        };
        let mut issues = Vec::new();
        let mut candidates = Vec::with_capacity(raw.len());

        for span in raw {
            let (start, end) = match (span.start, span.end) {
                (Some(s), Some(e)) if s < e => (s, e),
                (start, end) => {
                    stats.invalid_range += 1;
                    issues.push(AnonymizationIssue::InvalidSpan {
                        start,
                        end,
                        reason: "missing or degenerate range".to_string(),
                    });
                    continue;
                }
            };

            if !span.score.is_finite() || span.score < self.threshold {
                stats.low_confidence += 1;
                continue;
            }

            let mut entity = EntitySpan::new(
                EntityType::from_model_label(&span.label),
                span.text.trim(),
                start,
                end,
                span.score,
            );
            entity.method = span.method;
            entity.location = span.location;
            candidates.push(entity);
        }

        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
        });

        let spans = remove_overlaps(candidates, &mut stats);
        stats.kept = spans.len();

        tracing::debug!(
            received = stats.received,
            kept = stats.kept,
            invalid_range = stats.invalid_range,
            low_confidence = stats.low_confidence,
            overlapping = stats.overlapping,
            "Resolved candidate spans"
        );

        Resolution {
            spans,
            stats,
            issues,
        }
    }
}

/// Keep the highest-scoring span of every overlapping group
///
/// Candidates are visited by score (earlier sorted position wins ties) and a
/// candidate survives only if it intersects no span kept so far. `sorted`
/// must already be ordered by (start, score desc).
fn remove_overlaps(sorted: Vec<EntitySpan>, stats: &mut ResolutionStats) -> Vec<EntitySpan> {
    let mut visit: Vec<usize> = (0..sorted.len()).collect();
    visit.sort_by(|&a, &b| {
        sorted[b]
            .confidence
            .partial_cmp(&sorted[a].confidence)
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    // start -> (end, index); kept ranges are disjoint so ends ascend with starts
    let mut kept: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
    for idx in visit {
        let span = &sorted[idx];
        let clashes = kept
            .range(..span.end)
            .next_back()
            .is_some_and(|(_, &(end, _))| end > span.start);
        if clashes {
            stats.overlapping += 1;
        } else {
            kept.insert(span.start, (span.end, idx));
        }
    }

    let mut keep = vec![false; sorted.len()];
    for (_, (_, idx)) in kept {
        keep[idx] = true;
    }
    sorted
        .into_iter()
        .zip(keep)
        .filter_map(|(span, k)| k.then_some(span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(start: usize, end: usize, score: f32) -> RawSpan {
        RawSpan::new("PERSON", "x", start, end, score)
    }

    #[test]
    fn test_drops_invalid_ranges() {
        let mut missing = raw(0, 1, 0.9);
        missing.end = None;
        let resolution =
            SpanResolver::new(0.7).resolve(vec![raw(5, 5, 0.9), raw(7, 3, 0.9), missing]);
        assert!(resolution.spans.is_empty());
        assert_eq!(resolution.stats.invalid_range, 3);
        assert_eq!(resolution.issues.len(), 3);
    }

    #[test]
    fn test_drops_low_confidence() {
        let resolution = SpanResolver::new(0.7).resolve(vec![raw(0, 4, 0.69), raw(5, 9, 0.7)]);
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].start, 5);
        assert_eq!(resolution.stats.low_confidence, 1);
    }

    #[test]
    fn test_nan_score_is_dropped() {
        let resolution = SpanResolver::new(0.0).resolve(vec![raw(0, 4, f32::NAN)]);
        assert!(resolution.spans.is_empty());
        assert_eq!(resolution.stats.low_confidence, 1);
    }

    #[test]
    fn test_invalid_threshold_falls_back() {
        assert_eq!(SpanResolver::new(1.5).threshold(), FALLBACK_CONFIDENCE_THRESHOLD);
        assert_eq!(SpanResolver::new(-0.1).threshold(), FALLBACK_CONFIDENCE_THRESHOLD);
        assert_eq!(SpanResolver::new(f32::NAN).threshold(), FALLBACK_CONFIDENCE_THRESHOLD);
        assert_eq!(SpanResolver::new(0.8).threshold(), 0.8);
    }

    #[test]
    fn test_highest_score_wins() {
        let resolution = SpanResolver::new(0.5).resolve(vec![raw(0, 10, 0.8), raw(5, 12, 0.95)]);
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].start, 5);
        assert_eq!(resolution.stats.overlapping, 1);
    }

    #[test]
    fn test_tie_keeps_first_in_sorted_order() {
        let resolution = SpanResolver::new(0.5).resolve(vec![raw(3, 8, 0.9), raw(0, 5, 0.9)]);
        assert_eq!(resolution.spans.len(), 1);
        assert_eq!(resolution.spans[0].start, 0);
    }

    #[test]
    fn test_overlap_is_global_not_neighbour_only() {
        // The wide low-score span overlaps both others; the strong middle span
        // must suppress it even though it is not adjacent in sorted order.
        let resolution = SpanResolver::new(0.5).resolve(vec![
            raw(0, 20, 0.6),
            raw(2, 4, 0.7),
            raw(10, 14, 0.99),
        ]);
        let starts: Vec<_> = resolution.spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![2, 10]);
        assert_eq!(resolution.stats.overlapping, 1);
    }

    #[test]
    fn test_chain_keeps_non_overlapping_tail() {
        let resolution = SpanResolver::new(0.5).resolve(vec![
            raw(0, 5, 0.9),
            raw(4, 10, 0.8),
            raw(9, 15, 0.7),
        ]);
        let starts: Vec<_> = resolution.spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 9]);
    }

    #[test]
    fn test_touching_spans_do_not_overlap() {
        let resolution = SpanResolver::new(0.5).resolve(vec![raw(0, 5, 0.9), raw(5, 9, 0.9)]);
        assert_eq!(resolution.spans.len(), 2);
    }

    #[test]
    fn test_output_is_disjoint_and_sorted() {
        let spans = vec![
            raw(30, 40, 0.75),
            raw(0, 3, 0.9),
            raw(2, 8, 0.92),
            raw(35, 38, 0.8),
            raw(12, 18, 0.71),
        ];
        let resolution = SpanResolver::new(0.7).resolve(spans);
        for pair in resolution.spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(resolution.stats.received, 5);
        assert_eq!(resolution.stats.kept + resolution.stats.dropped(), 5);
    }

    #[test]
    fn test_label_is_mapped() {
        let resolution =
            SpanResolver::new(0.5).resolve(vec![RawSpan::new("ORG", " Acme ", 0, 6, 0.9)]);
        assert_eq!(resolution.spans[0].entity_type, EntityType::Organization);
        assert_eq!(resolution.spans[0].text, "Acme");
    }
}
