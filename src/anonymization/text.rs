//! Plain-text anonymization
//!
//! Resolves classifier spans against a string, allocates (or censors)
//! replacements and splices them back in.

use crate::anonymization::allocator::{
    verify_consistency, AllocationStats, ConsistencyReport, SurrogateAllocator, SurrogatePool,
};
use crate::anonymization::audit::AuditLogger;
use crate::anonymization::censor::censor;
use crate::anonymization::classifier::EntityClassifier;
use crate::anonymization::config::{ProcessingConfig, ProcessingMode};
use crate::anonymization::models::{AllocationTier, EntitySpan, EntityType, RawSpan};
use crate::anonymization::resolver::{Resolution, ResolutionStats, SpanResolver};
use crate::domain::errors::AnonymizationIssue;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// One applied replacement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementRecord {
    pub original: String,
    pub surrogate: String,
    pub entity_type: EntityType,
    pub confidence: f32,
    pub tier: AllocationTier,
    pub start: usize,
    pub end: usize,
}

impl ReplacementRecord {
    pub(crate) fn from_span(span: &EntitySpan) -> Option<Self> {
        Some(Self {
            original: span.text.clone(),
            surrogate: span.replacement.clone()?,
            entity_type: span.entity_type,
            confidence: span.confidence,
            tier: span.tier?,
            start: span.start,
            end: span.end,
        })
    }
}

/// Confidence spread over the kept spans
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceSummary {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

/// Per-text statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextStatistics {
    pub total_entities: usize,
    pub entity_counts: BTreeMap<EntityType, usize>,
    pub confidence: Option<ConfidenceSummary>,
    /// Share of spans whose replacement differs from the original
    pub success_rate: f64,
}

impl TextStatistics {
    pub fn from_spans(spans: &[EntitySpan]) -> Self {
        let mut entity_counts = BTreeMap::new();
        for span in spans {
            *entity_counts.entry(span.entity_type).or_insert(0) += 1;
        }

        let confidence = (!spans.is_empty()).then(|| {
            let (min, max, sum) =
                spans
                    .iter()
                    .fold((f32::MAX, f32::MIN, 0.0f32), |(min, max, sum), s| {
                        (
                            min.min(s.confidence),
                            max.max(s.confidence),
                            sum + s.confidence,
                        )
                    });
            ConfidenceSummary {
                min,
                max,
                avg: sum / spans.len() as f32,
            }
        });

        let replaced = spans.iter().filter(|s| s.is_replaced()).count();
        let success_rate = if spans.is_empty() {
            0.0
        } else {
            replaced as f64 / spans.len() as f64
        };

        Self {
            total_entities: spans.len(),
            entity_counts,
            confidence,
            success_rate,
        }
    }
}

/// Everything produced for one text
#[derive(Debug, Clone, Serialize)]
pub struct TextOutcome {
    pub run_id: Uuid,
    /// The text with replacements applied
    pub text: String,
    pub records: Vec<ReplacementRecord>,
    #[serde(skip)]
    pub spans: Vec<EntitySpan>,
    pub resolution: ResolutionStats,
    pub allocation: AllocationStats,
    pub statistics: TextStatistics,
    pub consistency: ConsistencyReport,
    pub issues: Vec<AnonymizationIssue>,
}

/// Replaces entity spans inside plain strings
pub struct TextAnonymizer<R = StdRng> {
    resolver: SpanResolver,
    allocator: SurrogateAllocator<R>,
    mode: ProcessingMode,
    audit: Option<AuditLogger>,
}

impl TextAnonymizer<StdRng> {
    /// Build from configuration, loading the configured or embedded pools
    pub fn from_config(config: &ProcessingConfig) -> anyhow::Result<Self> {
        let pool = SurrogatePool::load(config.pool_path.as_deref())?;
        let allocator = SurrogateAllocator::from_config(Arc::new(pool), config);
        let mut anonymizer = Self::new(
            SpanResolver::new(config.confidence_threshold),
            allocator,
            config.mode,
        );
        if config.audit.enabled {
            anonymizer = anonymizer.with_audit(AuditLogger::from_config(&config.audit)?);
        }
        Ok(anonymizer)
    }
}

impl<R: Rng> TextAnonymizer<R> {
    pub fn new(
        resolver: SpanResolver,
        allocator: SurrogateAllocator<R>,
        mode: ProcessingMode,
    ) -> Self {
        Self {
            resolver,
            allocator,
            mode,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn allocator(&self) -> &SurrogateAllocator<R> {
        &self.allocator
    }

    /// Classify `text` and anonymize it
    pub fn classify_and_process(
        &mut self,
        classifier: &dyn EntityClassifier,
        text: &str,
    ) -> crate::domain::Result<TextOutcome> {
        let raw = classifier.classify(text)?;
        Ok(self.process(text, raw))
    }

    /// Anonymize one text with the given classifier spans
    pub fn process(&mut self, text: &str, raw: Vec<RawSpan>) -> TextOutcome {
        self.process_named("text", text, raw)
    }

    /// Like [`process`](Self::process), labelling the audit record with `source`
    pub fn process_named(&mut self, source: &str, text: &str, raw: Vec<RawSpan>) -> TextOutcome {
        let run_id = Uuid::new_v4();
        self.allocator.begin_run();

        let Resolution {
            spans: resolved,
            stats: mut resolution,
            mut issues,
        } = self.resolver.resolve(raw);

        let offsets = byte_offsets(text);
        let mut spans = Vec::with_capacity(resolved.len());
        for span in resolved {
            match anchor_span(text, &offsets, span) {
                Ok(span) => spans.push(span),
                Err(issue) => {
                    resolution.invalid_range += 1;
                    resolution.kept -= 1;
                    issues.push(issue);
                }
            }
        }

        let allocation = match self.mode {
            ProcessingMode::Replace => {
                let summary = self.allocator.allocate(&mut spans);
                issues.extend(summary.issues);
                summary.stats
            }
            ProcessingMode::Censor => censor_spans(&mut spans),
        };

        let consistency = verify_consistency(&spans);
        issues.extend(consistency.violations.iter().cloned());

        let mutated = apply_replacements(text, &offsets, &spans);
        let records: Vec<ReplacementRecord> =
            spans.iter().filter_map(ReplacementRecord::from_span).collect();

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_run(run_id, source, self.mode, &records) {
                tracing::warn!(error = %e, "Failed to write audit record");
            }
        }

        tracing::info!(
            %run_id,
            source,
            entities = spans.len(),
            replaced = allocation.successful,
            issues = issues.len(),
            "Text anonymized"
        );

        TextOutcome {
            run_id,
            text: mutated,
            statistics: TextStatistics::from_spans(&spans),
            records,
            spans,
            resolution,
            allocation,
            consistency,
            issues,
        }
    }

    /// Anonymize several texts in order
    ///
    /// With per-batch scope identical originals keep one surrogate across the
    /// whole batch; with per-document scope every text starts fresh. Sticky
    /// scope starts fresh but lets originals reclaim their earlier surrogate.
    pub fn process_batch<I, S>(&mut self, items: I) -> Vec<TextOutcome>
    where
        I: IntoIterator<Item = (S, Vec<RawSpan>)>,
        S: AsRef<str>,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(index, (text, raw))| {
                self.process_named(&format!("batch[{index}]"), text.as_ref(), raw)
            })
            .collect()
    }
}

/// Mask every span in place
pub(crate) fn censor_spans(spans: &mut [EntitySpan]) -> AllocationStats {
    let mut stats = AllocationStats::default();
    for span in spans.iter_mut() {
        let masked = censor(&span.text);
        stats.record(span.entity_type, AllocationTier::Censored, masked != span.text);
        span.replacement = Some(masked);
        span.tier = Some(AllocationTier::Censored);
    }
    stats
}

/// Byte offset of every character boundary, including the end
pub(crate) fn byte_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Re-read the span from the text and shrink it to its non-blank core
pub(crate) fn anchor_span(
    text: &str,
    offsets: &[usize],
    mut span: EntitySpan,
) -> std::result::Result<EntitySpan, AnonymizationIssue> {
    let invalid = |reason: &str| AnonymizationIssue::InvalidSpan {
        start: Some(span.start),
        end: Some(span.end),
        reason: reason.to_string(),
    };

    if span.end >= offsets.len() {
        return Err(invalid("range exceeds text length"));
    }

    let slice = &text[offsets[span.start]..offsets[span.end]];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return Err(invalid("blank text"));
    }

    let leading = slice.chars().take_while(|c| c.is_whitespace()).count();
    span.start += leading;
    span.end = span.start + trimmed.chars().count();
    span.text = trimmed.to_string();
    Ok(span)
}

/// Splice replacements into `text`, last span first
fn apply_replacements(text: &str, offsets: &[usize], spans: &[EntitySpan]) -> String {
    let mut ordered: Vec<&EntitySpan> = spans.iter().filter(|s| s.is_replaced()).collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let mut out = text.to_string();
    for span in ordered {
        if let Some(replacement) = &span.replacement {
            out.replace_range(offsets[span.start]..offsets[span.end], replacement);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anonymizer(mode: ProcessingMode) -> TextAnonymizer {
        let pool = SurrogatePool::from_samples(vec![
            (EntityType::PersonName, vec!["Kemal", "Deniz", "Sibel", "Burak Demir1"]),
            (EntityType::Organization, vec!["Globex"]),
        ]);
        TextAnonymizer::new(
            SpanResolver::new(0.5),
            SurrogateAllocator::seeded(Arc::new(pool), 5),
            mode,
        )
    }

    #[test]
    fn test_replaces_spans_consistently() {
        let text = "Ahmet aradı. Sonra ahmet tekrar aradı.";
        let raw = vec![
            RawSpan::new("PERSON", "Ahmet", 0, 5, 0.9),
            RawSpan::new("PERSON", "ahmet", 19, 24, 0.8),
        ];
        let outcome = anonymizer(ProcessingMode::Replace).process(text, raw);

        assert_eq!(outcome.records.len(), 2);
        let surrogate = &outcome.records[0].surrogate;
        assert_eq!(surrogate, &outcome.records[1].surrogate);
        assert_eq!(surrogate.chars().count(), 5);
        assert_eq!(
            outcome.text,
            format!("{surrogate} aradı. Sonra {surrogate} tekrar aradı.")
        );
        assert!(outcome.consistency.is_consistent);
        assert_eq!(outcome.statistics.success_rate, 1.0);
    }

    #[test]
    fn test_censor_mode_masks() {
        let text = "Sayın Ahmet Yilmaz, hoş geldiniz";
        let raw = vec![RawSpan::new("PERSON", "Ahmet Yilmaz", 6, 18, 0.99)];
        let outcome = anonymizer(ProcessingMode::Censor).process(text, raw);
        assert_eq!(outcome.text, "Sayın ***** ******, hoş geldiniz");
        assert_eq!(outcome.records[0].tier, AllocationTier::Censored);
        assert_eq!(outcome.allocation.tier_count(AllocationTier::Censored), 1);
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let text = "Şükrü ile Ayşe";
        let raw = vec![RawSpan::new("PERSON", "Ayşe", 10, 14, 0.9)];
        let outcome = anonymizer(ProcessingMode::Censor).process(text, raw);
        assert_eq!(outcome.text, "Şükrü ile ****");
    }

    #[test]
    fn test_spans_are_trimmed_to_content() {
        let text = "x  Ahmet  y";
        let raw = vec![RawSpan::new("PERSON", " Ahmet ", 2, 9, 0.9)];
        let outcome = anonymizer(ProcessingMode::Censor).process(text, raw);
        assert_eq!(outcome.text, "x  *****  y");
        assert_eq!((outcome.records[0].start, outcome.records[0].end), (3, 8));
    }

    #[test]
    fn test_out_of_range_span_is_reported() {
        let raw = vec![RawSpan::new("PERSON", "Ahmet", 3, 40, 0.9)];
        let outcome = anonymizer(ProcessingMode::Replace).process("short", raw);
        assert_eq!(outcome.text, "short");
        assert_eq!(outcome.resolution.kept, 0);
        assert_eq!(outcome.resolution.invalid_range, 1);
        assert!(matches!(
            outcome.issues[0],
            AnonymizationIssue::InvalidSpan { .. }
        ));
    }

    #[test]
    fn test_statistics() {
        let text = "Ahmet Acme'de";
        let raw = vec![
            RawSpan::new("PERSON", "Ahmet", 0, 5, 0.6),
            RawSpan::new("ORG", "Acme", 6, 10, 1.0),
        ];
        let outcome = anonymizer(ProcessingMode::Replace).process(text, raw);
        let stats = &outcome.statistics;
        assert_eq!(stats.total_entities, 2);
        assert_eq!(stats.entity_counts[&EntityType::Organization], 1);
        let confidence = stats.confidence.unwrap();
        assert_eq!(confidence.min, 0.6);
        assert_eq!(confidence.max, 1.0);
        assert!((confidence.avg - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_batch_scope() {
        let items = || {
            vec![
                ("Ahmet", vec![RawSpan::new("PERSON", "Ahmet", 0, 5, 0.9)]),
                ("Ahmet", vec![RawSpan::new("PERSON", "Ahmet", 0, 5, 0.9)]),
            ]
        };

        let pool = Arc::new(SurrogatePool::from_samples(vec![(
            EntityType::PersonName,
            vec!["Kemal", "Deniz", "Sibel"],
        )]));
        let config = ProcessingConfig {
            consistency_scope: crate::anonymization::config::ConsistencyScope::PerBatch,
            seed: Some(1),
            ..Default::default()
        };
        let mut batch = TextAnonymizer::new(
            SpanResolver::new(0.5),
            SurrogateAllocator::from_config(pool, &config),
            ProcessingMode::Replace,
        );
        let outcomes = batch.process_batch(items());
        assert_eq!(outcomes[0].text, outcomes[1].text);
        assert_eq!(outcomes[1].records[0].tier, AllocationTier::Consistent);
    }
}
