//! Whole-document anonymization
//!
//! A run extracts the document text, resolves and allocates entity spans once
//! for the whole document, then edits pages one at a time. On each page every
//! rectangle and fill colour is captured before the first edit, so earlier
//! edits never disturb later lookups.

use crate::anonymization::allocator::{
    verify_consistency, AllocationStats, ConsistencyReport, SurrogateAllocator, SurrogatePool,
};
use crate::anonymization::audit::AuditLogger;
use crate::anonymization::classifier::EntityClassifier;
use crate::anonymization::config::ProcessingMode;
use crate::anonymization::models::{EntitySpan, RawSpan};
use crate::anonymization::resolver::{Resolution, ResolutionStats, SpanResolver};
use crate::anonymization::text::{anchor_span, byte_offsets, censor_spans, ReplacementRecord};
use crate::config::{BackgroundConfig, GeometryConfig, MutationConfig, VeilConfig};
use crate::document::backend::{DocumentBackend, PageHandle, TextSpan};
use crate::document::blocks::BlockIndex;
use crate::document::locator::GeometryLocator;
use crate::document::mutator::{EntityOutcome, PageEdit, PageMutator, PageReport};
use crate::document::sampler::BackgroundSampler;
use crate::domain::errors::{AnonymizationIssue, BackendError};
use crate::domain::Result;
use crate::{log_page_progress, log_run_complete, log_run_start};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

/// Result of one document run
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub run_id: Uuid,
    pub source: String,
    pub mode: ProcessingMode,
    pub page_count: usize,
    /// One report per page that carried entities
    pub pages: Vec<PageReport>,
    pub resolution: ResolutionStats,
    pub allocation: AllocationStats,
    pub consistency: ConsistencyReport,
    /// Document-level issues; geometry issues live on the pages
    pub issues: Vec<AnonymizationIssue>,
    /// Set when a shutdown signal stopped the run early
    pub cancelled: bool,
}

impl DocumentReport {
    fn outcomes(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.pages.iter().flat_map(|p| p.outcomes.iter())
    }

    /// Records of the entities actually changed on the page
    pub fn records(&self) -> Vec<ReplacementRecord> {
        self.outcomes()
            .filter(|o| o.status.is_success())
            .map(|o| o.record.clone())
            .collect()
    }

    /// Document and page issues together
    pub fn all_issues(&self) -> Vec<AnonymizationIssue> {
        self.issues
            .iter()
            .chain(self.pages.iter().flat_map(|p| p.issues.iter()))
            .cloned()
            .collect()
    }

    pub fn successes(&self) -> usize {
        self.pages.iter().map(PageReport::successes).sum()
    }

    pub fn failures(&self) -> usize {
        self.pages.iter().map(PageReport::failures).sum()
    }

    /// No entity was changed anywhere; not an error
    pub fn nothing_changed(&self) -> bool {
        self.successes() == 0
    }
}

/// Mutated document plus its report
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub bytes: Vec<u8>,
    pub report: DocumentReport,
}

/// Anonymizes paginated documents through a [`DocumentBackend`]
pub struct DocumentAnonymizer<R = StdRng> {
    resolver: SpanResolver,
    allocator: SurrogateAllocator<R>,
    locator: GeometryLocator,
    sampler: BackgroundSampler,
    mutator: PageMutator,
    mode: ProcessingMode,
    audit: Option<AuditLogger>,
}

impl DocumentAnonymizer<StdRng> {
    /// Build every stage from configuration
    pub fn from_config(config: &VeilConfig) -> anyhow::Result<Self> {
        let processing = &config.processing;
        let pool = SurrogatePool::load(processing.pool_path.as_deref())?;
        let mut anonymizer = Self::new(
            SpanResolver::new(processing.confidence_threshold),
            SurrogateAllocator::from_config(Arc::new(pool), processing),
            processing.mode,
        )
        .with_geometry(config.geometry.clone())
        .with_background(config.background.clone())
        .with_mutation(config.mutation.clone());

        if processing.audit.enabled {
            anonymizer.audit = Some(AuditLogger::from_config(&processing.audit)?);
        }
        Ok(anonymizer)
    }
}

impl<R: Rng> DocumentAnonymizer<R> {
    /// Create an anonymizer with default geometry, background and mutation settings
    pub fn new(
        resolver: SpanResolver,
        allocator: SurrogateAllocator<R>,
        mode: ProcessingMode,
    ) -> Self {
        Self {
            resolver,
            allocator,
            locator: GeometryLocator::new(GeometryConfig::default()),
            sampler: BackgroundSampler::new(BackgroundConfig::default()),
            mutator: PageMutator::new(MutationConfig::default(), mode),
            mode,
            audit: None,
        }
    }

    pub fn with_geometry(mut self, config: GeometryConfig) -> Self {
        self.locator = GeometryLocator::new(config);
        self
    }

    pub fn with_background(mut self, config: BackgroundConfig) -> Self {
        self.sampler = BackgroundSampler::new(config);
        self
    }

    pub fn with_mutation(mut self, config: MutationConfig) -> Self {
        self.mutator = PageMutator::new(config, self.mode);
        self
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

    /// Extract the document text the classifier runs on
    pub fn extract(&self, backend: &mut dyn DocumentBackend) -> Result<BlockIndex> {
        let mut index = BlockIndex::new();
        for page_index in 0..backend.page_count() {
            let page = backend.load_page(page_index)?;
            index.push_page(page_index, &page.text_spans()?);
        }
        tracing::debug!(
            pages = backend.page_count(),
            blocks = index.blocks().len(),
            chars = index.text().chars().count(),
            "Document text extracted"
        );
        Ok(index)
    }

    /// Extract, classify and anonymize a document
    pub fn process(
        &mut self,
        source: &str,
        backend: &mut dyn DocumentBackend,
        classifier: &dyn EntityClassifier,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<DocumentOutcome> {
        let index = self.extract(backend)?;
        let raw = classifier.classify(index.text())?;
        self.process_spans(source, backend, &index, raw, shutdown)
    }

    /// Anonymize a document given spans over `index`'s text
    ///
    /// A shutdown signal is honoured between pages; pages already edited stay
    /// edited and the partial document is still saved. Backend failures while
    /// reading a page or saving abort this document only.
    pub fn process_spans(
        &mut self,
        source: &str,
        backend: &mut dyn DocumentBackend,
        index: &BlockIndex,
        raw: Vec<RawSpan>,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<DocumentOutcome> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        log_run_start!(source, self.mode.as_str());
        self.allocator.begin_run();

        let Resolution {
            spans: resolved,
            stats: mut resolution,
            mut issues,
        } = self.resolver.resolve(raw);

        let mut spans = locate_spans(index, resolved, &mut resolution, &mut issues);

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

        let mut by_page: BTreeMap<usize, Vec<&EntitySpan>> = BTreeMap::new();
        for span in &spans {
            if let Some(location) = &span.location {
                by_page.entry(location.page).or_default().push(span);
            }
        }

        let page_count = backend.page_count();
        let mut pages = Vec::with_capacity(by_page.len());
        let mut cancelled = false;
        for (page_index, page_spans) in by_page {
            if *shutdown.borrow() {
                tracing::warn!(
                    source,
                    completed = pages.len(),
                    "Shutdown requested, stopping before page {}",
                    page_index
                );
                cancelled = true;
                break;
            }
            log_page_progress!(page_index + 1, page_count);

            let mut page = backend.load_page(page_index)?;
            pages.push(self.process_page(page.as_mut(), &page_spans)?);
        }

        let bytes = backend.save()?;

        let report = DocumentReport {
            run_id,
            source: source.to_string(),
            mode: self.mode,
            page_count,
            pages,
            resolution,
            allocation,
            consistency,
            issues,
            cancelled,
        };

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_run(run_id, source, self.mode, &report.records()) {
                tracing::warn!(error = %e, "Failed to write audit record");
            }
        }

        if report.nothing_changed() {
            tracing::info!(source, "Nothing changed in document");
        }
        log_run_complete!(source, report.successes(), started.elapsed());

        Ok(DocumentOutcome { bytes, report })
    }

    fn process_page(
        &self,
        page: &mut dyn PageHandle,
        spans: &[&EntitySpan],
    ) -> std::result::Result<PageReport, BackendError> {
        let page_index = page.index();
        let text_spans: Vec<TextSpan> = page.text_spans()?;
        let mut report = PageReport::new(page_index);

        let mut edits = Vec::with_capacity(spans.len());
        for span in spans {
            let (Some(location), Some(record)) =
                (&span.location, ReplacementRecord::from_span(span))
            else {
                continue;
            };

            let Some(located) = self.locator.locate(&*page, &text_spans, location, &span.text)
            else {
                tracing::debug!(
                    page = page_index,
                    entity_type = %span.entity_type,
                    len = span.char_len(),
                    "Geometry not found"
                );
                report.issues.push(AnonymizationIssue::GeometryNotFound {
                    page: page_index,
                    start: span.start,
                    end: span.end,
                });
                continue;
            };

            let fills = located
                .rects
                .iter()
                .map(|rect| self.sampler.sample(&*page, rect))
                .collect();

            edits.push(PageEdit {
                record,
                rects: located.rects,
                fills,
                strategy: located.strategy,
                font: location.font.clone(),
                size: location.size,
                color: location.color,
            });
        }

        report.outcomes = self.mutator.apply(page, edits);
        tracing::debug!(
            page = page_index,
            edited = report.successes(),
            failed = report.failures(),
            not_found = report.issues.len(),
            "Page processed"
        );
        Ok(report)
    }
}

/// Anchor spans in the document text and attach their block locations
fn locate_spans(
    index: &BlockIndex,
    resolved: Vec<EntitySpan>,
    resolution: &mut ResolutionStats,
    issues: &mut Vec<AnonymizationIssue>,
) -> Vec<EntitySpan> {
    let text = index.text();
    let offsets = byte_offsets(text);
    let mut spans = Vec::with_capacity(resolved.len());

    for span in resolved {
        let anchored = anchor_span(text, &offsets, span).and_then(|mut span| {
            if span.location.is_none() {
                span.location = index.find_block(span.start, span.end);
            }
            match span.location {
                Some(_) => Ok(span),
                None => Err(AnonymizationIssue::InvalidSpan {
                    start: Some(span.start),
                    end: Some(span.end),
                    reason: "no text block holds the range".to_string(),
                }),
            }
        });

        match anchored {
            Ok(span) => spans.push(span),
            Err(issue) => {
                resolution.invalid_range += 1;
                resolution.kept -= 1;
                issues.push(issue);
            }
        }
    }
    spans
}
