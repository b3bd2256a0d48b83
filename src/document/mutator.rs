//! Page edits: blanking located text and drawing its replacement

use crate::anonymization::config::ProcessingMode;
use crate::anonymization::text::ReplacementRecord;
use crate::config::MutationConfig;
use crate::document::backend::{PageHandle, TextStyle};
use crate::document::locator::LocateStrategy;
use crate::domain::errors::{AnonymizationIssue, BackendError};
use crate::domain::geometry::{Point, Rect, Rgb};
use serde::Serialize;

/// Everything needed to edit one entity, captured from the untouched page
#[derive(Debug, Clone)]
pub struct PageEdit {
    pub record: ReplacementRecord,
    pub rects: Vec<Rect>,
    /// Fill colour per rectangle
    pub fills: Vec<Rgb>,
    pub strategy: LocateStrategy,
    pub font: String,
    pub size: f64,
    /// Packed `0xRRGGBB` colour of the original text
    pub color: u32,
}

/// Why an entity was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyOriginal,
    SameAsOriginal,
}

/// What happened to one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditStatus {
    /// Blanked and redrawn with the replacement
    Replaced { font_size: f64 },
    /// Blanked only
    Blanked,
    Skipped { reason: SkipReason },
    Failed { message: String },
}

impl EditStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Replaced { .. } | Self::Blanked)
    }
}

/// Outcome for one entity on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub record: ReplacementRecord,
    pub strategy: LocateStrategy,
    pub status: EditStatus,
}

/// Per-page result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageReport {
    pub page: usize,
    pub outcomes: Vec<EntityOutcome>,
    pub issues: Vec<AnonymizationIssue>,
}

impl PageReport {
    pub fn new(page: usize) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, EditStatus::Failed { .. }))
            .count()
    }

    pub fn nothing_changed(&self) -> bool {
        self.successes() == 0
    }
}

/// Applies captured edits to a page
#[derive(Debug, Clone)]
pub struct PageMutator {
    config: MutationConfig,
    mode: ProcessingMode,
}

impl PageMutator {
    pub fn new(config: MutationConfig, mode: ProcessingMode) -> Self {
        Self { config, mode }
    }

    /// Apply `edits` last-start first; one entity's failure never stops the rest
    pub fn apply(&self, page: &mut dyn PageHandle, mut edits: Vec<PageEdit>) -> Vec<EntityOutcome> {
        edits.sort_by(|a, b| b.record.start.cmp(&a.record.start));

        edits
            .into_iter()
            .map(|edit| {
                let status = match self.skip_reason(&edit) {
                    Some(reason) => EditStatus::Skipped { reason },
                    None => self.apply_one(page, &edit).unwrap_or_else(|e| {
                        tracing::warn!(
                            page = page.index(),
                            entity_type = %edit.record.entity_type,
                            error = %e,
                            "Page edit failed"
                        );
                        EditStatus::Failed {
                            message: e.to_string(),
                        }
                    }),
                };
                EntityOutcome {
                    record: edit.record,
                    strategy: edit.strategy,
                    status,
                }
            })
            .collect()
    }

    fn skip_reason(&self, edit: &PageEdit) -> Option<SkipReason> {
        if edit.record.original.is_empty() {
            return Some(SkipReason::EmptyOriginal);
        }
        if self.mode == ProcessingMode::Replace && edit.record.surrogate == edit.record.original {
            return Some(SkipReason::SameAsOriginal);
        }
        None
    }

    fn apply_one(
        &self,
        page: &mut dyn PageHandle,
        edit: &PageEdit,
    ) -> Result<EditStatus, BackendError> {
        for (rect, fill) in edit.rects.iter().zip(&edit.fills) {
            page.add_redaction(rect, *fill)?;
        }
        page.apply_redactions()?;

        if self.mode == ProcessingMode::Censor {
            return Ok(EditStatus::Blanked);
        }
        let Some(first) = edit.rects.first() else {
            return Ok(EditStatus::Blanked);
        };

        let font = page.closest_font(&edit.font);
        let measured = page.text_width(&edit.record.surrogate, &font, edit.size);
        let font_size = self.fit_font_size(edit.size, measured.ok(), first.width());

        let origin = Point::new(first.x0, first.y1 - self.config.baseline_offset);
        let style = TextStyle {
            font,
            size: font_size,
            color: Rgb::from_packed(edit.color),
        };
        page.insert_text(origin, &edit.record.surrogate, &style)?;

        Ok(EditStatus::Replaced { font_size })
    }

    /// Font size for text of `measured` width at `size` in a box `rect_width` wide
    ///
    /// `None` means the text could not be measured.
    pub fn fit_font_size(&self, size: f64, measured: Option<f64>, rect_width: f64) -> f64 {
        let min = self.config.min_font_size;
        match measured {
            Some(width) if width <= rect_width * self.config.width_tolerance => size,
            Some(width) => {
                (size * (rect_width / width.max(1e-6)) * self.config.shrink_factor).max(min)
            }
            None => (size * self.config.fallback_scale).max(min),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::models::{AllocationTier, EntityType};
    use crate::document::backend::{SearchHit, TextSpan};
    use image::RgbImage;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Redact(Rect, Rgb),
        Flatten,
        Insert(Point, String, TextStyle),
    }

    #[derive(Default)]
    struct RecordingPage {
        ops: Vec<Op>,
        fail_insert: bool,
        fail_measure: bool,
    }

    impl PageHandle for RecordingPage {
        fn index(&self) -> usize {
            0
        }

        fn text_spans(&self) -> Result<Vec<TextSpan>, BackendError> {
            Ok(vec![])
        }

        fn render_region(&self, _clip: &Rect) -> Result<RgbImage, BackendError> {
            Ok(RgbImage::new(1, 1))
        }

        fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, BackendError> {
            Ok(vec![])
        }

        fn add_redaction(&mut self, rect: &Rect, fill: Rgb) -> Result<(), BackendError> {
            self.ops.push(Op::Redact(*rect, fill));
            Ok(())
        }

        fn apply_redactions(&mut self) -> Result<(), BackendError> {
            self.ops.push(Op::Flatten);
            Ok(())
        }

        fn text_width(&self, text: &str, _font: &str, size: f64) -> Result<f64, BackendError> {
            if self.fail_measure {
                return Err(BackendError::Insert {
                    page: 0,
                    message: "no metrics".to_string(),
                });
            }
            Ok(text.chars().count() as f64 * size * 0.5)
        }

        fn insert_text(
            &mut self,
            origin: Point,
            text: &str,
            style: &TextStyle,
        ) -> Result<(), BackendError> {
            if self.fail_insert {
                return Err(BackendError::Insert {
                    page: 0,
                    message: "font missing".to_string(),
                });
            }
            self.ops
                .push(Op::Insert(origin, text.to_string(), style.clone()));
            Ok(())
        }
    }

    fn edit(original: &str, surrogate: &str, start: usize) -> PageEdit {
        let rect = Rect::new(10.0 * start as f64, 100.0, 10.0 * start as f64 + 60.0, 112.0);
        PageEdit {
            record: ReplacementRecord {
                original: original.to_string(),
                surrogate: surrogate.to_string(),
                entity_type: EntityType::PersonName,
                confidence: 0.9,
                tier: AllocationTier::ExactLength,
                start,
                end: start + original.chars().count(),
            },
            rects: vec![rect],
            fills: vec![Rgb::new(1.0, 1.0, 1.0)],
            strategy: LocateStrategy::TextSearch,
            font: "Helvetica".to_string(),
            size: 10.0,
            color: 0xFF0000,
        }
    }

    fn mutator(mode: ProcessingMode) -> PageMutator {
        PageMutator::new(MutationConfig::default(), mode)
    }

    #[test]
    fn test_replace_blanks_then_inserts() {
        let mut page = RecordingPage::default();
        let outcomes =
            mutator(ProcessingMode::Replace).apply(&mut page, vec![edit("Ahmet", "Mehme", 0)]);

        assert_eq!(outcomes[0].status, EditStatus::Replaced { font_size: 10.0 });
        assert_eq!(page.ops.len(), 3);
        assert!(matches!(page.ops[0], Op::Redact(_, _)));
        assert_eq!(page.ops[1], Op::Flatten);
        match &page.ops[2] {
            Op::Insert(origin, text, style) => {
                assert_eq!(*origin, Point::new(0.0, 110.0));
                assert_eq!(text, "Mehme");
                assert_eq!(style.font, "helv");
                assert_eq!(style.color, Rgb::new(1.0, 0.0, 0.0));
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn test_edits_applied_in_descending_start_order() {
        let mut page = RecordingPage::default();
        let outcomes = mutator(ProcessingMode::Replace).apply(
            &mut page,
            vec![edit("Ali", "Can", 2), edit("Veli", "Ayse", 9)],
        );
        let starts: Vec<usize> = outcomes.iter().map(|o| o.record.start).collect();
        assert_eq!(starts, vec![9, 2]);
    }

    #[test]
    fn test_censor_mode_only_blanks() {
        let mut page = RecordingPage::default();
        let outcomes =
            mutator(ProcessingMode::Censor).apply(&mut page, vec![edit("Ahmet", "*****", 0)]);
        assert_eq!(outcomes[0].status, EditStatus::Blanked);
        assert!(!page.ops.iter().any(|op| matches!(op, Op::Insert(..))));
    }

    #[test]
    fn test_skips() {
        let mut page = RecordingPage::default();
        let outcomes = mutator(ProcessingMode::Replace).apply(
            &mut page,
            vec![edit("Ahmet", "Ahmet", 0), edit("", "x", 5)],
        );
        let statuses: Vec<&EditStatus> = outcomes.iter().map(|o| &o.status).collect();
        assert_eq!(
            statuses,
            vec![
                &EditStatus::Skipped {
                    reason: SkipReason::EmptyOriginal
                },
                &EditStatus::Skipped {
                    reason: SkipReason::SameAsOriginal
                },
            ]
        );
        assert!(page.ops.is_empty());
    }

    #[test]
    fn test_insert_failure_is_recorded_per_entity() {
        let mut page = RecordingPage {
            fail_insert: true,
            ..Default::default()
        };
        let outcomes = mutator(ProcessingMode::Replace).apply(
            &mut page,
            vec![edit("Ali", "Can", 2), edit("Veli", "Ayse", 9)],
        );
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.status, EditStatus::Failed { .. })));

        let report = PageReport {
            page: 0,
            outcomes,
            issues: vec![],
        };
        assert_eq!(report.failures(), 2);
        assert!(report.nothing_changed());
    }

    #[test]
    fn test_unmeasurable_text_uses_fallback_scale() {
        let mut page = RecordingPage {
            fail_measure: true,
            ..Default::default()
        };
        let outcomes =
            mutator(ProcessingMode::Replace).apply(&mut page, vec![edit("Ahmet", "Mehme", 0)]);
        assert_eq!(outcomes[0].status, EditStatus::Replaced { font_size: 8.0 });
    }

    #[test]
    fn test_fit_font_size() {
        let m = mutator(ProcessingMode::Replace);
        // within tolerance
        assert_eq!(m.fit_font_size(10.0, Some(65.0), 60.0), 10.0);
        // shrink: 10 * 60/120 * 0.9
        assert!((m.fit_font_size(10.0, Some(120.0), 60.0) - 4.5f64.max(6.0)).abs() < 1e-9);
        assert!((m.fit_font_size(20.0, Some(100.0), 60.0) - 10.8).abs() < 1e-9);
        // unmeasurable
        assert_eq!(m.fit_font_size(6.5, None, 60.0), 6.0);
    }
}
