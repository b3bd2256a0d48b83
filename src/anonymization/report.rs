//! Run reporting
//!
//! Aggregates the outcome of several texts or documents into one summary that
//! renders to the console or to JSON.

use crate::anonymization::models::{AllocationTier, EntityType};
use crate::anonymization::text::{ReplacementRecord, TextOutcome};
use crate::domain::errors::AnonymizationIssue;
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_SAMPLES: usize = 20;
const SAMPLES_PER_UNIT: usize = 3;
const MAX_SAMPLE_CHARS: usize = 50;

/// Summary of one or more anonymization runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnonymizationReport {
    /// Texts or documents processed
    pub total_units: usize,

    /// Entities kept after resolution
    pub total_entities: usize,

    /// Entities whose replacement differs from the original
    pub replaced: usize,

    pub entities_by_type: BTreeMap<EntityType, usize>,

    pub entities_by_tier: BTreeMap<AllocationTier, usize>,

    /// Before/after examples
    pub samples: Vec<ReplacementSample>,

    pub warnings: Vec<String>,

    pub stats: ProcessingStats,
}

/// Before/after example
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementSample {
    /// Original value (truncated)
    pub original: String,
    pub replacement: String,
    pub entity_type: EntityType,
    pub tier: AllocationTier,
    pub confidence: f32,
}

/// Processing statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub avg_processing_time_ms: u64,
    pub total_processing_time_ms: u64,
    pub units_with_entities: usize,
    pub units_without_entities: usize,
}

impl AnonymizationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the result of a plain-text run
    pub fn add_text(&mut self, outcome: &TextOutcome, processing_time_ms: u64) {
        self.add_unit(&outcome.records, &outcome.issues, processing_time_ms);
    }

    /// Add one processed unit
    pub fn add_unit(
        &mut self,
        records: &[ReplacementRecord],
        issues: &[AnonymizationIssue],
        processing_time_ms: u64,
    ) {
        self.total_units += 1;
        self.stats.total_processing_time_ms += processing_time_ms;
        self.stats.avg_processing_time_ms =
            self.stats.total_processing_time_ms / self.total_units as u64;

        if records.is_empty() {
            self.stats.units_without_entities += 1;
        } else {
            self.stats.units_with_entities += 1;
        }

        for record in records {
            self.total_entities += 1;
            if record.surrogate != record.original {
                self.replaced += 1;
            }
            *self.entities_by_type.entry(record.entity_type).or_insert(0) += 1;
            *self.entities_by_tier.entry(record.tier).or_insert(0) += 1;
        }

        for record in records.iter().take(SAMPLES_PER_UNIT) {
            if self.samples.len() >= MAX_SAMPLES {
                break;
            }
            self.samples.push(ReplacementSample {
                original: truncate(&record.original),
                replacement: record.surrogate.clone(),
                entity_type: record.entity_type,
                tier: record.tier,
                confidence: record.confidence,
            });
        }

        self.warnings.extend(
            issues
                .iter()
                .filter(|i| !matches!(i, AnonymizationIssue::InvalidSpan { .. }))
                .map(ToString::to_string),
        );
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Share of entities that were replaced
    pub fn replacement_rate(&self) -> f64 {
        if self.total_entities == 0 {
            return 0.0;
        }
        self.replaced as f64 / self.total_entities as f64
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                     ANONYMIZATION REPORT                      \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("  Units Processed:        {}\n", self.total_units));
        output.push_str(&format!(
            "  Units with Entities:    {}\n",
            self.stats.units_with_entities
        ));
        output.push_str(&format!("  Entities:               {}\n", self.total_entities));
        output.push_str(&format!(
            "  Replaced:               {} ({:.1}%)\n",
            self.replaced,
            self.replacement_rate() * 100.0
        ));
        output.push_str(&format!(
            "  Avg Processing Time:    {} ms\n",
            self.stats.avg_processing_time_ms
        ));
        output.push('\n');

        if !self.entities_by_type.is_empty() {
            output.push_str("🔍 ENTITIES BY TYPE\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");

            let mut types: Vec<_> = self.entities_by_type.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1));

            for (entity_type, count) in types {
                output.push_str(&format!("  {:30} {:>5}\n", entity_type.label(), count));
            }
            output.push('\n');
        }

        if !self.entities_by_tier.is_empty() {
            output.push_str("🎯 ALLOCATION TIERS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (tier, count) in &self.entities_by_tier {
                output.push_str(&format!("  {:30} {:>5}\n", tier.as_str(), count));
            }
            output.push('\n');
        }

        if !self.samples.is_empty() {
            output.push_str("📝 SAMPLE REPLACEMENTS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");

            for (i, sample) in self.samples.iter().take(10).enumerate() {
                output.push_str(&format!("\n  Sample #{}\n", i + 1));
                output.push_str(&format!("    Type:        {}\n", sample.entity_type.label()));
                output.push_str(&format!("    Tier:        {}\n", sample.tier.as_str()));
                output.push_str(&format!(
                    "    Confidence:  {:.2}%\n",
                    sample.confidence * 100.0
                ));
                output.push_str(&format!("    Original:    \"{}\"\n", sample.original));
                output.push_str(&format!("    Replacement: \"{}\"\n", sample.replacement));
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON report to a file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

fn truncate(value: &str) -> String {
    if value.chars().count() > MAX_SAMPLE_CHARS {
        let head: String = value.chars().take(MAX_SAMPLE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(original: &str, surrogate: &str, tier: AllocationTier) -> ReplacementRecord {
        ReplacementRecord {
            original: original.to_string(),
            surrogate: surrogate.to_string(),
            entity_type: EntityType::PersonName,
            confidence: 0.9,
            tier,
            start: 0,
            end: original.chars().count(),
        }
    }

    #[test]
    fn test_empty_report() {
        let report = AnonymizationReport::new();
        assert_eq!(report.total_units, 0);
        assert_eq!(report.replacement_rate(), 0.0);
        assert!(report.samples.is_empty());
    }

    #[test]
    fn test_add_unit_counts() {
        let mut report = AnonymizationReport::new();
        report.add_unit(
            &[
                record("Ahmet", "Kemal", AllocationTier::ExactLength),
                record("Mehmet", "Mehmet", AllocationTier::Unchanged),
            ],
            &[AnonymizationIssue::AllocationExhausted {
                entity_type: EntityType::PersonName,
                length: 6,
            }],
            20,
        );
        report.add_unit(&[], &[], 10);

        assert_eq!(report.total_units, 2);
        assert_eq!(report.total_entities, 2);
        assert_eq!(report.replaced, 1);
        assert_eq!(report.entities_by_tier[&AllocationTier::Unchanged], 1);
        assert_eq!(report.stats.units_without_entities, 1);
        assert_eq!(report.stats.avg_processing_time_ms, 15);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.samples.len(), 2);
    }

    #[test]
    fn test_samples_truncated() {
        let long = "A".repeat(80);
        let mut report = AnonymizationReport::new();
        report.add_unit(&[record(&long, "B", AllocationTier::NearestLength)], &[], 1);
        assert_eq!(report.samples[0].original.chars().count(), MAX_SAMPLE_CHARS);
        assert!(report.samples[0].original.ends_with("..."));
    }

    #[test]
    fn test_format_console() {
        let mut report = AnonymizationReport::new();
        report.add_unit(&[record("Ahmet", "Kemal", AllocationTier::ExactLength)], &[], 5);
        report.add_warning("pool sirket: length 7 has only 1 sample(s)");

        let output = report.format_console();
        assert!(output.contains("ANONYMIZATION REPORT"));
        assert!(output.contains("Units Processed:        1"));
        assert!(output.contains("exact_length"));
        assert!(output.contains("length 7 has only 1"));
    }

    #[test]
    fn test_format_json() {
        let mut report = AnonymizationReport::new();
        report.add_unit(&[record("Ahmet", "Kemal", AllocationTier::Consistent)], &[], 5);
        let json: serde_json::Value = serde_json::from_str(&report.format_json().unwrap()).unwrap();
        assert_eq!(json["entities_by_type"]["ad_soyad"], 1);
        assert_eq!(json["entities_by_tier"]["consistent"], 1);
    }
}
