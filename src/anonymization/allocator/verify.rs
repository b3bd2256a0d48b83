//! Post-hoc consistency verification
//!
//! Re-scans a finished assignment list. A violation means the allocator
//! handed one original two different surrogates, which is a bug.

use crate::anonymization::audit::hash_value;
use crate::anonymization::models::{EntitySpan, EntityType};
use crate::domain::errors::AnonymizationIssue;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Result of a verification pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub is_consistent: bool,
    pub unique_originals: usize,
    /// Originals per type
    pub originals_by_type: BTreeMap<EntityType, usize>,
    pub violations: Vec<AnonymizationIssue>,
}

impl ConsistencyReport {
    /// Share of originals with exactly one surrogate
    pub fn consistency_rate(&self) -> f64 {
        if self.unique_originals == 0 {
            return 1.0;
        }
        1.0 - self.violations.len() as f64 / self.unique_originals as f64
    }
}

/// Check that every original (case-insensitive) maps to a single surrogate
pub fn verify_consistency(spans: &[EntitySpan]) -> ConsistencyReport {
    let mut seen: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut originals_by_type: BTreeMap<EntityType, BTreeSet<String>> = BTreeMap::new();

    for span in spans {
        let Some(replacement) = span.replacement.as_ref() else {
            continue;
        };
        let key = span.text.to_lowercase();
        seen.entry(key.clone())
            .or_default()
            .insert(replacement.clone());
        originals_by_type
            .entry(span.entity_type)
            .or_default()
            .insert(key);
    }

    let violations: Vec<AnonymizationIssue> = seen
        .iter()
        .filter(|(_, surrogates)| surrogates.len() > 1)
        .map(|(original, surrogates)| AnonymizationIssue::ConsistencyViolation {
            original: original.clone(),
            surrogates: surrogates.iter().cloned().collect(),
        })
        .collect();

    for violation in &violations {
        if let AnonymizationIssue::ConsistencyViolation { original, surrogates } = violation {
            tracing::error!(
                original_hash = %hash_value(original),
                surrogates = surrogates.len(),
                "Surrogate consistency violated"
            );
        }
    }

    ConsistencyReport {
        is_consistent: violations.is_empty(),
        unique_originals: seen.len(),
        originals_by_type: originals_by_type
            .into_iter()
            .map(|(t, originals)| (t, originals.len()))
            .collect(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned(text: &str, replacement: &str) -> EntitySpan {
        let mut span = EntitySpan::new(EntityType::PersonName, text, 0, text.len(), 0.9);
        span.replacement = Some(replacement.to_string());
        span
    }

    #[test]
    fn test_consistent_assignments() {
        let spans = vec![
            assigned("Ahmet", "Kemal"),
            assigned("AHMET", "Kemal"),
            assigned("Ayse", "Ece"),
        ];
        let report = verify_consistency(&spans);
        assert!(report.is_consistent);
        assert_eq!(report.unique_originals, 2);
        assert_eq!(report.originals_by_type[&EntityType::PersonName], 2);
        assert_eq!(report.consistency_rate(), 1.0);
    }

    #[test]
    fn test_detects_violation() {
        let spans = vec![assigned("Ahmet", "Kemal"), assigned("ahmet", "Mert")];
        let report = verify_consistency(&spans);
        assert!(!report.is_consistent);
        assert_eq!(
            report.violations,
            vec![AnonymizationIssue::ConsistencyViolation {
                original: "ahmet".to_string(),
                surrogates: vec!["Kemal".to_string(), "Mert".to_string()],
            }]
        );
        assert_eq!(report.consistency_rate(), 0.0);
    }

    #[test]
    fn test_unassigned_spans_are_ignored() {
        let span = EntitySpan::new(EntityType::Email, "a@b.co", 0, 6, 0.9);
        let report = verify_consistency(&[span]);
        assert!(report.is_consistent);
        assert_eq!(report.unique_originals, 0);
    }
}
