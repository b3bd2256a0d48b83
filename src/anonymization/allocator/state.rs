//! Per-run allocation state
//!
//! Owned by exactly one [`SurrogateAllocator`](super::SurrogateAllocator).
//! All keys are lowercased so uniqueness and consistency are case-insensitive.

use crate::anonymization::models::EntityType;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    entity_type: EntityType,
    original: String,
    length: usize,
}

/// Mutable bookkeeping for one processing run
#[derive(Debug, Clone, Default)]
pub struct AllocationState {
    used_global: HashSet<String>,
    used_by_type: HashMap<EntityType, HashSet<String>>,
    memo: HashMap<MemoKey, String>,
    consistency: HashMap<String, String>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a surrogate has already been handed out in this run
    pub fn is_used(&self, candidate: &str) -> bool {
        self.used_global.contains(&candidate.to_lowercase())
    }

    /// Register a surrogate as taken, globally and for its type
    pub fn mark_used(&mut self, entity_type: EntityType, surrogate: &str) {
        let key = surrogate.to_lowercase();
        self.used_by_type
            .entry(entity_type)
            .or_default()
            .insert(key.clone());
        self.used_global.insert(key);
    }

    /// Block a string from being handed out without counting it as pool usage
    pub fn reserve(&mut self, surrogate: &str) {
        self.used_global.insert(surrogate.to_lowercase());
    }

    /// Surrogate previously chosen for this original, regardless of type
    pub fn consistent_surrogate(&self, original: &str) -> Option<&str> {
        self.consistency
            .get(&original.to_lowercase())
            .map(String::as_str)
    }

    /// Record the mapping used for every later occurrence of `original`
    pub fn record_consistent(&mut self, original: &str, surrogate: &str) {
        self.consistency
            .insert(original.to_lowercase(), surrogate.to_string());
    }

    pub fn memo(&self, entity_type: EntityType, original: &str, length: usize) -> Option<&str> {
        self.memo
            .get(&MemoKey {
                entity_type,
                original: original.to_lowercase(),
                length,
            })
            .map(String::as_str)
    }

    pub fn remember(
        &mut self,
        entity_type: EntityType,
        original: &str,
        length: usize,
        surrogate: &str,
    ) {
        self.memo.insert(
            MemoKey {
                entity_type,
                original: original.to_lowercase(),
                length,
            },
            surrogate.to_string(),
        );
    }

    /// Number of distinct surrogates used for a type
    pub fn used_count(&self, entity_type: EntityType) -> usize {
        self.used_by_type.get(&entity_type).map_or(0, HashSet::len)
    }

    /// Whether a surrogate is used by a given type
    pub fn is_used_by(&self, entity_type: EntityType, candidate: &str) -> bool {
        self.used_by_type
            .get(&entity_type)
            .is_some_and(|set| set.contains(&candidate.to_lowercase()))
    }

    /// Number of originals with a recorded surrogate
    pub fn mapping_count(&self) -> usize {
        self.consistency.len()
    }

    /// Snapshot of the consistency table, sorted by original
    pub fn mappings(&self) -> BTreeMap<String, String> {
        self.consistency
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Forget everything; the start of an independent run
    pub fn reset(&mut self) {
        self.used_global.clear();
        self.used_by_type.clear();
        self.memo.clear();
        self.consistency.clear();
    }

    /// Release used surrogates and the consistency table but keep memoised
    /// choices, so the next run prefers the same surrogate per original
    pub fn release_usage(&mut self) {
        self.used_global.clear();
        self.used_by_type.clear();
        self.consistency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_is_case_insensitive() {
        let mut state = AllocationState::new();
        state.mark_used(EntityType::PersonName, "Mehmet Kaya");
        assert!(state.is_used("MEHMET KAYA"));
        assert!(state.is_used_by(EntityType::PersonName, "mehmet kaya"));
        assert!(!state.is_used_by(EntityType::Organization, "mehmet kaya"));
        assert_eq!(state.used_count(EntityType::PersonName), 1);
    }

    #[test]
    fn test_reserve_does_not_count_as_type_usage() {
        let mut state = AllocationState::new();
        state.reserve("Ahmet");
        assert!(state.is_used("ahmet"));
        assert_eq!(state.used_count(EntityType::PersonName), 0);
    }

    #[test]
    fn test_consistency_lookup_ignores_case() {
        let mut state = AllocationState::new();
        state.record_consistent("Ahmet", "Kemal");
        assert_eq!(state.consistent_surrogate("AHMET"), Some("Kemal"));
        assert_eq!(state.mapping_count(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = AllocationState::new();
        state.mark_used(EntityType::Email, "a@b.co");
        state.remember(EntityType::Email, "x@y.co", 6, "a@b.co");
        state.record_consistent("x@y.co", "a@b.co");
        state.reset();
        assert!(!state.is_used("a@b.co"));
        assert!(state.memo(EntityType::Email, "x@y.co", 6).is_none());
        assert_eq!(state.mapping_count(), 0);
    }

    #[test]
    fn test_release_usage_keeps_memo() {
        let mut state = AllocationState::new();
        state.mark_used(EntityType::Email, "a@b.co");
        state.remember(EntityType::Email, "X@y.co", 6, "a@b.co");
        state.record_consistent("x@y.co", "a@b.co");
        state.release_usage();
        assert!(!state.is_used("a@b.co"));
        assert_eq!(state.memo(EntityType::Email, "x@Y.co", 6), Some("a@b.co"));
        assert_eq!(state.mapping_count(), 0);
    }
}
