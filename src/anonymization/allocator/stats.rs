//! Allocation statistics and pool usage reporting

use super::pool::SurrogatePool;
use super::state::AllocationState;
use crate::anonymization::models::{AllocationTier, EntityType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome counters for one entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeOutcome {
    pub total: usize,
    /// Replacements that differ from the original
    pub successful: usize,
    /// Spans left unchanged because no candidate was available
    pub exhausted: usize,
}

/// Counters accumulated by the allocator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationStats {
    pub total: usize,
    pub successful: usize,
    pub by_tier: BTreeMap<AllocationTier, usize>,
    pub by_type: BTreeMap<EntityType, TypeOutcome>,
}

impl AllocationStats {
    pub fn record(&mut self, entity_type: EntityType, tier: AllocationTier, changed: bool) {
        self.total += 1;
        *self.by_tier.entry(tier).or_insert(0) += 1;
        let outcome = self.by_type.entry(entity_type).or_default();
        outcome.total += 1;
        if changed {
            self.successful += 1;
            outcome.successful += 1;
        }
        if tier == AllocationTier::Unchanged {
            outcome.exhausted += 1;
        }
    }

    pub fn tier_count(&self, tier: AllocationTier) -> usize {
        self.by_tier.get(&tier).copied().unwrap_or(0)
    }

    pub fn exhausted(&self) -> usize {
        self.tier_count(AllocationTier::Unchanged)
    }

    /// Fraction of spans that received a different string
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64
    }

    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: &AllocationStats) {
        self.total += other.total;
        self.successful += other.successful;
        for (tier, count) in &other.by_tier {
            *self.by_tier.entry(*tier).or_insert(0) += count;
        }
        for (entity_type, outcome) in &other.by_type {
            let mine = self.by_type.entry(*entity_type).or_default();
            mine.total += outcome.total;
            mine.successful += outcome.successful;
            mine.exhausted += outcome.exhausted;
        }
    }
}

/// Coarse pool pressure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageStatus {
    /// More than 80% of candidates used
    HighUsage,
    /// More than 50% used
    MediumUsage,
    LowUsage,
}

impl UsageStatus {
    fn from_ratio(ratio: f64) -> Self {
        if ratio > 0.8 {
            Self::HighUsage
        } else if ratio > 0.5 {
            Self::MediumUsage
        } else {
            Self::LowUsage
        }
    }
}

/// Availability of one length bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LengthUsage {
    pub available: usize,
    pub used: usize,
}

/// Pool usage for one type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeUsage {
    pub available: usize,
    pub used: usize,
    pub usage_percentage: f64,
    pub availability_percentage: f64,
    pub by_length: BTreeMap<usize, LengthUsage>,
    pub status: UsageStatus,
}

/// Usage snapshot across all pools
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageReport {
    pub types: BTreeMap<EntityType, TypeUsage>,
    /// Distinct originals mapped in this run
    pub mapped_originals: usize,
}

impl UsageReport {
    /// Build a report from the pool and the current state
    pub fn from_state(pool: &SurrogatePool, state: &AllocationState) -> Self {
        let mut types = BTreeMap::new();
        for entity_type in pool.types() {
            let Some(type_pool) = pool.get(entity_type) else {
                continue;
            };
            let by_length: BTreeMap<usize, LengthUsage> = type_pool
                .buckets()
                .map(|(length, candidates)| {
                    let used = candidates
                        .iter()
                        .filter(|c| state.is_used_by(entity_type, c))
                        .count();
                    (
                        length,
                        LengthUsage {
                            available: candidates.len(),
                            used,
                        },
                    )
                })
                .collect();

            let available = type_pool.total();
            let used: usize = by_length.values().map(|l| l.used).sum();
            let ratio = if available == 0 {
                0.0
            } else {
                used as f64 / available as f64
            };

            types.insert(
                entity_type,
                TypeUsage {
                    available,
                    used,
                    usage_percentage: ratio * 100.0,
                    availability_percentage: (1.0 - ratio) * 100.0,
                    by_length,
                    status: UsageStatus::from_ratio(ratio),
                },
            );
        }

        Self {
            types,
            mapped_originals: state.mapping_count(),
        }
    }
}
