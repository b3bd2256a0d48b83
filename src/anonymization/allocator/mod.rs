//! Surrogate allocation
//!
//! Every span gets a replacement drawn from the reference pools under three
//! constraints at once:
//!
//! - **consistency**: the same original (case-insensitive) always receives the
//!   same surrogate within a run;
//! - **uniqueness**: a surrogate is never handed to two distinct originals;
//! - **length similarity**: same-length candidates are preferred, then the
//!   nearest lengths.
//!
//! Resolution walks an ordered list of tiers and stops at the first success:
//!
//! | Tier | Source |
//! |------|--------|
//! | `Consistent` | surrogate already recorded for this original |
//! | `Memo` | memoised (type, original, length) choice that is still unused |
//! | `ExactLength` | distinct unused candidate of the same length |
//! | `NearestLength` | distinct unused candidate of the nearest length |
//! | `Generated` | checksum identifier synthesized by [`ChecksumIdentityGenerator`] |
//! | `OriginalFallback` | unused candidate that may equal the original |
//! | `Unchanged` | the original is kept and the span is flagged |
//!
//! Randomness is injected, so a seeded allocator is fully reproducible for a
//! given pool.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use veil::anonymization::allocator::{SurrogateAllocator, SurrogatePool};
//! use veil::anonymization::models::EntityType;
//!
//! let pool = Arc::new(SurrogatePool::from_samples(vec![(
//!     EntityType::PersonName,
//!     vec!["Kemal", "Deniz"],
//! )]));
//! let mut allocator = SurrogateAllocator::seeded(pool, 7);
//!
//! let first = allocator.allocate_one(EntityType::PersonName, "Ahmet");
//! let again = allocator.allocate_one(EntityType::PersonName, "AHMET");
//! assert_eq!(first.surrogate, again.surrogate);
//! assert_eq!(first.surrogate.chars().count(), 5);
//! ```

pub mod checksum;
pub mod pool;
pub mod state;
pub mod stats;
pub mod verify;

pub use checksum::ChecksumIdentityGenerator;
pub use pool::{PoolIntegrityReport, SurrogatePool, TypePool};
pub use state::AllocationState;
pub use stats::{AllocationStats, UsageReport, UsageStatus};
pub use verify::{verify_consistency, ConsistencyReport};

use crate::anonymization::config::{ConsistencyScope, ProcessingConfig};
use crate::anonymization::models::{AllocationTier, EntitySpan, EntityType};
use crate::domain::errors::AnonymizationIssue;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Attempts made to synthesize an unused identifier before giving up
pub const MAX_GENERATION_ATTEMPTS: usize = 10;

/// A chosen surrogate and the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub surrogate: String,
    pub tier: AllocationTier,
}

/// Result of allocating a batch of spans
#[derive(Debug, Clone, Default)]
pub struct AllocationSummary {
    pub stats: AllocationStats,
    pub issues: Vec<AnonymizationIssue>,
}

/// Assigns surrogates and owns the per-run [`AllocationState`]
///
/// Single-writer: every mutation goes through `&mut self`, so the
/// check-candidate-then-mark-used step is atomic by construction.
pub struct SurrogateAllocator<R = StdRng> {
    pool: Arc<SurrogatePool>,
    state: AllocationState,
    generator: ChecksumIdentityGenerator,
    rng: R,
    scope: ConsistencyScope,
}

impl SurrogateAllocator<StdRng> {
    /// Reproducible allocator
    pub fn seeded(pool: Arc<SurrogatePool>, seed: u64) -> Self {
        Self::new(pool, StdRng::seed_from_u64(seed))
    }

    /// Allocator seeded from the operating system
    pub fn from_entropy(pool: Arc<SurrogatePool>) -> Self {
        Self::new(pool, StdRng::from_entropy())
    }

    /// Seed and scope taken from the processing configuration
    pub fn from_config(pool: Arc<SurrogatePool>, config: &ProcessingConfig) -> Self {
        let allocator = match config.seed {
            Some(seed) => Self::seeded(pool, seed),
            None => Self::from_entropy(pool),
        };
        allocator.with_scope(config.consistency_scope)
    }
}

impl<R: Rng> SurrogateAllocator<R> {
    /// Create an allocator drawing randomness from `rng`
    pub fn new(pool: Arc<SurrogatePool>, rng: R) -> Self {
        Self {
            pool,
            state: AllocationState::new(),
            generator: ChecksumIdentityGenerator::new(),
            rng,
            scope: ConsistencyScope::default(),
        }
    }

    /// Set how long allocation state lives
    pub fn with_scope(mut self, scope: ConsistencyScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> ConsistencyScope {
        self.scope
    }

    pub fn state(&self) -> &AllocationState {
        &self.state
    }

    pub fn pool(&self) -> &SurrogatePool {
        &self.pool
    }

    /// Mark the start of an independent unit of work
    ///
    /// Per-document scope forgets all previous assignments; per-batch scope
    /// keeps them so identical originals stay consistent across documents.
    /// Sticky scope frees every surrogate but keeps memoised choices, which
    /// the `Memo` tier hands back while they are still unused.
    pub fn begin_run(&mut self) {
        match self.scope {
            ConsistencyScope::PerDocument => self.state.reset(),
            ConsistencyScope::Sticky => self.state.release_usage(),
            ConsistencyScope::PerBatch => {
                tracing::debug!(
                    mapped = self.state.mapping_count(),
                    "Keeping allocation state across batch"
                );
            }
        }
    }

    /// Forget all state regardless of scope
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Pool usage snapshot
    pub fn usage_report(&self) -> UsageReport {
        UsageReport::from_state(&self.pool, &self.state)
    }

    /// Attach a replacement and tier to every span
    pub fn allocate(&mut self, spans: &mut [EntitySpan]) -> AllocationSummary {
        let mut summary = AllocationSummary::default();

        for span in spans.iter_mut() {
            let allocation = self.allocate_one(span.entity_type, &span.text);
            if allocation.tier == AllocationTier::Unchanged && !span.text.trim().is_empty() {
                summary.issues.push(AnonymizationIssue::AllocationExhausted {
                    entity_type: span.entity_type,
                    length: span.char_len(),
                });
            }
            summary.stats.record(
                span.entity_type,
                allocation.tier,
                allocation.surrogate != span.text,
            );
            span.replacement = Some(allocation.surrogate);
            span.tier = Some(allocation.tier);
        }

        tracing::info!(
            total = summary.stats.total,
            successful = summary.stats.successful,
            exhausted = summary.stats.exhausted(),
            "Allocated surrogates"
        );

        summary
    }

    /// Resolve one original through the tier chain and record the result
    pub fn allocate_one(&mut self, entity_type: EntityType, original: &str) -> Allocation {
        let original = original.trim();
        if original.is_empty() {
            return Allocation {
                surrogate: String::new(),
                tier: AllocationTier::Unchanged,
            };
        }

        if let Some(surrogate) = self.state.consistent_surrogate(original) {
            return Allocation {
                surrogate: surrogate.to_string(),
                tier: AllocationTier::Consistent,
            };
        }

        let length = original.chars().count();
        let allocation = self
            .resolve(entity_type, original, length)
            .unwrap_or_else(|| Allocation {
                surrogate: original.to_string(),
                tier: AllocationTier::Unchanged,
            });

        match allocation.tier {
            AllocationTier::Unchanged => {
                tracing::warn!(
                    entity_type = %entity_type,
                    length,
                    "No surrogate available, keeping original"
                );
                self.state.reserve(original);
            }
            _ => {
                self.state.mark_used(entity_type, &allocation.surrogate);
                self.state
                    .remember(entity_type, original, length, &allocation.surrogate);
            }
        }
        self.state.record_consistent(original, &allocation.surrogate);

        tracing::debug!(
            entity_type = %entity_type,
            tier = allocation.tier.as_str(),
            original_len = length,
            surrogate_len = allocation.surrogate.chars().count(),
            "Surrogate allocated"
        );

        allocation
    }

    fn resolve(
        &mut self,
        entity_type: EntityType,
        original: &str,
        length: usize,
    ) -> Option<Allocation> {
        let found = |surrogate: String, tier: AllocationTier| Some(Allocation { surrogate, tier });

        if let Some(memo) = self.state.memo(entity_type, original, length) {
            if !self.state.is_used(memo) {
                return found(memo.to_string(), AllocationTier::Memo);
            }
        }

        let pool = Arc::clone(&self.pool);
        let type_pool = pool.get(entity_type);

        if let Some(type_pool) = type_pool {
            if let Some(s) = self.pick(type_pool.candidates(length), Some(original)) {
                return found(s, AllocationTier::ExactLength);
            }
            if !entity_type.is_checksum_identifier() {
                for nearest in type_pool.nearest_lengths(length) {
                    if let Some(s) = self.pick(type_pool.candidates(nearest), Some(original)) {
                        return found(s, AllocationTier::NearestLength);
                    }
                }
            }
        }

        if entity_type.is_checksum_identifier() {
            if let Some(s) = self.generate_identifier(original) {
                return found(s, AllocationTier::Generated);
            }
        }

        if let Some(type_pool) = type_pool {
            let lengths = std::iter::once(length).chain(type_pool.nearest_lengths(length));
            for l in lengths {
                if let Some(s) = self.pick(type_pool.candidates(l), None) {
                    return found(s, AllocationTier::OriginalFallback);
                }
            }
        }

        None
    }

    /// Random unused candidate, optionally excluding the original
    fn pick(&mut self, candidates: &[String], exclude: Option<&str>) -> Option<String> {
        let excluded = exclude.map(str::to_lowercase);
        let usable: Vec<&String> = candidates
            .iter()
            .filter(|c| !self.state.is_used(c))
            .filter(|c| excluded.as_deref() != Some(c.to_lowercase().as_str()))
            .collect();
        usable.choose(&mut self.rng).map(|s| s.to_string())
    }

    fn generate_identifier(&mut self, original: &str) -> Option<String> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = self.generator.generate(&mut self.rng);
            if self.generator.validate(&candidate)
                && candidate != original
                && !self.state.is_used(&candidate)
            {
                return Some(candidate);
            }
            tracing::debug!(attempt, "Generated identifier rejected, retrying");
        }
        None
    }
}
