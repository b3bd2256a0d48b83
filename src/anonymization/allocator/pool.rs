//! Surrogate reference pools
//!
//! Pools are read from TOML, one table per entity type:
//!
//! ```toml
//! [pools.ad_soyad]
//! samples = ["Ali", "Can", "Ahmet Yilmaz"]
//! ```
//!
//! Samples are bucketed by character length. Within a bucket, order follows the
//! file and case-insensitive duplicates are dropped, so allocation stays
//! reproducible for a fixed seed.

use super::checksum::ChecksumIdentityGenerator;
use crate::anonymization::models::EntityType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Lengths with fewer samples than this are reported as sparse
pub const MIN_SAMPLES_PER_LENGTH: usize = 3;

#[derive(Debug, Deserialize)]
struct PoolFile {
    #[serde(default)]
    pools: BTreeMap<String, PoolSection>,
}

#[derive(Debug, Deserialize)]
struct PoolSection {
    #[serde(default)]
    samples: Vec<String>,
}

/// Candidates for one entity type, keyed by character length
#[derive(Debug, Clone, Default)]
pub struct TypePool {
    by_length: BTreeMap<usize, Vec<String>>,
}

impl TypePool {
    /// Candidates of exactly `length` characters
    pub fn candidates(&self, length: usize) -> &[String] {
        self.by_length
            .get(&length)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Lengths present in the pool, ascending
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_length.keys().copied()
    }

    /// Lengths other than `target`, nearest first; ties go to the longer length
    pub fn nearest_lengths(&self, target: usize) -> Vec<usize> {
        let mut lengths: Vec<usize> = self.lengths().filter(|&l| l != target).collect();
        lengths.sort_by_key(|&l| (l.abs_diff(target), std::cmp::Reverse(l)));
        lengths
    }

    /// Total number of candidates
    pub fn total(&self) -> usize {
        self.by_length.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_length.is_empty()
    }

    /// Iterate over (length, candidates)
    pub fn buckets(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.by_length.iter().map(|(l, v)| (*l, v.as_slice()))
    }
}

/// Integrity findings for one type's pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeIntegrity {
    pub total_samples: usize,
    pub lengths: usize,
    /// (length, sample count) for lengths below [`MIN_SAMPLES_PER_LENGTH`]
    pub sparse_lengths: Vec<(usize, usize)>,
    pub duplicates_removed: usize,
    pub blank_removed: usize,
    /// Identifier samples failing their checksum, dropped at load
    pub invalid_identifiers: usize,
}

/// Integrity findings for every configured pool
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolIntegrityReport {
    pub types: BTreeMap<EntityType, TypeIntegrity>,
    /// Table names that are not entity tags
    pub unknown_tables: Vec<String>,
}

impl PoolIntegrityReport {
    /// Human-readable findings
    pub fn issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .unknown_tables
            .iter()
            .map(|name| format!("Unknown pool table '{name}' ignored"))
            .collect();

        for (entity_type, integrity) in &self.types {
            if integrity.total_samples == 0 {
                issues.push(format!("{entity_type}: pool is empty"));
                continue;
            }
            for (length, count) in &integrity.sparse_lengths {
                issues.push(format!(
                    "{entity_type}: length {length} has only {count} sample(s)"
                ));
            }
            if integrity.duplicates_removed > 0 {
                issues.push(format!(
                    "{entity_type}: {} duplicate sample(s) removed",
                    integrity.duplicates_removed
                ));
            }
            if integrity.invalid_identifiers > 0 {
                issues.push(format!(
                    "{entity_type}: {} sample(s) failed checksum validation",
                    integrity.invalid_identifiers
                ));
            }
        }
        issues
    }

    pub fn is_healthy(&self) -> bool {
        self.issues().is_empty()
    }
}

/// Immutable reference data for every entity type
#[derive(Debug, Clone, Default)]
pub struct SurrogatePool {
    pools: HashMap<EntityType, TypePool>,
    integrity: PoolIntegrityReport,
}

impl SurrogatePool {
    /// Load a pool file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read surrogate pool: {}", path.as_ref().display())
        })?;

        Self::from_toml(&content)
    }

    /// Parse pool TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: PoolFile =
            toml::from_str(content).context("Failed to parse surrogate pool TOML")?;

        let mut unknown_tables = Vec::new();
        let mut sections = Vec::new();
        for (name, section) in file.pools {
            match EntityType::from_tag(&name) {
                Some(entity_type) => sections.push((entity_type, section.samples)),
                None => {
                    tracing::warn!(table = %name, "Ignoring unknown surrogate pool table");
                    unknown_tables.push(name);
                }
            }
        }

        let mut pool = Self::from_samples(sections);
        pool.integrity.unknown_tables = unknown_tables;
        Ok(pool)
    }

    /// Built-in pools shipped with the crate
    pub fn embedded() -> Result<Self> {
        let default_toml = include_str!("../../../pools/default_pools.toml");
        Self::from_toml(default_toml)
    }

    /// Load `path` when given, the embedded pools otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    /// Build a pool from in-memory samples
    pub fn from_samples<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = (EntityType, Vec<S>)>,
        S: AsRef<str>,
    {
        let generator = ChecksumIdentityGenerator::new();
        let mut pools: HashMap<EntityType, TypePool> = HashMap::new();
        let mut integrity = PoolIntegrityReport::default();

        for (entity_type, samples) in sections {
            let type_pool = pools.entry(entity_type).or_default();
            let report = integrity.types.entry(entity_type).or_default();
            let mut seen: HashSet<String> = type_pool
                .by_length
                .values()
                .flatten()
                .map(|s| s.to_lowercase())
                .collect();

            for sample in samples {
                let sample = sample.as_ref().trim();
                if sample.is_empty() {
                    report.blank_removed += 1;
                    continue;
                }
                if entity_type.is_checksum_identifier() && !generator.validate(sample) {
                    report.invalid_identifiers += 1;
                    continue;
                }
                if !seen.insert(sample.to_lowercase()) {
                    report.duplicates_removed += 1;
                    continue;
                }
                type_pool
                    .by_length
                    .entry(sample.chars().count())
                    .or_default()
                    .push(sample.to_string());
            }
        }

        for (entity_type, type_pool) in &pools {
            if let Some(report) = integrity.types.get_mut(entity_type) {
                report.total_samples = type_pool.total();
                report.lengths = type_pool.by_length.len();
                report.sparse_lengths = type_pool
                    .buckets()
                    .filter(|(_, c)| c.len() < MIN_SAMPLES_PER_LENGTH)
                    .map(|(l, c)| (l, c.len()))
                    .collect();
            }
        }

        Self { pools, integrity }
    }

    /// Pool for a type, if one was configured
    pub fn get(&self, entity_type: EntityType) -> Option<&TypePool> {
        self.pools.get(&entity_type)
    }

    /// Types with a configured pool
    pub fn types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.pools.keys().copied()
    }

    pub fn integrity(&self) -> &PoolIntegrityReport {
        &self.integrity
    }
}
