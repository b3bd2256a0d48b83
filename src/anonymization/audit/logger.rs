//! Audit logger for anonymization runs

use crate::anonymization::config::{AuditConfig, ProcessingMode};
use crate::anonymization::models::{AllocationTier, EntityType};
use crate::anonymization::text::ReplacementRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// One JSON line per run
#[derive(Debug, Serialize)]
struct AuditLogEntry<'a> {
    run_id: Uuid,
    timestamp: String,
    source: &'a str,
    mode: &'static str,
    replacements_count: usize,
    replacements: Vec<AuditReplacement>,
}

/// Audit replacement entry (with hashed original)
#[derive(Debug, Serialize)]
struct AuditReplacement {
    entity_type: EntityType,
    tier: AllocationTier,
    confidence: f32,
    /// SHA-256 of the original value; plaintext is never written
    original_hash: String,
}

/// Appends run records to a JSON-lines file
pub struct AuditLogger {
    log_path: PathBuf,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self { log_path, enabled })
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        Self::new(config.log_path.clone(), config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the replacements of one run
    pub fn log_run(
        &self,
        run_id: Uuid,
        source: &str,
        mode: ProcessingMode,
        records: &[ReplacementRecord],
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            run_id,
            timestamp: Utc::now().to_rfc3339(),
            source,
            mode: mode.as_str(),
            replacements_count: records.len(),
            replacements: records
                .iter()
                .map(|r| AuditReplacement {
                    entity_type: r.entity_type,
                    tier: r.tier,
                    confidence: r.confidence,
                    original_hash: hash_value(&r.original),
                })
                .collect(),
        };

        let json_line = serde_json::to_string(&entry).context("Failed to serialize audit entry")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;
        writeln!(file, "{json_line}").context("Failed to write audit entry")?;

        Ok(())
    }
}

/// Hash a sensitive value using SHA-256
pub fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(original: &str) -> ReplacementRecord {
        ReplacementRecord {
            original: original.to_string(),
            surrogate: "Kemal Demir".to_string(),
            entity_type: EntityType::PersonName,
            confidence: 0.93,
            tier: AllocationTier::NearestLength,
            start: 0,
            end: original.chars().count(),
        }
    }

    #[test]
    fn test_hash_value() {
        assert_eq!(hash_value("Ahmet"), hash_value("Ahmet"));
        assert_ne!(hash_value("Ahmet"), hash_value("ahmet"));
        assert_eq!(hash_value("").len(), 64);
    }

    #[test]
    fn test_log_run_writes_hashed_json_line() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.jsonl");
        let logger = AuditLogger::new(log_path.clone(), true).unwrap();

        let run_id = Uuid::new_v4();
        logger
            .log_run(run_id, "letter.txt", ProcessingMode::Replace, &[record("Ahmet Yilmaz")])
            .unwrap();
        logger
            .log_run(Uuid::new_v4(), "second.txt", ProcessingMode::Censor, &[])
            .unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("Ahmet Yilmaz"));
        assert!(!content.contains("Kemal Demir"));

        let first: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first["run_id"], run_id.to_string());
        assert_eq!(first["mode"], "replace");
        assert_eq!(first["replacements"][0]["entity_type"], "ad_soyad");
        assert_eq!(first["replacements"][0]["tier"], "nearest_length");
        assert_eq!(first["replacements"][0]["original_hash"], hash_value("Ahmet Yilmaz"));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(log_path.clone(), false).unwrap();
        logger
            .log_run(Uuid::new_v4(), "x", ProcessingMode::Replace, &[record("Ahmet")])
            .unwrap();
        assert!(!log_path.exists());
    }
}
