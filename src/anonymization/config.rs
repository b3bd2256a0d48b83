//! Processing configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happens to a located span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Replace with a pool surrogate
    #[default]
    Replace,
    /// Mask with `*` (text) or blank the area (documents)
    Censor,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Censor => "censor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "censor" => Some(Self::Censor),
            _ => None,
        }
    }
}

/// How long allocation state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyScope {
    /// Fresh state for every document or text
    #[default]
    PerDocument,
    /// One state shared across a whole batch
    PerBatch,
    /// Surrogates are released between documents, but each original prefers
    /// the surrogate it received earlier in the batch
    Sticky,
}

impl ConsistencyScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "per_document" => Some(Self::PerDocument),
            "per_batch" => Some(Self::PerBatch),
            "sticky" => Some(Self::Sticky),
            _ => None,
        }
    }
}

/// Settings for span resolution and surrogate allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Minimum classifier score for a span to be kept
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    #[serde(default)]
    pub mode: ProcessingMode,

    #[serde(default)]
    pub consistency_scope: ConsistencyScope,

    /// Fixed seed for reproducible allocation
    #[serde(default)]
    pub seed: Option<u64>,

    /// Pool file; the embedded pools are used when absent
    #[serde(default)]
    pub pool_path: Option<PathBuf>,

    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_confidence_threshold() -> f32 {
    0.7
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            mode: ProcessingMode::default(),
            consistency_scope: ConsistencyScope::default(),
            seed: None,
            pool_path: None,
            audit: AuditConfig::default(),
        }
    }
}

impl ProcessingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            );
        }

        if let Some(ref path) = self.pool_path {
            if !path.exists() {
                anyhow::bail!("Surrogate pool file not found: {}", path.display());
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                anyhow::bail!("Surrogate pool must be a TOML file: {}", path.display());
            }
        }

        self.audit.validate().context("Invalid audit configuration")?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("VEIL_PROCESSING_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = val
                .parse()
                .context("Invalid VEIL_PROCESSING_CONFIDENCE_THRESHOLD value")?;
        }

        if let Ok(val) = std::env::var("VEIL_PROCESSING_MODE") {
            self.mode = ProcessingMode::parse(&val)
                .with_context(|| format!("Invalid VEIL_PROCESSING_MODE: {val}"))?;
        }

        if let Ok(val) = std::env::var("VEIL_PROCESSING_CONSISTENCY_SCOPE") {
            self.consistency_scope = ConsistencyScope::parse(&val)
                .with_context(|| format!("Invalid VEIL_PROCESSING_CONSISTENCY_SCOPE: {val}"))?;
        }

        if let Ok(val) = std::env::var("VEIL_PROCESSING_SEED") {
            self.seed = Some(val.parse().context("Invalid VEIL_PROCESSING_SEED value")?);
        }

        if let Ok(val) = std::env::var("VEIL_PROCESSING_POOL_PATH") {
            self.pool_path = Some(PathBuf::from(val));
        }

        self.audit.apply_env_overrides()?;

        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/veil.jsonl")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration, creating the log directory when enabled
    pub fn validate(&self) -> Result<()> {
        if self.enabled {
            if let Some(parent) = self.log_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create audit log directory: {}", parent.display())
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("VEIL_PROCESSING_AUDIT_ENABLED") {
            self.enabled = val
                .parse()
                .context("Invalid VEIL_PROCESSING_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("VEIL_PROCESSING_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessingConfig::default();
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.mode, ProcessingMode::Replace);
        assert_eq!(config.consistency_scope, ConsistencyScope::PerDocument);
        assert!(config.seed.is_none());
        assert!(!config.audit.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = ProcessingConfig {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_pool_file_rejected() {
        let config = ProcessingConfig {
            pool_path: Some(PathBuf::from("/nonexistent/pools.toml")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_snake_case() {
        let config: ProcessingConfig = toml::from_str(
            r#"
mode = "censor"
consistency_scope = "per_batch"
seed = 42
"#,
        )
        .unwrap();
        assert_eq!(config.mode, ProcessingMode::Censor);
        assert_eq!(config.consistency_scope, ConsistencyScope::PerBatch);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.confidence_threshold, 0.7);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(ProcessingMode::parse("CENSOR"), Some(ProcessingMode::Censor));
        assert_eq!(ProcessingMode::parse("blur"), None);
        assert_eq!(
            ConsistencyScope::parse("per_batch"),
            Some(ConsistencyScope::PerBatch)
        );
        assert_eq!(
            ConsistencyScope::parse("Sticky"),
            Some(ConsistencyScope::Sticky)
        );
    }
}
