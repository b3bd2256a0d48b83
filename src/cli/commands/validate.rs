//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Veil configuration file.

use crate::anonymization::allocator::SurrogatePool;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let pools = match SurrogatePool::load(config.processing.pool_path.as_deref()) {
            Ok(pool) => pool,
            Err(e) => {
                println!("❌ Failed to load surrogate pools");
                println!("   Error: {e:#}");
                return Ok(2);
            }
        };

        let processing = &config.processing;
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Mode: {}", processing.mode.as_str());
        println!("  Confidence Threshold: {}", processing.confidence_threshold);
        println!("  Consistency Scope: {:?}", processing.consistency_scope);
        println!(
            "  Seed: {}",
            processing
                .seed
                .map_or_else(|| "random".to_string(), |s| s.to_string())
        );
        println!(
            "  Pools: {} ({} types)",
            processing
                .pool_path
                .as_ref()
                .map_or_else(|| "embedded".to_string(), |p| p.display().to_string()),
            pools.types().count()
        );
        println!(
            "  Audit: {}",
            if processing.audit.enabled {
                processing.audit.log_path.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        println!("  Max Search Hits: {}", config.geometry.max_search_hits);
        println!("  Minimum Font Size: {}", config.mutation.min_font_size);
        println!();

        let findings = pools.integrity().issues();
        if !findings.is_empty() {
            println!(
                "⚠️  {} pool integrity finding(s); run `veil pools` for details",
                findings.len()
            );
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("veil.toml");
        fs::write(&path, "[processing]\nconfidence_threshold = 0.8\n").unwrap();

        let code = ValidateArgs {}.execute(path.to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("veil.toml");
        fs::write(&path, "[processing]\nconfidence_threshold = 1.5\n").unwrap();

        let code = ValidateArgs {}.execute(path.to_str().unwrap()).await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_missing_config() {
        let code = ValidateArgs {}.execute("/nonexistent/veil.toml").await.unwrap();
        assert_eq!(code, 2);
    }
}
