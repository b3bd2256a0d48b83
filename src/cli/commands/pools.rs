//! Pools command implementation
//!
//! This module implements the `pools` command, which loads the configured
//! surrogate pools and reports their integrity and size per entity type.

use crate::anonymization::allocator::{AllocationState, SurrogatePool, UsageReport};
use crate::config::load_config_or_default;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the pools command
#[derive(Args, Debug)]
pub struct PoolsArgs {
    /// Pool file to inspect (defaults to the configured or embedded pools)
    #[arg(long)]
    pub pool: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl PoolsArgs {
    /// Execute the pools command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let pool_path = match &self.pool {
            Some(path) => Some(path.clone()),
            None => match load_config_or_default(config_path) {
                Ok(config) => config.processing.pool_path,
                Err(e) => {
                    eprintln!("Failed to load configuration: {e}");
                    return Ok(2);
                }
            },
        };

        tracing::info!(pool = ?pool_path, "Inspecting surrogate pools");
        let pool = match SurrogatePool::load(pool_path.as_deref()) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load pools");
                eprintln!("❌ Failed to load pools: {e:#}");
                return Ok(2);
            }
        };

        let integrity = pool.integrity();
        let usage = UsageReport::from_state(&pool, &AllocationState::new());

        if self.json {
            let value = serde_json::json!({
                "integrity": integrity,
                "usage": usage,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{}", format_pools(&pool, &usage));
            let issues = integrity.issues();
            if issues.is_empty() {
                println!("✅ Pools are healthy");
            } else {
                println!("⚠️  Integrity findings:");
                for issue in &issues {
                    println!("  • {issue}");
                }
            }
        }

        Ok(if integrity.is_healthy() { 0 } else { 1 })
    }
}

fn format_pools(pool: &SurrogatePool, usage: &UsageReport) -> String {
    let mut out = String::new();
    out.push_str("📚 Surrogate pools\n\n");
    out.push_str(&format!(
        "  {:<12} {:>8} {:>8}  {}\n",
        "type", "samples", "lengths", "range"
    ));

    let mut types: Vec<_> = pool.types().collect();
    types.sort();
    for entity_type in types {
        let Some(type_pool) = pool.get(entity_type) else {
            continue;
        };
        let lengths: Vec<usize> = type_pool.lengths().collect();
        let range = match (lengths.first(), lengths.last()) {
            (Some(min), Some(max)) => format!("{min}-{max} chars"),
            _ => "empty".to_string(),
        };
        let available = usage
            .types
            .get(&entity_type)
            .map_or(0, |t| t.available);
        out.push_str(&format!(
            "  {:<12} {:>8} {:>8}  {}\n",
            entity_type.tag(),
            available,
            lengths.len(),
            range
        ));
    }
    out
}
