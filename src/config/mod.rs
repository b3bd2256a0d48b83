//! Configuration management for Veil.
//!
//! # Overview
//!
//! Veil uses an optional TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VEIL_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use veil::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("veil.toml")?;
//!
//! println!("Threshold: {}", config.processing.confidence_threshold);
//! println!("Mode: {}", config.processing.mode.as_str());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`ProcessingConfig`] - Threshold, mode, consistency scope, seed, pools, audit
//! - [`GeometryConfig`] - Search limits for locating spans on a page
//! - [`BackgroundConfig`] - Fill colour sampling
//! - [`MutationConfig`] - Font fitting for inserted text
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [processing]
//! confidence_threshold = 0.7
//! mode = "replace"
//! consistency_scope = "per_document"
//! pool_path = "${VEIL_POOL_FILE}"
//!
//! [processing.audit]
//! enabled = true
//! log_path = "./audit/veil.jsonl"
//!
//! [geometry]
//! max_search_hits = 64
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use crate::anonymization::config::{AuditConfig, ProcessingConfig};
pub use loader::{load_config, load_config_or_default};
pub use schema::{
    ApplicationConfig, BackgroundConfig, GeometryConfig, LoggingConfig, MutationConfig,
    VeilConfig,
};
