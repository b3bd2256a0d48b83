//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "veil.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Veil configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Optionally point processing.pool_path at your own pool file");
                println!("  3. Check the pools: veil pools");
                println!("  4. Validate configuration: veil validate-config");
                println!("  5. Anonymize: veil text letter.txt");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Veil Configuration File

[application]
log_level = "info"

[processing]
confidence_threshold = 0.7
mode = "replace"
consistency_scope = "per_document"

[processing.audit]
enabled = false
log_path = "./audit/veil.jsonl"

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Veil Configuration File
#
# Every setting has a default; remove what you do not need to change.
# ${VAR} references are substituted from the environment, and
# VEIL_<SECTION>_<KEY> variables override values from this file.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Processing
# ============================================================================
[processing]
# Classifier spans scoring below this are ignored (0.0 - 1.0)
confidence_threshold = 0.7

# replace: substitute pool surrogates
# censor:  mask text with '*' (documents are blanked only)
mode = "replace"

# per_document: identical values map to the same surrogate within one document
# per_batch:    ... across every input of one invocation
# sticky:       surrogates are freed per document; repeated values prefer
#               the surrogate they had in an earlier input
consistency_scope = "per_document"

# Fixed seed for reproducible surrogates (omit for random)
# seed = 42

# Surrogate pool file; the embedded pools are used when omitted
# pool_path = "${VEIL_POOL_FILE}"

[processing.audit]
# JSON-lines audit records; originals are stored as SHA-256 hashes only
enabled = false
log_path = "./audit/veil.jsonl"

# ============================================================================
# Geometry Recovery
# ============================================================================
[geometry]
# Maximum hits considered per page search
max_search_hits = 64

# Distance within which an extracted span matches a text block origin
span_match_tolerance = 10.0

# Longest query for which a de-spaced search variant is tried
despace_max_chars = 64

# ============================================================================
# Background Sampling
# ============================================================================
[background]
# Gap between the text box and the sampled ring, and the ring width
margin = 1.5
ring = 4.0

# Pixels at or below this luminance (0-255) are treated as ink
min_luminance = 60.0

# Bright pixels required before the sampled colour is trusted
min_samples = 50

# Used when sampling is inconclusive
fallback_color = [0.96, 0.96, 0.96]

# ============================================================================
# Page Mutation
# ============================================================================
[mutation]
# Inserted text never gets smaller than this
min_font_size = 6.0

# Text may overflow its box by this factor before it is shrunk
width_tolerance = 1.1
shrink_factor = 0.9

# Scale applied when the replacement cannot be measured
fallback_scale = 0.8

# Distance from the box bottom to the text baseline
baseline_offset = 2.0

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging
local_enabled = true

# Local log directory
local_path = "./logs"

# Log rotation (daily, hourly or never)
local_rotation = "daily"
"#
        .to_string()
    }
}
