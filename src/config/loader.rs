//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::VeilConfig;
use crate::domain::errors::VeilError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into VeilConfig
/// 4. Applies environment variable overrides (VEIL_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use veil::config::loader::load_config;
///
/// let config = load_config("veil.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<VeilConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(VeilError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VeilError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Like [`load_config`], but a missing file yields the defaults
///
/// Environment overrides and validation still apply.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<VeilConfig> {
    let path = path.as_ref();
    if path.exists() {
        return load_config(path);
    }

    tracing::debug!(path = %path.display(), "No configuration file, using defaults");
    let mut config = VeilConfig::default();
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration from TOML content
pub fn parse_config(contents: &str) -> Result<VeilConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: VeilConfig = toml::from_str(&contents)
        .map_err(|e| VeilError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &VeilConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| VeilError::Configuration(format!("Configuration validation failed: {e}")))
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied unchanged.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| VeilError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(VeilError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Parse an override value, naming the variable on failure
fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| VeilError::Configuration(format!("Invalid {name} value: {value}")))
}

/// Applies environment variable overrides using VEIL_* prefix
///
/// Environment variables follow the pattern: VEIL_<SECTION>_<KEY>
/// For example: VEIL_PROCESSING_MODE, VEIL_GEOMETRY_MAX_SEARCH_HITS
fn apply_env_overrides(config: &mut VeilConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("VEIL_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Processing overrides
    config
        .processing
        .apply_env_overrides()
        .map_err(|e| VeilError::Configuration(format!("{e:#}")))?;

    // Geometry overrides
    if let Ok(val) = std::env::var("VEIL_GEOMETRY_MAX_SEARCH_HITS") {
        config.geometry.max_search_hits = parse_env("VEIL_GEOMETRY_MAX_SEARCH_HITS", &val)?;
    }
    if let Ok(val) = std::env::var("VEIL_GEOMETRY_SPAN_MATCH_TOLERANCE") {
        config.geometry.span_match_tolerance =
            parse_env("VEIL_GEOMETRY_SPAN_MATCH_TOLERANCE", &val)?;
    }

    // Background overrides
    if let Ok(val) = std::env::var("VEIL_BACKGROUND_MIN_LUMINANCE") {
        config.background.min_luminance = parse_env("VEIL_BACKGROUND_MIN_LUMINANCE", &val)?;
    }
    if let Ok(val) = std::env::var("VEIL_BACKGROUND_MIN_SAMPLES") {
        config.background.min_samples = parse_env("VEIL_BACKGROUND_MIN_SAMPLES", &val)?;
    }

    // Mutation overrides
    if let Ok(val) = std::env::var("VEIL_MUTATION_MIN_FONT_SIZE") {
        config.mutation.min_font_size = parse_env("VEIL_MUTATION_MIN_FONT_SIZE", &val)?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::config::ProcessingMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("VEIL_TEST_SUBST_PATH", "/data/pools.toml");
        let input = "pool_path = \"${VEIL_TEST_SUBST_PATH}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "pool_path = \"/data/pools.toml\"");
        std::env::remove_var("VEIL_TEST_SUBST_PATH");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("VEIL_TEST_MISSING_VAR");
        let input = "pool_path = \"${VEIL_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("VEIL_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("VEIL_TEST_COMMENTED");
        let input = "# pool_path = \"${VEIL_TEST_COMMENTED}\"\nseed = 1";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(VeilError::Configuration(_))));
    }

    #[test]
    fn test_load_config_or_default_missing_file() {
        let config = load_config_or_default("definitely-missing-veil.toml").unwrap();
        assert_eq!(config.mutation.baseline_offset, 2.0);
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[processing]
confidence_threshold = 0.8
mode = "censor"
seed = 7

[mutation]
min_font_size = 5.0

[logging]
local_enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.processing.confidence_threshold, 0.8);
        assert_eq!(config.processing.mode, ProcessingMode::Censor);
        assert_eq!(config.processing.seed, Some(7));
        assert_eq!(config.mutation.min_font_size, 5.0);
        assert!(!config.logging.local_enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = parse_config("[background]\nmin_luminance = 400.0\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn test_env_override_applied() {
        std::env::set_var("VEIL_GEOMETRY_SPAN_MATCH_TOLERANCE", "12.5");
        let config = parse_config("").unwrap();
        std::env::remove_var("VEIL_GEOMETRY_SPAN_MATCH_TOLERANCE");
        assert_eq!(config.geometry.span_match_tolerance, 12.5);
    }
}
