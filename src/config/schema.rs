//! Configuration schema types
//!
//! Every section has defaults, so an empty file is a valid configuration.

use crate::anonymization::config::ProcessingConfig;
use serde::{Deserialize, Serialize};

/// Main Veil configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeilConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Span resolution, allocation and audit settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Geometry recovery settings
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Background colour sampling settings
    #[serde(default)]
    pub background: BackgroundConfig,

    /// Page mutation settings
    #[serde(default)]
    pub mutation: MutationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VeilConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.processing
            .validate()
            .map_err(|e| format!("processing: {e:#}"))?;
        self.geometry.validate()?;
        self.background.validate()?;
        self.mutation.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Geometry recovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Maximum hits considered per search query
    #[serde(default = "default_max_search_hits")]
    pub max_search_hits: usize,

    /// Manhattan distance within which a text span matches a block origin
    #[serde(default = "default_span_match_tolerance")]
    pub span_match_tolerance: f64,

    /// Longest query (in characters) for which a de-spaced variant is tried
    #[serde(default = "default_despace_max_chars")]
    pub despace_max_chars: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            max_search_hits: default_max_search_hits(),
            span_match_tolerance: default_span_match_tolerance(),
            despace_max_chars: default_despace_max_chars(),
        }
    }
}

impl GeometryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_search_hits == 0 {
            return Err("geometry.max_search_hits must be > 0".to_string());
        }
        if !self.span_match_tolerance.is_finite() || self.span_match_tolerance < 0.0 {
            return Err("geometry.span_match_tolerance must be a non-negative number".to_string());
        }
        Ok(())
    }
}

/// Background colour sampling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Gap between the text box and the sampled ring
    #[serde(default = "default_background_margin")]
    pub margin: f64,

    /// Width of the sampled ring
    #[serde(default = "default_background_ring")]
    pub ring: f64,

    /// Pixels at or below this luminance (0-255) are treated as ink
    #[serde(default = "default_min_luminance")]
    pub min_luminance: f64,

    /// Bright pixels required for a sampled colour
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Colour used when sampling is inconclusive, channels in [0, 1]
    #[serde(default = "default_fallback_color")]
    pub fallback_color: [f32; 3],
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            margin: default_background_margin(),
            ring: default_background_ring(),
            min_luminance: default_min_luminance(),
            min_samples: default_min_samples(),
            fallback_color: default_fallback_color(),
        }
    }
}

impl BackgroundConfig {
    fn validate(&self) -> Result<(), String> {
        if self.margin < 0.0 || self.ring <= 0.0 {
            return Err("background.margin must be >= 0 and background.ring > 0".to_string());
        }
        if !(0.0..=255.0).contains(&self.min_luminance) {
            return Err("background.min_luminance must be between 0 and 255".to_string());
        }
        if self.min_samples == 0 {
            return Err("background.min_samples must be greater than 0".to_string());
        }
        if self.fallback_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(
                "background.fallback_color channels must be between 0.0 and 1.0".to_string(),
            );
        }
        Ok(())
    }
}

/// Page mutation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Smallest font size used for inserted text
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f64,

    /// Text may overflow its box by this factor before shrinking
    #[serde(default = "default_width_tolerance")]
    pub width_tolerance: f64,

    /// Extra factor applied when shrinking to fit
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,

    /// Scale applied when the text cannot be measured
    #[serde(default = "default_fallback_scale")]
    pub fallback_scale: f64,

    /// Distance from the box bottom to the baseline
    #[serde(default = "default_baseline_offset")]
    pub baseline_offset: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            min_font_size: default_min_font_size(),
            width_tolerance: default_width_tolerance(),
            shrink_factor: default_shrink_factor(),
            fallback_scale: default_fallback_scale(),
            baseline_offset: default_baseline_offset(),
        }
    }
}

impl MutationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.min_font_size <= 0.0 {
            return Err("mutation.min_font_size must be > 0".to_string());
        }
        if self.width_tolerance < 1.0 {
            return Err("mutation.width_tolerance must be >= 1.0".to_string());
        }
        for (name, value) in [
            ("shrink_factor", self.shrink_factor),
            ("fallback_scale", self.fallback_scale),
        ] {
            if value <= 0.0 || value > 1.0 {
                return Err(format!("mutation.{name} must be in (0, 1]"));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_search_hits() -> usize {
    64
}

fn default_span_match_tolerance() -> f64 {
    10.0
}

fn default_despace_max_chars() -> usize {
    64
}

fn default_background_margin() -> f64 {
    1.5
}

fn default_background_ring() -> f64 {
    4.0
}

fn default_min_luminance() -> f64 {
    60.0
}

fn default_min_samples() -> usize {
    50
}

fn default_fallback_color() -> [f32; 3] {
    [0.96, 0.96, 0.96]
}

fn default_min_font_size() -> f64 {
    6.0
}

fn default_width_tolerance() -> f64 {
    1.1
}

fn default_shrink_factor() -> f64 {
    0.9
}

fn default_fallback_scale() -> f64 {
    0.8
}

fn default_baseline_offset() -> f64 {
    2.0
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let config: VeilConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.processing.confidence_threshold, 0.7);
        assert_eq!(config.geometry.max_search_hits, 64);
    }

    #[test]
    fn test_geometry_config_validation() {
        let mut config = GeometryConfig::default();
        assert!(config.validate().is_ok());

        config.span_match_tolerance = f64::NAN;
        assert!(config.validate().is_err());

        config = GeometryConfig {
            max_search_hits: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_background_config_validation() {
        let mut config = BackgroundConfig::default();
        assert!(config.validate().is_ok());

        config.fallback_color = [1.2, 0.0, 0.0];
        assert!(config.validate().is_err());

        let config = BackgroundConfig {
            min_samples: 0,
            ..BackgroundConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mutation_config_validation() {
        let mut config = MutationConfig::default();
        assert!(config.validate().is_ok());

        config.width_tolerance = 0.5;
        assert!(config.validate().is_err());

        config = MutationConfig {
            shrink_factor: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.local_enabled);
        assert_eq!(config.local_path, "./logs");
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_processing_errors_are_prefixed() {
        let mut config = VeilConfig::default();
        config.processing.confidence_threshold = 2.0;
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("processing:"));
    }
}
