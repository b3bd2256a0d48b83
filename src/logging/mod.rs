//! Logging and observability
//!
//! Structured logging through `tracing`, with:
//! - Console output for interactive use
//! - JSON-formatted file logs with rotation
//! - Configurable log levels
//!
//! Original entity values are only ever logged at `debug` or below, and only
//! as lengths; plaintext never reaches the log.
//!
//! # Example
//!
//! ```no_run
//! use veil::logging::init_logging;
//! use veil::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of an anonymization run
///
/// # Example
///
/// ```no_run
/// use veil::log_run_start;
///
/// log_run_start!("letter.pdf", "replace");
/// ```
#[macro_export]
macro_rules! log_run_start {
    ($source:expr, $mode:expr) => {
        tracing::info!(
            source = %$source,
            mode = %$mode,
            "Starting anonymization run"
        );
    };
}

/// Log the completion of an anonymization run
///
/// # Example
///
/// ```no_run
/// use veil::log_run_complete;
/// use std::time::Duration;
///
/// log_run_complete!("letter.pdf", 12, Duration::from_millis(850));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($source:expr, $replaced:expr, $duration:expr) => {
        tracing::info!(
            source = %$source,
            replaced = $replaced,
            duration_ms = $duration.as_millis() as u64,
            "Anonymization run completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use veil::log_error_with_context;
/// use veil::domain::VeilError;
///
/// let error = VeilError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log page progress within a document
///
/// # Example
///
/// ```no_run
/// use veil::log_page_progress;
///
/// log_page_progress!(3, 10);
/// ```
#[macro_export]
macro_rules! log_page_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            page = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            "Processing page"
        );
    };
}
