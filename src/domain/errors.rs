//! Domain error types
//!
//! Fatal errors surface as [`VeilError`] (or [`BackendError`] for a single document).
//! Conditions that only affect one span are [`AnonymizationIssue`]s: they are recorded
//! in reports and never abort a run.

use crate::anonymization::models::EntityType;
use serde::Serialize;
use thiserror::Error;

/// Main Veil error type
#[derive(Debug, Error)]
pub enum VeilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed input that cannot be processed at all
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document backend errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Document backend errors
///
/// Fatal for the affected document only. Allocation state shared with other
/// documents is never touched when one of these is raised.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Document could not be opened or parsed
    #[error("Failed to open document: {0}")]
    Open(String),

    /// Page index out of range
    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// Text extraction failed
    #[error("Failed to extract text from page {page}: {message}")]
    Extract { page: usize, message: String },

    /// Rasterization failed
    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    /// Text search failed
    #[error("Search failed on page {page}: {message}")]
    Search { page: usize, message: String },

    /// Redaction annotation or flattening failed
    #[error("Redaction failed on page {page}: {message}")]
    Redact { page: usize, message: String },

    /// Text measurement or insertion failed
    #[error("Text insertion failed on page {page}: {message}")]
    Insert { page: usize, message: String },

    /// Document could not be written
    #[error("Failed to save document: {0}")]
    Save(String),
}

/// Non-fatal, per-span conditions recorded during a run
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnonymizationIssue {
    /// A raw span was malformed and excluded
    #[error("Invalid span [{start:?}, {end:?}): {reason}")]
    InvalidSpan {
        start: Option<usize>,
        end: Option<usize>,
        reason: String,
    },

    /// No distinct surrogate could be found; the original was kept
    #[error("Pool exhausted for {entity_type} (original length {length})")]
    AllocationExhausted {
        entity_type: EntityType,
        length: usize,
    },

    /// The span could not be mapped back to page rectangles
    #[error("Geometry not found on page {page} for span [{start}, {end})")]
    GeometryNotFound {
        page: usize,
        start: usize,
        end: usize,
    },

    /// The same original resolved to several surrogates
    #[error("Consistency violation: '{original}' mapped to {surrogates:?}")]
    ConsistencyViolation {
        original: String,
        surrogates: Vec<String>,
    },
}

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        VeilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        VeilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VeilError {
    fn from(err: toml::de::Error) -> Self {
        VeilError::Configuration(format!("TOML parse error: {err}"))
    }
}
