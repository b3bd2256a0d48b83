//! Domain types for Veil.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Error types** ([`VeilError`], [`BackendError`], [`AnonymizationIssue`])
//! - **Result type alias** ([`Result`])
//! - **Page geometry** ([`Rect`], [`Point`], [`Quad`], [`Rgb`])
//!
//! # Error Handling
//!
//! Fallible library operations return [`Result<T, VeilError>`]. Problems that
//! affect a single span are not errors; they are collected as
//! [`AnonymizationIssue`]s and reported.
//!
//! ```rust
//! use veil::domain::{BackendError, Result, VeilError};
//!
//! fn save() -> Result<Vec<u8>> {
//!     Err(BackendError::Save("disk full".to_string()))?
//! }
//!
//! assert!(matches!(save(), Err(VeilError::Backend(_))));
//! ```

pub mod errors;
pub mod geometry;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{AnonymizationIssue, BackendError, VeilError};
pub use geometry::{Point, Quad, Rect, Rgb};
pub use result::Result;
