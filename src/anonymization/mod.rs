//! Anonymization module for Veil
//!
//! This module turns classifier output into replacements. It does not detect
//! entities itself; spans come from an [`EntityClassifier`].
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Resolution**: confidence filtering and overlap removal ([`SpanResolver`])
//! - **Allocation**: consistent, unique, length-matched surrogates from
//!   reference pools ([`SurrogateAllocator`])
//! - **Censoring**: length-preserving masking as an alternative to allocation
//! - **Audit**: JSON-lines records with hashed originals
//!
//! # Usage
//!
//! ```rust
//! use veil::anonymization::{ProcessingConfig, RawSpan, TextAnonymizer};
//!
//! let config = ProcessingConfig {
//!     seed: Some(42),
//!     ..Default::default()
//! };
//! let mut anonymizer = TextAnonymizer::from_config(&config).unwrap();
//! let outcome = anonymizer.process(
//!     "Ahmet Yilmaz aradı",
//!     vec![RawSpan::new("PERSON", "Ahmet Yilmaz", 0, 12, 0.97)],
//! );
//! assert_ne!(outcome.text, "Ahmet Yilmaz aradı");
//! assert!(outcome.text.ends_with(" aradı"));
//! ```

pub mod allocator;
pub mod audit;
pub mod censor;
pub mod classifier;
pub mod config;
pub mod models;
pub mod report;
pub mod resolver;
pub mod text;

// Re-export main types
pub use allocator::{SurrogateAllocator, SurrogatePool};
pub use classifier::{ChunkedClassifier, EntityClassifier, PrecomputedClassifier};
pub use config::{ConsistencyScope, ProcessingConfig, ProcessingMode};
pub use models::{AllocationTier, EntitySpan, EntityType, RawSpan};
pub use report::AnonymizationReport;
pub use resolver::SpanResolver;
pub use text::{ReplacementRecord, TextAnonymizer, TextOutcome};
