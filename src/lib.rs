// Veil - Document Anonymization Tool
// Copyright (c) 2025 Veil Contributors
// Licensed under the MIT License

//! # Veil - Document Anonymization
//!
//! Veil replaces personal data in paginated documents and plain text with
//! realistic surrogates, keeping the layout intact.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Resolving** noisy classifier output into disjoint entity spans
//! - **Allocating** consistent, unique, length-matched surrogates from pools
//! - **Locating** spans on the page through an ordered chain of strategies
//! - **Mutating** pages: blanking the original and drawing the replacement
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`anonymization`] - Span resolution, surrogate allocation, text mode, reports
//! - [`document`] - Backend seam, geometry recovery, sampling and page edits
//! - [`domain`] - Errors and page geometry
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust
//! use veil::anonymization::{ProcessingConfig, RawSpan, TextAnonymizer};
//!
//! let config = ProcessingConfig {
//!     seed: Some(7),
//!     ..Default::default()
//! };
//! let mut anonymizer = TextAnonymizer::from_config(&config).unwrap();
//!
//! let text = "Ahmet ile Ahmet konuştu";
//! let outcome = anonymizer.process(
//!     text,
//!     vec![
//!         RawSpan::new("PERSON", "Ahmet", 0, 5, 0.95),
//!         RawSpan::new("PERSON", "Ahmet", 10, 15, 0.93),
//!     ],
//! );
//!
//! // Identical originals share one surrogate
//! assert_eq!(outcome.records[0].surrogate, outcome.records[1].surrogate);
//! ```
//!
//! ## Documents
//!
//! Documents are reached through [`document::DocumentBackend`]; a PDF engine
//! implements it and [`document::DocumentAnonymizer`] drives the run:
//!
//! ```rust,no_run
//! use veil::config::VeilConfig;
//! use veil::document::{DocumentAnonymizer, DocumentBackend};
//! use veil::anonymization::EntityClassifier;
//! use tokio::sync::watch;
//!
//! # fn example(
//! #     backend: &mut dyn DocumentBackend,
//! #     classifier: &dyn EntityClassifier,
//! # ) -> anyhow::Result<()> {
//! let mut anonymizer = DocumentAnonymizer::from_config(&VeilConfig::default())?;
//! let (_tx, shutdown) = watch::channel(false);
//!
//! let outcome = anonymizer.process("letter.pdf", backend, classifier, &shutdown)?;
//! std::fs::write("letter.anon.pdf", &outcome.bytes)?;
//! println!("{} entities replaced", outcome.report.successes());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`]; per-span problems are
//! collected as [`domain::AnonymizationIssue`]s and never abort a run.

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod document;
pub mod domain;
pub mod logging;
