//! Paginated document anonymization
//!
//! This module provides:
//! - **Backend seam** ([`DocumentBackend`], [`PageHandle`]) over a PDF engine
//! - **Text extraction** into a [`BlockIndex`] the classifier runs on
//! - **Geometry recovery** mapping spans back to page rectangles
//! - **Background sampling** for fill colours
//! - **Page mutation** blanking text and drawing replacements
//!
//! [`DocumentAnonymizer`] runs the whole chain for one document.

pub mod backend;
pub mod blocks;
pub mod locator;
pub mod mutator;
pub mod normalize;
pub mod pipeline;
pub mod sampler;

pub use backend::{CharBox, DocumentBackend, PageHandle, SearchHit, TextSpan, TextStyle};
pub use blocks::{BlockIndex, TextBlock};
pub use locator::{GeometryLocator, LocateStrategy, Located};
pub use mutator::{EditStatus, EntityOutcome, PageEdit, PageMutator, PageReport, SkipReason};
pub use pipeline::{DocumentAnonymizer, DocumentOutcome, DocumentReport};
pub use sampler::BackgroundSampler;
