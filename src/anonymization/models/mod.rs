//! Anonymization data models

pub mod entity;

pub use entity::{
    AllocationTier, DetectionMethod, EntitySpan, EntityType, RawSpan, SourceLocation,
};
