//! Entity span data models

use crate::domain::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type, a closed tag set
///
/// Serialized as the lowercase tag used by the surrogate pools and the
/// classifier training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Person names
    #[serde(rename = "ad_soyad")]
    PersonName,
    /// Telephone numbers
    #[serde(rename = "telefon")]
    Phone,
    /// Email addresses
    #[serde(rename = "email")]
    Email,
    /// Postal addresses
    #[serde(rename = "adres")]
    Address,
    /// Company and organization names
    #[serde(rename = "sirket")]
    Organization,
    /// Bank account numbers
    #[serde(rename = "iban")]
    Iban,
    /// Dates
    #[serde(rename = "tarih")]
    Date,
    /// Monetary amounts
    #[serde(rename = "para")]
    Money,
    /// National identity numbers (checksum-validated)
    #[serde(rename = "tc_kimlik")]
    NationalId,
    /// Labels outside the known vocabulary
    #[serde(rename = "other")]
    Other,
}

impl EntityType {
    /// Every tag, in pool file order
    pub const ALL: [EntityType; 10] = [
        Self::PersonName,
        Self::Organization,
        Self::Address,
        Self::Phone,
        Self::Email,
        Self::Iban,
        Self::Date,
        Self::Money,
        Self::NationalId,
        Self::Other,
    ];

    /// The serialized tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PersonName => "ad_soyad",
            Self::Phone => "telefon",
            Self::Email => "email",
            Self::Address => "adres",
            Self::Organization => "sirket",
            Self::Iban => "iban",
            Self::Date => "tarih",
            Self::Money => "para",
            Self::NationalId => "tc_kimlik",
            Self::Other => "other",
        }
    }

    /// Get human-readable label for the type
    pub fn label(&self) -> &'static str {
        match self {
            Self::PersonName => "PERSON",
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::Address => "ADDRESS",
            Self::Organization => "ORGANIZATION",
            Self::Iban => "IBAN",
            Self::Date => "DATE",
            Self::Money => "MONEY",
            Self::NationalId => "NATIONAL_ID",
            Self::Other => "OTHER",
        }
    }

    /// Parse a serialized tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Map a classifier label onto the tag set
    ///
    /// Labels outside the static table fall back to their lowercased form
    /// parsed as a tag, and to [`EntityType::Other`] when that fails too.
    pub fn from_model_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PERSON" | "PER" | "B-PERSON" | "I-PERSON" => Self::PersonName,
            "PHONE" | "PHONE_NUMBER" => Self::Phone,
            "EMAIL" => Self::Email,
            "ADDRESS" => Self::Address,
            "ORGANIZATION" | "ORG" => Self::Organization,
            "MONEY" => Self::Money,
            "DATE" => Self::Date,
            "ID_NUMBER" | "NATIONAL_ID" => Self::NationalId,
            _ => Self::from_tag(&label.trim().to_lowercase()).unwrap_or(Self::Other),
        }
    }

    /// Whether surrogates of this type must satisfy a checksum formula
    pub fn is_checksum_identifier(&self) -> bool {
        matches!(self, Self::NationalId)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Detection method that produced a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Fine-tuned named entity recognition model
    #[default]
    CustomNer,
    /// Regex match confirmed by a validator
    RegexValidated,
    /// Supplied by a person
    Manual,
}

/// Which allocation tier produced a surrogate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationTier {
    /// Reused the surrogate already assigned to the same original
    Consistent,
    /// Reused an unused memoised choice for (type, original, length)
    Memo,
    /// Distinct unused candidate of the same length
    ExactLength,
    /// Distinct unused candidate of the nearest available length
    NearestLength,
    /// Synthesized checksum-valid identifier
    Generated,
    /// Unused candidate that may equal the original
    OriginalFallback,
    /// Nothing usable; the original text is kept
    Unchanged,
    /// Masked by the censor transform rather than allocated
    Censored,
}

impl AllocationTier {
    /// Tiers in resolution order
    pub const ORDER: [AllocationTier; 8] = [
        Self::Consistent,
        Self::Memo,
        Self::ExactLength,
        Self::NearestLength,
        Self::Generated,
        Self::OriginalFallback,
        Self::Unchanged,
        Self::Censored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consistent => "consistent",
            Self::Memo => "memo",
            Self::ExactLength => "exact_length",
            Self::NearestLength => "nearest_length",
            Self::Generated => "generated",
            Self::OriginalFallback => "original_fallback",
            Self::Unchanged => "unchanged",
            Self::Censored => "censored",
        }
    }
}

/// Where a span sits on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Zero-based page index
    pub page: usize,
    /// Bounding box of the text block holding the span
    pub bbox: Rect,
    /// Font name reported for the block
    pub font: String,
    /// Font size in points
    pub size: f64,
    /// Packed `0xRRGGBB` text colour
    pub color: u32,
    /// Font flags as reported by extraction
    #[serde(default)]
    pub flags: u32,
    /// Full text of the block
    pub block_text: String,
    /// Span start relative to `block_text`
    pub relative_start: usize,
    /// Span end relative to `block_text`
    pub relative_end: usize,
}

/// Candidate span as produced by a classifier
///
/// Field aliases accept token-classification pipeline output directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpan {
    /// Classifier label, mapped through [`EntityType::from_model_label`]
    #[serde(alias = "entity_group", alias = "entity_type", alias = "type")]
    pub label: String,
    /// Surface text
    #[serde(alias = "word", default)]
    pub text: String,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
    /// Confidence score
    pub score: f32,
    #[serde(default)]
    pub method: DetectionMethod,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl RawSpan {
    /// Create a raw span with offsets
    pub fn new(
        label: impl Into<String>,
        text: impl Into<String>,
        start: usize,
        end: usize,
        score: f32,
    ) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            start: Some(start),
            end: Some(end),
            score,
            method: DetectionMethod::CustomNer,
            location: None,
        }
    }
}

/// Resolved entity span, enriched in place as it moves through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpan {
    pub entity_type: EntityType,
    /// Original surface text
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    pub method: DetectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Replacement text once allocated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Tier that produced `replacement`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<AllocationTier>,
}

impl EntitySpan {
    /// Create a new span
    pub fn new(
        entity_type: EntityType,
        text: impl Into<String>,
        start: usize,
        end: usize,
        confidence: f32,
    ) -> Self {
        Self {
            entity_type,
            text: text.into(),
            start,
            end,
            confidence: confidence.clamp(0.0, 1.0),
            method: DetectionMethod::CustomNer,
            location: None,
            replacement: None,
            tier: None,
        }
    }

    /// Attach a source location
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Length of the original text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether `[start, end)` intersects the other span's range
    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether a replacement was attached that differs from the original
    pub fn is_replaced(&self) -> bool {
        self.replacement.as_deref().is_some_and(|r| r != self.text)
    }
}
