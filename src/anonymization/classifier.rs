//! Classifier seam
//!
//! Entity detection happens outside this crate. A classifier only has to turn
//! text into [`RawSpan`]s with character offsets; [`ChunkedClassifier`] adapts
//! models with a bounded input window.

use crate::anonymization::models::RawSpan;
use crate::domain::Result;
use crate::domain::errors::VeilError;

/// Default classifier input window, in characters
pub const MAX_CHUNK_CHARS: usize = 512;

/// Produces candidate spans for a text
pub trait EntityClassifier {
    /// Offsets in the returned spans are character offsets into `text`
    fn classify(&self, text: &str) -> Result<Vec<RawSpan>>;
}

/// A window of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Character offset of the window in the full text
    pub start: usize,
    pub text: String,
}

/// Split `text` into consecutive windows of at most `max_chars` characters
///
/// A window that would cut a word ends at the last whitespace inside it
/// instead. Windows cover the text without gaps or overlap.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + max_chars).min(chars.len());
        if end < chars.len() {
            if let Some(space) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if space > 0 {
                    end = start + space;
                }
            }
        }
        chunks.push(TextChunk {
            start,
            text: chars[start..end].iter().collect(),
        });
        start = end;
    }

    chunks
}

/// Runs an inner classifier window by window and shifts offsets back
pub struct ChunkedClassifier<C> {
    inner: C,
    max_chars: usize,
}

impl<C: EntityClassifier> ChunkedClassifier<C> {
    pub fn new(inner: C) -> Self {
        Self::with_window(inner, MAX_CHUNK_CHARS)
    }

    pub fn with_window(inner: C, max_chars: usize) -> Self {
        Self { inner, max_chars }
    }
}

impl<C: EntityClassifier> EntityClassifier for ChunkedClassifier<C> {
    fn classify(&self, text: &str) -> Result<Vec<RawSpan>> {
        let chunks = chunk_text(text, self.max_chars);
        let mut spans = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            match self.inner.classify(&chunk.text) {
                Ok(found) => {
                    spans.extend(found.into_iter().map(|mut span| {
                        span.start = span.start.map(|s| s + chunk.start);
                        span.end = span.end.map(|e| e + chunk.start);
                        span
                    }));
                }
                Err(e) => {
                    tracing::warn!(chunk = index, error = %e, "Chunk classification failed");
                }
            }
        }

        tracing::debug!(chunks = chunks.len(), spans = spans.len(), "Classified text");
        Ok(spans)
    }
}

/// Serves spans computed ahead of time, e.g. loaded from a JSON file
#[derive(Debug, Clone, Default)]
pub struct PrecomputedClassifier {
    spans: Vec<RawSpan>,
}

impl PrecomputedClassifier {
    pub fn new(spans: Vec<RawSpan>) -> Self {
        Self { spans }
    }

    /// Parse a JSON array of spans
    pub fn from_json(content: &str) -> Result<Self> {
        let spans: Vec<RawSpan> = serde_json::from_str(content)
            .map_err(|e| VeilError::Serialization(format!("Invalid span file: {e}")))?;
        Ok(Self { spans })
    }
}

impl EntityClassifier for PrecomputedClassifier {
    fn classify(&self, _text: &str) -> Result<Vec<RawSpan>> {
        Ok(self.spans.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flags every occurrence of "Ahmet"
    struct NameFinder;

    impl EntityClassifier for NameFinder {
        fn classify(&self, text: &str) -> Result<Vec<RawSpan>> {
            let chars: Vec<char> = text.chars().collect();
            let needle: Vec<char> = "Ahmet".chars().collect();
            Ok(chars
                .windows(needle.len())
                .enumerate()
                .filter(|(_, w)| *w == needle.as_slice())
                .map(|(i, _)| RawSpan::new("PERSON", "Ahmet", i, i + needle.len(), 0.95))
                .collect())
        }
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Merhaba dünya", 512);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn test_chunks_break_at_whitespace_without_gaps() {
        let text = "aaaa bbbb cccc dddd";
        let chunks = chunk_text(text, 7);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 7));
        assert_eq!(chunks[0].text, "aaaa");
        assert_eq!(chunks[1].start, 4);
    }

    #[test]
    fn test_long_word_is_hard_split() {
        let chunks = chunk_text("abcdefghij", 4);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunked_offsets_are_global() {
        let text = format!("{} Ahmet geldi", "x ".repeat(300));
        let classifier = ChunkedClassifier::new(NameFinder);
        let spans = classifier.classify(&text).unwrap();
        assert_eq!(spans.len(), 1);
        let start = spans[0].start.unwrap();
        let found: String = text.chars().skip(start).take(5).collect();
        assert_eq!(found, "Ahmet");
    }

    #[test]
    fn test_precomputed_from_json() {
        let json = r#"[{"entity_group": "PERSON", "word": "Ahmet", "start": 0, "end": 5, "score": 0.9}]"#;
        let classifier = PrecomputedClassifier::from_json(json).unwrap();
        let spans = classifier.classify("Ahmet").unwrap();
        assert_eq!(spans[0].label, "PERSON");
        assert!(PrecomputedClassifier::from_json("{").is_err());
    }
}
