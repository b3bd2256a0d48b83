//! Search text normalization

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("static pattern"));
static ANY_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));
static PUNCT_GAPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([./-])\s*").expect("static pattern"));

/// NFKC, exotic spaces folded to U+0020, runs of spaces and tabs collapsed, trimmed
pub fn normalize_for_search(s: &str) -> String {
    let folded: String = s
        .nfkc()
        .map(|c| match c {
            '\u{00A0}' | '\u{2009}' | '\u{202F}' => ' ',
            other => other,
        })
        .collect();
    HORIZONTAL_WS.replace_all(&folded, " ").trim().to_string()
}

/// Search queries to try for `original`, most literal first
///
/// Variants: the normalized text, punctuation gaps removed, all whitespace
/// collapsed, spaces removed (only up to `despace_max_chars`), then upper,
/// lower and title case. Empty and repeated variants are dropped.
pub fn query_variants(original: &str, despace_max_chars: usize) -> Vec<String> {
    let base = normalize_for_search(original);

    let mut candidates = vec![
        base.clone(),
        PUNCT_GAPS.replace_all(&base, "$1").into_owned(),
        ANY_WS.replace_all(&base, " ").into_owned(),
    ];
    if base.chars().count() <= despace_max_chars {
        candidates.push(base.replace(' ', ""));
    }
    candidates.push(base.to_uppercase());
    candidates.push(base.to_lowercase());
    candidates.push(title_case(&base));

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Uppercase the first letter of every run of letters, lowercase the rest
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
