//! Length-preserving masking

const KEPT_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '-', '_'];

/// Mask a value character by character
///
/// Whitespace becomes a plain space, common punctuation is kept and
/// everything else turns into `*`, so the result has the same character
/// count and word shape as the input.
///
/// ```
/// assert_eq!(veil::anonymization::censor::censor("Ahmet Yilmaz"), "***** ******");
/// ```
pub fn censor(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_whitespace() {
                ' '
            } else if KEPT_PUNCTUATION.contains(&c) {
                c
            } else {
                '*'
            }
        })
        .collect()
}
