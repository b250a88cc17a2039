//! Chat-safe hashtag normalization.

/// Reduces `text` to the ASCII letters and digits it contains, in order.
///
/// Everything else (whitespace, punctuation, non-Latin scripts) is dropped,
/// so the result is always usable as a hashtag.
pub fn normalize_tag(text: &str) -> String {
    text.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Normalizes every tag.
///
/// Tags that normalize to an empty string are dropped instead of kept as
/// empty entries, so the result never contains a bare `#` or an empty
/// list item. Its length can therefore be smaller than `tags.len()`.
pub fn normalized_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}
