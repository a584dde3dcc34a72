//! Cleanup of raw extracted text before chunking.

const ALLOWED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '-', '\'', '"'];

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(&c)
}

/// Strip characters outside the allow-list, collapse whitespace runs to single
/// spaces and trim.
///
/// An empty result means "no content" and is not an error.
pub fn normalize(raw: &str) -> String {
    let filtered: String = raw.chars().filter(|&c| is_allowed(c)).collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
