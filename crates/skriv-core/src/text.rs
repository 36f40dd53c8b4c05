//! Transcript post-processing.

/// Rewrites a transcript for insertion mid-sentence: trailing whitespace is
/// trimmed, one trailing period is stripped, and the first character is
/// lowercased. Intended for dictating a fragment that continues an existing
/// sentence.
pub fn fragment(text: &str) -> String {
    let trimmed = text.trim_end();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
