//! Subtitle output reduction.
//!
//! The engine writes SubRip files: blocks of a sequence index, a time
//! range, and one or more text lines. Only the text lines matter here.

/// True for lines like `00:00:01,000 --> 00:00:02,500`.
fn is_time_range(line: &str) -> bool {
    line.contains("-->")
}

/// True for pure sequence-index lines.
fn is_index(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

/// Extracts the spoken-text lines of a subtitle file in their original
/// order, dropping blanks, sequence indices and time ranges.
pub fn spoken_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty() && !is_index(line) && !is_time_range(line))
        .map(str::to_owned)
        .collect()
}

/// The whole subtitle file as newline-joined spoken text.
pub fn plain_text(content: &str) -> String {
    spoken_lines(content).join("\n")
}
