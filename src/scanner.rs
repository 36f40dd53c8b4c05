//! Clipboard file scanner.
//!
//! In scanner mode an activation first checks the clipboard for media file
//! paths. Each non-empty line is a candidate; existing media files are
//! offered as a batch and only transcribed after an explicit confirmation.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use skriv_core::MEDIA_EXTENSIONS;
use tracing::{debug, warn};

/// Reads the clipboard and returns the media files it names, in clipboard
/// order. An unreadable or non-text clipboard scans as empty.
pub fn scan_clipboard() -> Vec<PathBuf> {
    let text = match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text()) {
        Ok(text) => text,
        Err(e) => {
            debug!("clipboard not scannable: {}", e);
            return Vec::new();
        }
    };
    candidate_paths(&text)
}

/// One candidate per line: trimmed, unquoted, existing regular files with a
/// known media extension. Order is preserved and duplicates collapse onto
/// their first occurrence.
pub fn candidate_paths(text: &str) -> Vec<PathBuf> {
    let mut seen = Vec::new();
    for line in text.lines() {
        let line = line.trim().trim_matches(|c| c == '"' || c == '\'');
        if line.is_empty() {
            continue;
        }
        let path = PathBuf::from(line);
        if !is_media(&path) {
            continue;
        }
        if !path.is_file() {
            warn!(path = %path.display(), "clipboard names a missing file, skipping");
            continue;
        }
        if !seen.contains(&path) {
            seen.push(path);
        }
    }
    seen
}

fn is_media(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            MEDIA_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Lists the candidates and asks for a y/N confirmation on the terminal.
/// Anything but an explicit yes declines.
pub fn confirm_batch(candidates: &[PathBuf]) -> io::Result<bool> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Found {} file(s) on the clipboard:", candidates.len())?;
    for path in candidates {
        writeln!(out, "  {}", path.display())?;
    }
    write!(out, "Transcribe? [y/N] ")?;
    out.flush()?;

    let stdin = io::stdin();
    Ok(read_confirmation(stdin.lock()))
}

fn read_confirmation(input: impl BufRead) -> bool {
    let mut answer = String::new();
    let mut lines = input.lines();
    if let Some(Ok(line)) = lines.next() {
        answer = line;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
