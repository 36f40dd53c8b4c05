//! Collision-free output path resolution.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Returns `base` if nothing exists there, otherwise probes
/// `stem.1.ext`, `stem.2.ext`, ... until a free path is found. Existing
/// files are never overwritten; the only side effect is existence checks.
pub fn resolve_unique(base: impl AsRef<Path>) -> PathBuf {
    let base = base.as_ref();
    if !base.exists() {
        return base.to_path_buf();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = base.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = base.parent().unwrap_or_else(|| Path::new(""));

    for n in 1u32.. {
        let name = match &ext {
            Some(ext) => format!("{stem}.{n}.{ext}"),
            None => format!("{stem}.{n}"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("u32 candidate space exhausted");
}

/// File name for a fresh recording, optionally carrying a local timestamp.
/// The caller still passes the result through [`resolve_unique`].
pub fn recording_name(timestamped: bool) -> String {
    if timestamped {
        format!("rec-{}.wav", Local::now().format("%Y%m%d-%H%M%S"))
    } else {
        "recording.wav".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn free_path_is_returned_unchanged() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("out.srt");
        assert_eq!(resolve_unique(&base), base);
        // Idempotent while nothing is created.
        assert_eq!(resolve_unique(&base), base);
    }

    #[test]
    fn collisions_probe_numbered_suffixes() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("out.srt");

        fs::write(&base, b"x").unwrap();
        let first = resolve_unique(&base);
        assert_eq!(first, dir.path().join("out.1.srt"));

        fs::write(&first, b"x").unwrap();
        let second = resolve_unique(&base);
        assert_eq!(second, dir.path().join("out.2.srt"));

        fs::write(&second, b"x").unwrap();
        let third = resolve_unique(&base);
        assert_eq!(third, dir.path().join("out.3.srt"));
    }

    #[test]
    fn extensionless_paths_get_plain_counters() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("transcript");
        fs::write(&base, b"x").unwrap();
        assert_eq!(resolve_unique(&base), dir.path().join("transcript.1"));
    }

    #[test]
    fn recording_names() {
        assert_eq!(recording_name(false), "recording.wav");
        let stamped = recording_name(true);
        assert!(stamped.starts_with("rec-"));
        assert!(stamped.ends_with(".wav"));
    }
}
