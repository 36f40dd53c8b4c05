//! whisper-faster subprocess invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use skriv_core::Model;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{EngineError, Result};

/// Binary probed on PATH when no explicit engine path is configured.
const ENGINE_BINARY: &str = "whisper-faster";

/// The subtitle file the engine writes for a given source stem. Appended
/// rather than `with_extension`: a dotted stem like `recording.1` must
/// yield `recording.1.srt`, not `recording.srt`.
pub fn srt_output_path(out_dir: &Path, stem: &std::ffi::OsStr) -> PathBuf {
    out_dir.join(format!("{}.srt", stem.to_string_lossy()))
}

/// Handle to the external engine. Holds everything that is constant across
/// jobs; per-job options travel with the job itself.
#[derive(Debug)]
pub struct FasterWhisper {
    executable: PathBuf,
    model_dir: PathBuf,
    threads: usize,
}

impl FasterWhisper {
    /// Resolves and verifies the engine executable. A configured path must
    /// exist; without one, `PATH` is searched for `whisper-faster`.
    pub fn new(configured: Option<&Path>, model_dir: PathBuf) -> Result<Self> {
        let executable = match configured {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => {
                return Err(EngineError::NotFound(format!(
                    "configured engine_path does not exist: {}",
                    path.display()
                )));
            }
            None => which::which(ENGINE_BINARY).map_err(|_| {
                EngineError::NotFound(format!(
                    "{ENGINE_BINARY} is not on PATH; set engine_path in the config"
                ))
            })?,
        };

        // The engine saturates a core per thread; leave headroom for the
        // rest of the system.
        let threads = num_cpus::get().clamp(1, 8);

        info!(engine = %executable.display(), threads, "engine ready");
        Ok(Self {
            executable,
            model_dir,
            threads,
        })
    }

    /// Runs the engine on `source`, expecting it to write
    /// `<source stem>.srt` into `out_dir`. Returns the path of that file.
    pub async fn transcribe_to_srt(
        &self,
        source: &Path,
        out_dir: &Path,
        model: Model,
        language: Option<&str>,
        beep_off: bool,
    ) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .ok_or_else(|| EngineError::InvalidSource(source.to_path_buf()))?;

        let args = self.build_args(source, out_dir, model, language, beep_off);
        debug!(?args, "invoking engine");

        let started = Instant::now();
        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let expected = srt_output_path(out_dir, stem);
        if !expected.exists() {
            return Err(EngineError::MissingOutput(expected));
        }

        info!(
            source = %source.display(),
            elapsed_s = started.elapsed().as_secs_f64(),
            "engine finished"
        );
        Ok(expected)
    }

    fn build_args(
        &self,
        source: &Path,
        out_dir: &Path,
        model: Model,
        language: Option<&str>,
        beep_off: bool,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            source.into(),
            "--model".into(),
            model.as_str().into(),
            "--model_dir".into(),
            self.model_dir.clone().into(),
            "--output_dir".into(),
            out_dir.into(),
            "--output_format".into(),
            "srt".into(),
            "--threads".into(),
            self.threads.to_string().into(),
            "--sentence".into(),
        ];
        if let Some(language) = language {
            args.push("--language".into());
            args.push(language.into());
        }
        if beep_off {
            args.push("--beep_off".into());
        }
        args
    }
}
