//! Recording sessions.
//!
//! A session lives on its own thread because the audio stream must stay on
//! the thread that built it. The session owns no stop channel: it sleeps on
//! the state machine and flushes as soon as the state leaves Recording,
//! then reports back through `recording_flushed`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use skriv_audio::{Recorder, Recording};
use skriv_core::{Config, Job, StateMachine, paths};
use tracing::{error, info, warn};

use crate::worker::Pipeline;

/// Starts sessions and guarantees at most one exists at a time. The state
/// machine already refuses a second start while Recording; this additionally
/// covers the window where a finished session is still flushing to disk.
pub struct CaptureController {
    state: Arc<StateMachine>,
    config: Arc<RwLock<Config>>,
    pipeline: Arc<Pipeline>,
    session: Option<thread::JoinHandle<()>>,
}

impl CaptureController {
    pub fn new(
        state: Arc<StateMachine>,
        config: Arc<RwLock<Config>>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Self {
            state,
            config,
            pipeline,
            session: None,
        }
    }

    /// Spawns a session. The caller must already hold the Recording state.
    pub fn start_session(&mut self, fragment: bool) {
        if let Some(previous) = self.session.take() {
            if !previous.is_finished() {
                warn!("waiting for previous session to finish flushing");
            }
            // Flushing is bounded work; join rather than leak a session.
            if previous.join().is_err() {
                error!("previous recording session panicked");
            }
        }

        let state = self.state.clone();
        let config = self.config.clone();
        let pipeline = self.pipeline.clone();
        let spawned = thread::Builder::new()
            .name("capture".into())
            .spawn(move || run_session(state, config, pipeline, fragment));
        match spawned {
            Ok(handle) => self.session = Some(handle),
            Err(e) => {
                error!("failed to spawn capture thread: {}", e);
                self.state.request_stop();
                self.state.recording_flushed(self.pipeline.pending() > 0);
            }
        }
    }

    /// Blocks until a running session has flushed. Used on quit.
    pub fn join(&mut self) {
        if let Some(handle) = self.session.take() {
            handle.join().ok();
        }
    }
}

fn run_session(
    state: Arc<StateMachine>,
    config: Arc<RwLock<Config>>,
    pipeline: Arc<Pipeline>,
    fragment: bool,
) {
    let recorder = Recorder::new();
    let mut handle = match recorder.start() {
        Ok(handle) => handle,
        Err(e) => {
            // A dead microphone behaves like an empty recording.
            error!("failed to start recording: {}", e);
            state.request_stop();
            state.recording_flushed(pipeline.pending() > 0);
            return;
        }
    };

    state.wait_while_recording();

    match handle.finish() {
        Ok(Some(recording)) => flush_recording(recording, fragment, &state, &config, &pipeline),
        Ok(None) => state.recording_flushed(pipeline.pending() > 0),
        Err(e) => {
            error!("failed to finalize recording: {}", e);
            state.recording_flushed(pipeline.pending() > 0);
        }
    }
}

fn flush_recording(
    recording: Recording,
    fragment: bool,
    state: &StateMachine,
    config: &RwLock<Config>,
    pipeline: &Pipeline,
) {
    let (out_dir, timestamped, discard_below, model, language) = {
        let cfg = config.read();
        (
            cfg.output_dir(),
            cfg.timestamped_names,
            cfg.discard_duration(),
            cfg.model,
            cfg.language.clone(),
        )
    };

    let duration = recording.duration();
    if recording.is_empty() || duration < discard_below {
        info!(
            duration_s = duration.as_secs_f64(),
            threshold_s = discard_below.as_secs_f64(),
            "discarding recording below threshold"
        );
        state.recording_flushed(pipeline.pending() > 0);
        return;
    }

    match store_recording(recording.data(), &out_dir, timestamped) {
        Ok(target) => {
            info!(
                recording = %target.display(),
                duration_s = duration.as_secs_f64(),
                "recording saved"
            );
            match pipeline.submit(Job::single(target, model, language, fragment)) {
                Ok(()) => state.recording_flushed(true),
                Err(e) => {
                    error!("failed to enqueue recording: {:#}", e);
                    state.recording_flushed(pipeline.pending() > 0);
                }
            }
        }
        Err(e) => {
            error!("failed to store recording: {:#}", e);
            state.recording_flushed(pipeline.pending() > 0);
        }
    }
}

/// Writes the WAV bytes into the output directory under a collision-free
/// name and returns that path.
fn store_recording(data: &[u8], out_dir: &Path, timestamped: bool) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output dir {}", out_dir.display()))?;
    let target = paths::resolve_unique(&out_dir.join(paths::recording_name(timestamped)));
    fs::write(&target, data)
        .with_context(|| format!("failed to write recording {}", target.display()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_creates_missing_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("deep").join("out");
        let path = store_recording(b"RIFF", &out, false).unwrap();
        assert_eq!(path, out.join("recording.wav"));
        assert_eq!(fs::read(&path).unwrap(), b"RIFF");
    }

    #[test]
    fn repeated_stores_never_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let first = store_recording(b"one", tmp.path(), false).unwrap();
        let second = store_recording(b"two", tmp.path(), false).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }
}
