//! Transcription pipeline: the ordered job queue and its single consumer.
//!
//! The engine is one heavyweight process invocation, so exactly one worker
//! loop dequeues and fully processes a job before touching the next.
//! Submission never blocks; the channel is the FIFO and a shared pending
//! counter answers the "is the queue empty" question state transitions
//! need.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parking_lot::RwLock;
use skriv_core::{Config, Job, StateMachine, paths, text};
use skriv_engine::{FasterWhisper, srt, srt_output_path};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub(crate) struct JobQueue {
    jobs: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

pub(crate) struct JobReceiver {
    jobs: mpsc::UnboundedReceiver<Job>,
    pending: Arc<AtomicUsize>,
}

impl JobQueue {
    pub(crate) fn channel() -> (JobQueue, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            JobQueue {
                jobs: tx,
                pending: pending.clone(),
            },
            JobReceiver { jobs: rx, pending },
        )
    }

    /// Never blocks the caller; order of arrival is order of processing.
    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.jobs.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(anyhow!("transcription worker is gone"));
        }
        Ok(())
    }

    /// Jobs submitted but not yet fully processed.
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl JobReceiver {
    /// Blocks until a job arrives; `None` once all senders are dropped.
    pub(crate) async fn next(&mut self) -> Option<Job> {
        self.jobs.recv().await
    }

    /// Marks the current job finished; true when nothing else is queued.
    pub(crate) fn complete(&self) -> bool {
        self.pending.fetch_sub(1, Ordering::SeqCst) == 1
    }
}

/// Owns the worker runtime and the submission side of the queue.
pub struct Pipeline {
    // Owns the worker thread; dropping the runtime tears the loop down.
    _runtime: Runtime,
    queue: JobQueue,
}

impl Pipeline {
    pub fn new(config: Arc<RwLock<Config>>, state: Arc<StateMachine>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("skriv-worker")
            .enable_all()
            .build()?;

        let engine = {
            let cfg = config.read();
            FasterWhisper::new(cfg.engine_path.as_deref(), cfg.model_dir())
                .context("transcription engine unavailable")?
        };

        let (queue, rx) = JobQueue::channel();
        runtime.spawn(worker_loop(rx, engine, config, state));

        Ok(Self {
            _runtime: runtime,
            queue,
        })
    }

    /// Submits a job. Non-blocking; the file must exist at this point.
    pub fn submit(&self, job: Job) -> Result<()> {
        info!(
            source = %job.source.display(),
            skip_clipboard = job.skip_clipboard,
            fragment = job.fragment,
            model = %job.model,
            "job submitted"
        );
        self.queue.submit(job)
    }

    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Blocks until every submitted job has been fully processed. Used by
    /// batch runs and the quit path so no queued work is torn off.
    pub fn drain(&self) {
        while self.pending() > 0 {
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

async fn worker_loop(
    mut rx: JobReceiver,
    engine: FasterWhisper,
    config: Arc<RwLock<Config>>,
    state: Arc<StateMachine>,
) {
    while let Some(job) = rx.next().await {
        // A single bad job must never end the loop; every failure class
        // lands here, gets logged, and the job is abandoned.
        if let Err(e) = process_job(&engine, &config, &job).await {
            error!(source = %job.source.display(), "job failed: {e:#}");
        }
        let queue_empty = rx.complete();
        state.job_done(queue_empty);
    }
}

async fn process_job(
    engine: &FasterWhisper,
    config: &Arc<RwLock<Config>>,
    job: &Job,
) -> Result<()> {
    let (out_dir, clipboard_enabled, beep_off) = {
        let cfg = config.read();
        (cfg.output_dir(), cfg.clipboard, cfg.beep_off)
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output dir {}", out_dir.display()))?;

    // The engine names its output after the input stem, which would clobber
    // an existing subtitle. Let it write into a scratch dir, then move the
    // file to a collision-free target.
    let scratch = tempfile::tempdir_in(&out_dir).context("failed to create scratch dir")?;
    let produced = engine
        .transcribe_to_srt(
            &job.source,
            scratch.path(),
            job.model,
            job.language.as_deref(),
            beep_off,
        )
        .await?;

    let stem = job
        .source
        .file_stem()
        .ok_or_else(|| anyhow!("source has no stem: {}", job.source.display()))?;
    let srt_target = paths::resolve_unique(srt_output_path(&out_dir, stem));
    fs::rename(&produced, &srt_target)
        .with_context(|| format!("failed to move subtitle to {}", srt_target.display()))?;

    let subtitle = fs::read_to_string(&srt_target)
        .with_context(|| format!("failed to read subtitle {}", srt_target.display()))?;
    let transcript = srt::plain_text(&subtitle);

    let txt_target = paths::resolve_unique(srt_target.with_extension("txt"));
    fs::write(&txt_target, &transcript)
        .with_context(|| format!("failed to write transcript {}", txt_target.display()))?;

    info!(
        subtitle = %srt_target.display(),
        transcript = %txt_target.display(),
        lines = transcript.lines().count(),
        "job finished"
    );

    if clipboard_enabled && !job.skip_clipboard {
        let output = if job.fragment {
            text::fragment(&transcript)
        } else {
            transcript
        };
        publish_clipboard(&output);
    }

    Ok(())
}

/// Artifacts are already on disk; a clipboard hiccup is not worth failing
/// the job over.
fn publish_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
        Ok(()) => info!(chars = text.chars().count(), "transcript copied to clipboard"),
        Err(e) => warn!("failed to publish transcript to clipboard: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use skriv_core::Model;

    use super::*;

    fn job(tag: &str) -> Job {
        Job::single(format!("{tag}.wav"), Model::Base, None, false)
    }

    #[tokio::test]
    async fn jobs_dequeue_in_submission_order_per_producer() {
        let (queue, mut rx) = JobQueue::channel();
        let queue = Arc::new(queue);

        let mut producers = Vec::new();
        for producer in 0..2 {
            let queue = queue.clone();
            producers.push(tokio::spawn(async move {
                for n in 0..50 {
                    queue.submit(job(&format!("p{producer}-{n:02}"))).unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for p in producers {
            p.await.unwrap();
        }

        let mut seen: Vec<Vec<String>> = vec![Vec::new(), Vec::new()];
        while queue.pending() > 0 {
            let job = rx.next().await.unwrap();
            let name = job.source.to_string_lossy().into_owned();
            let producer = if name.starts_with("p0") { 0 } else { 1 };
            seen[producer].push(name);
            rx.complete();
        }

        for (producer, names) in seen.iter().enumerate() {
            assert_eq!(names.len(), 50);
            let mut sorted = names.clone();
            sorted.sort();
            assert_eq!(names, &sorted, "producer {producer} order not preserved");
        }
    }

    #[tokio::test]
    async fn complete_reports_emptiness() {
        let (queue, mut rx) = JobQueue::channel();
        queue.submit(job("a")).unwrap();
        queue.submit(job("b")).unwrap();

        rx.next().await.unwrap();
        assert!(!rx.complete());
        rx.next().await.unwrap();
        assert!(rx.complete());
        assert_eq!(queue.pending(), 0);
    }

    #[cfg(unix)]
    mod with_fake_engine {
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};

        use skriv_core::State;
        use tempfile::TempDir;

        use super::*;

        /// A stand-in engine: writes `<stem>.srt` with a fixed three-entry
        /// subtitle into the directory given by `--output_dir`.
        fn fake_engine(dir: &Path) -> PathBuf {
            let path = dir.join("fake-whisper-faster");
            let script = r#"#!/bin/sh
src="$1"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output_dir" ]; then out="$arg"; fi
  prev="$arg"
done
stem=$(basename "$src")
stem="${stem%.*}"
printf '1\n00:00:00,000 --> 00:00:01,000\nHello there.\n\n2\n00:00:01,000 --> 00:00:02,000\nSecond line.\n\n3\n00:00:02,000 --> 00:00:03,000\nAnd a third.\n' > "$out/$stem.srt"
"#;
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn setup(tmp: &TempDir) -> (Arc<RwLock<Config>>, Arc<StateMachine>, Pipeline) {
            let engine = fake_engine(tmp.path());
            let config = Config {
                engine_path: Some(engine),
                output_dir: Some(tmp.path().join("out")),
                clipboard: false,
                ..Default::default()
            };
            let config = Arc::new(RwLock::new(config));
            let (state, _rx) = StateMachine::new();
            let state = Arc::new(state);
            let pipeline = Pipeline::new(config.clone(), state.clone()).unwrap();
            (config, state, pipeline)
        }

        #[test]
        fn batch_of_two_processes_sequentially_and_returns_to_idle() {
            let tmp = TempDir::new().unwrap();
            let (_config, state, pipeline) = setup(&tmp);

            let first = tmp.path().join("alpha.wav");
            let second = tmp.path().join("beta.wav");
            fs::write(&first, b"riff").unwrap();
            fs::write(&second, b"riff").unwrap();

            // Scanner-confirmed batch: both jobs suppress the clipboard.
            assert!(state.begin_waiting());
            let jobs = Job::batch(vec![first, second], Model::Base, None, false);
            assert!(jobs.iter().all(|j| j.skip_clipboard));
            for j in jobs {
                pipeline.submit(j).unwrap();
            }
            state.resolve_waiting(true);
            assert_eq!(state.current(), State::Processing);

            pipeline.drain();
            // The final job_done may land just after pending hits zero.
            for _ in 0..50 {
                if state.current() == State::Idle {
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            assert_eq!(state.current(), State::Idle);

            let out = tmp.path().join("out");
            for stem in ["alpha", "beta"] {
                let srt = out.join(format!("{stem}.srt"));
                let txt = out.join(format!("{stem}.txt"));
                assert!(srt.exists(), "missing {}", srt.display());
                let transcript = fs::read_to_string(&txt).unwrap();
                assert_eq!(transcript, "Hello there.\nSecond line.\nAnd a third.");
            }
        }

        #[test]
        fn dotted_source_names_produce_matching_artifacts() {
            let tmp = TempDir::new().unwrap();
            let (_config, _state, pipeline) = setup(&tmp);

            // `resolve_unique` itself hands out names like `recording.1.wav`
            // when timestamps are off; the engine writes `recording.1.srt`.
            let source = tmp.path().join("recording.1.wav");
            fs::write(&source, b"riff").unwrap();
            pipeline
                .submit(Job::single(&source, Model::Base, None, false))
                .unwrap();
            pipeline.drain();

            let out = tmp.path().join("out");
            assert!(out.join("recording.1.srt").exists());
            let transcript = fs::read_to_string(out.join("recording.1.txt")).unwrap();
            assert_eq!(transcript, "Hello there.\nSecond line.\nAnd a third.");
        }

        #[test]
        fn colliding_stems_never_overwrite() {
            let tmp = TempDir::new().unwrap();
            let (_config, state, pipeline) = setup(&tmp);

            let out = tmp.path().join("out");
            fs::create_dir_all(&out).unwrap();
            fs::write(out.join("take.srt"), "old").unwrap();
            fs::write(out.join("take.txt"), "old").unwrap();

            let source = tmp.path().join("take.wav");
            fs::write(&source, b"riff").unwrap();
            pipeline
                .submit(Job::single(source, Model::Base, None, false))
                .unwrap();
            pipeline.drain();
            let _ = state;

            assert_eq!(fs::read_to_string(out.join("take.srt")).unwrap(), "old");
            assert_eq!(fs::read_to_string(out.join("take.txt")).unwrap(), "old");
            assert!(out.join("take.1.srt").exists());
            assert!(out.join("take.1.txt").exists());
        }

        #[test]
        fn engine_failure_abandons_job_and_continues() {
            let tmp = TempDir::new().unwrap();
            let engine = tmp.path().join("broken-engine");
            fs::write(&engine, "#!/bin/sh\nexit 3\n").unwrap();
            fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

            let config = Arc::new(RwLock::new(Config {
                engine_path: Some(engine),
                output_dir: Some(tmp.path().join("out")),
                clipboard: false,
                ..Default::default()
            }));
            let (state, _rx) = StateMachine::new();
            let state = Arc::new(state);
            let pipeline = Pipeline::new(config, state.clone()).unwrap();

            let source = tmp.path().join("bad.wav");
            fs::write(&source, b"riff").unwrap();
            pipeline
                .submit(Job::single(&source, Model::Base, None, false))
                .unwrap();
            pipeline.drain();

            // Loop is still alive and accepts more work.
            pipeline
                .submit(Job::single(&source, Model::Base, None, false))
                .unwrap();
            pipeline.drain();
            assert_eq!(pipeline.pending(), 0);
        }
    }
}
