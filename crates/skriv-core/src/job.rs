//! The unit of work handed to the transcription worker.

use std::path::PathBuf;

use crate::Model;

/// One queued transcription job. Created when a recording finishes or a
/// batch trigger fires, consumed exactly once by the worker, never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// The media file to transcribe. Must exist and be readable at enqueue
    /// time.
    pub source: PathBuf,
    /// Suppress clipboard publication for this job. Set for every job of a
    /// batch with more than one file.
    pub skip_clipboard: bool,
    /// Post-process the transcript for mid-sentence insertion.
    pub fragment: bool,
    /// Language hint for the engine, ISO 639-1.
    pub language: Option<String>,
    /// Engine model selector.
    pub model: Model,
}

impl Job {
    /// A job for a single source, eligible for clipboard publication.
    pub fn single(
        source: impl Into<PathBuf>,
        model: Model,
        language: Option<String>,
        fragment: bool,
    ) -> Self {
        Self {
            source: source.into(),
            skip_clipboard: false,
            fragment,
            language,
            model,
        }
    }

    /// Jobs for a batch of sources. Clipboard publication is suppressed
    /// exactly when the batch holds more than one file.
    pub fn batch(
        sources: Vec<PathBuf>,
        model: Model,
        language: Option<String>,
        fragment: bool,
    ) -> Vec<Self> {
        let skip_clipboard = sources.len() > 1;
        sources
            .into_iter()
            .map(|source| Self {
                source,
                skip_clipboard,
                fragment,
                language: language.clone(),
                model,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_job_publishes_to_clipboard() {
        let job = Job::single("a.wav", Model::Base, None, false);
        assert!(!job.skip_clipboard);
    }

    #[test]
    fn batch_of_one_publishes_to_clipboard() {
        let jobs = Job::batch(vec![PathBuf::from("a.wav")], Model::Base, None, false);
        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].skip_clipboard);
    }

    #[test]
    fn batch_of_two_suppresses_clipboard_on_every_job() {
        let jobs = Job::batch(
            vec![PathBuf::from("a.wav"), PathBuf::from("b.mp3")],
            Model::Base,
            Some("en".to_owned()),
            false,
        );
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.skip_clipboard));
        // Source order is preserved.
        assert_eq!(jobs[0].source, PathBuf::from("a.wav"));
        assert_eq!(jobs[1].source, PathBuf::from("b.mp3"));
    }
}
