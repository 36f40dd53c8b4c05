//! External transcription engine for skriv.
//!
//! The heavy lifting happens in a separate `whisper-faster` style process;
//! this crate builds the invocation, maps its failure modes, and reduces
//! the subtitle file it produces to plain spoken text.

mod faster;
pub mod srt;

use std::path::PathBuf;

pub use faster::{FasterWhisper, srt_output_path};
use thiserror::Error;

/// Errors that can occur while driving the external engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine executable not found: {0}")]
    NotFound(String),

    #[error("source file has no usable name: {0}")]
    InvalidSource(PathBuf),

    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("engine produced no subtitle file at {0}")]
    MissingOutput(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
