//! Core types and configuration for skriv.
//!
//! This crate provides platform-agnostic types that can be used across
//! all skriv sub-crates.

mod config;
mod job;
mod model;
pub mod paths;
mod state;
pub mod text;

pub use config::{Config, ConfigManager};
pub use job::Job;
pub use model::Model;
pub use state::{State, StateMachine};

/// Application name
pub const APP_NAME: &str = "skriv";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Skriv";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Media extensions the file scanner accepts as transcription sources.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "m4a", "ogg", "flac", "opus", "aac", "wma", "mp4", "mkv", "webm", "avi", "mov",
    "mpga", "mpeg",
];

/// Languages the engine accepts as a `--language` hint (ISO 639-1).
pub const LANGUAGES: &[&str] = &[
    "en", "ru", "de", "fr", "es", "it", "pt", "nl", "pl", "uk", "cs", "sv", "no", "da", "fi", "tr",
    "ja", "ko", "zh", "ar", "hi",
];
