// Re-export from sub-crates
pub use skriv_audio::{CaptureError, Recorder, Recording, RecordingHandle};
pub use skriv_core::{
    APP_NAME, APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LOG_LEVEL, Job, Model, State,
    StateMachine,
};
pub use skriv_engine::{EngineError, FasterWhisper};

// App-specific modules
pub mod capture;
pub mod cli;
pub mod event;
pub mod feedback;
pub mod hotkey;
pub mod icon;
pub mod scanner;
pub mod worker;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
