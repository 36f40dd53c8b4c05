//! Command line interface.
//!
//! Flags override the loaded config for this run only; nothing is written
//! back. Positional inputs switch the process into batch mode.

use std::path::PathBuf;

use clap::Parser;
use skriv_core::{Config, LANGUAGES, Model};

#[derive(Debug, Parser)]
#[command(name = skriv_core::APP_NAME, version, about = "Hotkey speech-to-text coordinator")]
pub struct Cli {
    /// Media files to transcribe as a batch; the process exits when the
    /// batch is done.
    pub inputs: Vec<PathBuf>,

    /// Use a specific config file instead of the default location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Engine model for this run.
    #[arg(long)]
    pub model: Option<Model>,

    /// Language hint for the engine (ISO 639-1).
    #[arg(long, value_parser = parse_language)]
    pub language: Option<String>,

    /// Do not publish transcripts to the clipboard.
    #[arg(long)]
    pub no_clipboard: bool,

    /// Name recordings `recording.wav` instead of timestamping them.
    #[arg(long)]
    pub no_timestamp: bool,

    /// Apply the fragment transform to clipboard output.
    #[arg(long)]
    pub fragment: bool,

    /// Offer clipboard file paths as a batch instead of recording.
    #[arg(long)]
    pub scanner: bool,

    /// Pass the engine its beep-disable flag.
    #[arg(long)]
    pub beep_off: bool,

    /// Run without the tray indicator.
    #[arg(long)]
    pub no_tray: bool,
}

impl Cli {
    /// True when the run is a one-shot batch over the positional inputs.
    pub fn is_batch(&self) -> bool {
        !self.inputs.is_empty()
    }

    /// Folds the flags into the loaded config. Absent flags leave the
    /// config untouched.
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(language) = &self.language {
            config.language = Some(language.clone());
        }
        if self.no_clipboard {
            config.clipboard = false;
        }
        if self.no_timestamp {
            config.timestamped_names = false;
        }
        if self.fragment {
            config.fragment_mode = true;
        }
        if self.scanner {
            config.file_scanner = true;
        }
        if self.beep_off {
            config.beep_off = true;
        }
    }
}

fn parse_language(value: &str) -> Result<String, String> {
    let value = value.to_ascii_lowercase();
    if LANGUAGES.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(format!(
            "unknown language '{value}', expected one of: {}",
            LANGUAGES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["skriv"]).unwrap();
        assert!(!cli.is_batch());

        let mut config = Config::default();
        let before = config.clone();
        cli.apply(&mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "skriv",
            "--model",
            "small",
            "--language",
            "EN",
            "--no-clipboard",
            "--fragment",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.model, Model::Small);
        assert_eq!(config.language.as_deref(), Some("en"));
        assert!(!config.clipboard);
        assert!(config.fragment_mode);
        assert!(config.timestamped_names);
    }

    #[test]
    fn positional_inputs_mean_batch() {
        let cli = Cli::try_parse_from(["skriv", "a.wav", "b.mp3"]).unwrap();
        assert!(cli.is_batch());
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(Cli::try_parse_from(["skriv", "--language", "xx"]).is_err());
        assert!(Cli::try_parse_from(["skriv", "--model", "enormous"]).is_err());
    }
}
