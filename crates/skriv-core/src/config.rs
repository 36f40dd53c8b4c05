//! Configuration management for skriv.
//!
//! The config file is read once at startup and is read-only afterwards,
//! except for the two tray-togglable flags (`fragment_mode`,
//! `file_scanner`) which the application mutates behind its own lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dirs::{config_dir, data_dir, home_dir};
use serde::{Deserialize, Serialize};

use crate::{APP_NAME, Model};

/// Configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Path to the external transcription engine executable
    /// (whisper-faster or compatible).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_path: Option<PathBuf>,

    /// Directory for recordings and transcription artifacts. Created if
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Directory the engine resolves model identifiers against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    /// Model passed to the engine.
    #[serde(default, skip_serializing_if = "is_default_model")]
    pub model: Model,

    /// Language hint for the engine (ISO 639-1). Auto-detect when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Chord starting and stopping a normal recording.
    #[serde(default = "default_hotkey_primary")]
    pub hotkey_primary: String,

    /// Chord for fragment-mode recordings.
    #[serde(default = "default_hotkey_fragment")]
    pub hotkey_fragment: String,

    /// Publish transcripts to the clipboard.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub clipboard: bool,

    /// Timestamp recording file names instead of reusing `recording.wav`.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub timestamped_names: bool,

    /// Offer clipboard file paths as a batch instead of recording.
    #[serde(default, skip_serializing_if = "is_false")]
    pub file_scanner: bool,

    /// Apply the fragment transform to clipboard output by default.
    #[serde(default, skip_serializing_if = "is_false")]
    pub fragment_mode: bool,

    /// Pass the engine its beep-disable flag.
    #[serde(default, skip_serializing_if = "is_false")]
    pub beep_off: bool,

    /// Discard recordings under this duration (in seconds).
    #[serde(
        default = "default_discard_duration",
        skip_serializing_if = "is_default_discard_duration"
    )]
    pub discard_duration: f32,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_model(m: &Model) -> bool {
    *m == Model::default()
}

fn default_hotkey_primary() -> String {
    "ctrl+alt+w".to_owned()
}

fn default_hotkey_fragment() -> String {
    "ctrl+alt+f".to_owned()
}

fn default_discard_duration() -> f32 {
    0.5
}

fn is_default_discard_duration(v: &f32) -> bool {
    (*v - default_discard_duration()).abs() < f32::EPSILON
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine_path: None,
            output_dir: None,
            model_dir: None,
            model: Model::default(),
            language: None,
            hotkey_primary: default_hotkey_primary(),
            hotkey_fragment: default_hotkey_fragment(),
            clipboard: true,
            timestamped_names: true,
            file_scanner: false,
            fragment_mode: false,
            beep_off: false,
            discard_duration: default_discard_duration(),
        }
    }
}

impl Config {
    /// Output directory, falling back to `~/skriv` when unset.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
        })
    }

    /// Model directory, falling back to the data dir.
    pub fn model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(|| {
            data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("models")
        })
    }

    /// Discard threshold as a Duration.
    pub fn discard_duration(&self) -> Duration {
        Duration::from_secs_f32(self.discard_duration.max(0.0))
    }
}

/// Template written on first run so the user has something to edit.
const CONFIG_TEMPLATE: &str = r#"# skriv configuration
#
# engine_path is required: the whisper-faster (or compatible) executable.
# engine_path = "/opt/whisper-faster/whisper-faster"
# output_dir = "~/skriv"
# model_dir = "/opt/whisper-faster/models"
# model = "base"            # tiny | base | small | medium | large-v2 | large-v3
# language = "en"           # omit for auto-detect

hotkey_primary = "ctrl+alt+w"
hotkey_fragment = "ctrl+alt+f"

# clipboard = true
# timestamped_names = true
# file_scanner = false
# fragment_mode = false
# beep_off = false
# discard_duration = 0.5
"#;

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    /// Useful for testing with temporary directories.
    pub fn with_config_dir<P: AsRef<Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{APP_NAME}.toml"));
        Self { config_path }
    }

    /// Uses an explicit config file path, e.g. from a `--config` flag.
    pub fn with_config_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{APP_NAME}.toml")))
    }

    /// Loads the configuration. A missing file is fatal: a commented
    /// template is written first so the diagnostic points at something
    /// editable.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            self.write_template()?;
            bail!(
                "no configuration found; a template was written to {}, set engine_path and rerun",
                self.config_path.display()
            );
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;
        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        Ok(config)
    }

    /// Saves the configuration, only writing non-default fields.
    pub fn save(&self, config: &Config) -> Result<()> {
        self.ensure_parent()?;
        let serialized =
            toml::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;
        Ok(())
    }

    fn write_template(&self) -> Result<()> {
        self.ensure_parent()?;
        fs::write(&self.config_path, CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write config template at {:?}", self.config_path))
    }

    fn ensure_parent(&self) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;
        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_config_is_fatal_and_writes_template() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path());

        let err = manager.load().unwrap_err();
        assert!(err.to_string().contains("template"));
        assert!(manager.config_path().exists());

        // The template itself parses once uncommented fields are enough.
        let reloaded = manager.load().unwrap();
        assert_eq!(reloaded.hotkey_primary, "ctrl+alt+w");
        assert!(reloaded.engine_path.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path());

        let config = Config {
            engine_path: Some(PathBuf::from("/opt/wf/whisper-faster")),
            model: Model::Small,
            language: Some("en".to_owned()),
            file_scanner: true,
            ..Default::default()
        };
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn broken_toml_is_an_error() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_config_dir(temp.path());
        fs::write(manager.config_path(), "model = 3").unwrap();
        assert!(manager.load().is_err());
    }

    #[test]
    fn default_directories_are_derived() {
        let config = Config::default();
        assert!(config.output_dir().ends_with(APP_NAME));
        assert!(config.model_dir().ends_with("models"));
        assert_eq!(config.discard_duration(), Duration::from_millis(500));
    }
}
