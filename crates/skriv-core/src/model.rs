//! Engine model selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The faster-whisper model families the engine ships with. The identifier
/// is passed through to the engine's `--model` argument; the engine resolves
/// it against its model directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    Tiny,
    Base,
    Small,
    Medium,
    LargeV2,
    LargeV3,
}

impl Model {
    /// Identifier understood by the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Tiny => "tiny",
            Model::Base => "base",
            Model::Small => "small",
            Model::Medium => "medium",
            Model::LargeV2 => "large-v2",
            Model::LargeV3 => "large-v3",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Base
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tiny" => Ok(Model::Tiny),
            "base" => Ok(Model::Base),
            "small" => Ok(Model::Small),
            "medium" => Ok(Model::Medium),
            "large-v2" => Ok(Model::LargeV2),
            "large-v3" | "large" => Ok(Model::LargeV3),
            other => Err(format!(
                "unknown model '{other}', expected one of: tiny, base, small, medium, large-v2, large-v3"
            )),
        }
    }
}
