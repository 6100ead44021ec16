//! Per-repository TOML configuration.
//!
//! `init` writes a `config.toml` with defaults inside the repository
//! directory; `open` reads it back. A missing file or missing field falls
//! back to the defaults, and unknown keys are ignored.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;

/// Top-level repository configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub repo: RepoSection,

    #[serde(default)]
    pub display: DisplaySection,
}

/// Repository identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSection {
    /// Branch created and made current by `init`.
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

/// Presentation settings consumed by front ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySection {
    /// Hex digits shown for abbreviated digests (merge parent lines).
    #[serde(default = "default_abbrev")]
    pub abbrev: usize,
}

fn default_branch() -> String {
    "master".into()
}
fn default_abbrev() -> usize {
    7
}

impl Default for RepoSection {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            abbrev: default_abbrev(),
        }
    }
}

impl RepoConfig {
    /// Load from `path`; an absent file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write this configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }
}
