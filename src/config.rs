//! Configuration file.
//!
//! A small TOML document controlling how history is read:
//!
//! ```toml
//! git = "git"
//! log_args = ["--all"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Settings for reading a repository's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Program invoked to produce the log
    pub git: String,

    /// Extra arguments appended to `git log --pretty=raw`
    pub log_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            log_args: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a config from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Self::from_toml(&content)?)
    }
}

/// Errors loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
}
