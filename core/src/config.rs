//! Process-wide switches for resolution and execution.
//!
//! A [`Config`] is owned by the [`CommandTree`](crate::CommandTree) and read
//! during every resolution and execution, so separate trees (and separate
//! tests) never share state.
//!
//! # Example YAML
//!
//! ```yaml
//! enable_prefix_matching: true
//! enable_case_insensitive: false
//! enable_command_sorting: true
//! enable_traverse_run_hooks: false
//! ```
//!
//! Missing keys take their defaults.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Behaviour switches consulted by the resolver and execution engine.
///
/// # Examples
///
/// ```
/// use cmdtree_core::Config;
///
/// let config = Config::default();
/// assert!(!config.enable_prefix_matching);
/// assert!(config.enable_command_sorting);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Accept an unambiguous prefix of a subcommand name or alias.
    pub enable_prefix_matching: bool,
    /// Match subcommand names and aliases case-insensitively.
    pub enable_case_insensitive: bool,
    /// Sort children by name when they are listed.
    pub enable_command_sorting: bool,
    /// Run every ancestor's persistent pre/post hooks instead of only the
    /// nearest one.
    pub enable_traverse_run_hooks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_prefix_matching: false,
            enable_case_insensitive: false,
            enable_command_sorting: true,
            enable_traverse_run_hooks: false,
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::Error::Io) if the file cannot be read, or
    /// [`Yaml`](crate::Error::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::Error::Io) if the file cannot be written, or
    /// [`Yaml`](crate::Error::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
