//! Configuration management for devmap.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Everything the pipeline needs (endpoints, keys, batch size,
//! pause, file paths) lives here and is passed explicitly to each component.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for devmap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch scheduling settings
    pub batch: BatchConfig,

    /// Input file settings
    pub input: InputConfig,

    /// Output file settings
    pub output: OutputConfig,

    /// Instruction template settings
    pub prompt: PromptConfig,

    /// Inference provider settings
    pub providers: ProvidersConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.devmap.devmap/config.toml
    /// - Linux: ~/.config/devmap/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\devmap\config\config.toml
    ///
    /// Falls back to ~/.devmap/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "devmap", "devmap")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".devmap").join("config.toml")
            })
    }

    /// Resolved input path (with ~ expansion).
    pub fn input_path(&self) -> PathBuf {
        expand(&self.input.path)
    }

    /// Resolved output path (with ~ expansion).
    pub fn output_path(&self) -> PathBuf {
        expand(&self.output.path)
    }

    /// Resolved prompt template path, if one is configured.
    pub fn template_path(&self) -> Option<PathBuf> {
        self.prompt.template_path.as_deref().map(expand)
    }

    /// Apply command-line overrides and re-validate.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(path) = &overrides.input {
            self.input.path = path.clone();
        }
        if let Some(path) = &overrides.output {
            self.output.path = path.clone();
        }
        if let Some(size) = overrides.batch_size {
            self.batch.size = size;
        }
        if let Some(pause) = overrides.pause_ms {
            self.batch.pause_ms = pause;
        }
        self.validate()
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub pause_ms: Option<u64>,
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}
