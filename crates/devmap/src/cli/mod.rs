//! Command implementations.

pub mod config;
pub mod run;

use devmap_core::{Config, ConfigError};
use std::path::Path;

/// Load the config from an explicit path, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
