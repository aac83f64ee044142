//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, ProviderConfig};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.size == 0 {
            return Err(ConfigError::ValidationError(
                "batch.size must be > 0".into(),
            ));
        }
        if self.input.column.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "input.column must not be empty".into(),
            ));
        }
        if !self.input.delimiter.is_ascii() {
            return Err(ConfigError::ValidationError(
                "input.delimiter must be a single ASCII character".into(),
            ));
        }
        validate_provider("providers.primary", &self.providers.primary)?;
        validate_provider("providers.secondary", &self.providers.secondary)?;
        Ok(())
    }
}

fn validate_provider(section: &str, provider: &ProviderConfig) -> Result<(), ConfigError> {
    if provider.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}.timeout_ms must be > 0"
        )));
    }
    if provider.max_tokens == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}.max_tokens must be > 0"
        )));
    }
    if !(0.0..=2.0).contains(&provider.temperature) {
        return Err(ConfigError::ValidationError(format!(
            "{section}.temperature must be between 0.0 and 2.0"
        )));
    }
    Ok(())
}
