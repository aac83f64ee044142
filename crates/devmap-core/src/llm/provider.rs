//! LLM provider trait and request/response types.
//!
//! Defines the interface both inference providers implement, plus the
//! factory that builds a provider from its config section.

use crate::config::ProviderConfig;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use std::time::Duration;

/// A request to map one or more device labels.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Labels carried by this request, in prompt order
    pub labels: Vec<String>,
    /// Full user prompt (instruction template followed by the labels)
    pub prompt: String,
}

impl LlmRequest {
    /// Build a mapping request: the template, a newline, then one label per line.
    pub fn map_devices(template: &str, labels: &[String]) -> Self {
        Self {
            labels: labels.to_vec(),
            prompt: format!("{template}\n{}", labels.join("\n")),
        }
    }
}

/// The raw text a provider returned.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, expected to contain a JSON array somewhere
    pub text: String,
    /// Model identifier reported by the provider
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all inference providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Arc<dyn LlmProvider>` shared across spawned calls).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "deepseek", "gemini").
    fn name(&self) -> &str;

    /// Send the request and return the provider's text.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates a provider from its config section.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create a chat completions provider.
    ///
    /// `role` ("primary" / "secondary") names the provider in logs when the
    /// config leaves `name` empty, and prefixes configuration errors.
    pub fn create(
        role: &str,
        config: &ProviderConfig,
    ) -> Result<Box<dyn LlmProvider>, ConfigError> {
        let name = if config.name.is_empty() {
            role.to_string()
        } else {
            config.name.clone()
        };

        if config.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "providers.{role}.endpoint is not set"
            )));
        }
        if config.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "providers.{role}.model is not set"
            )));
        }
        let api_key = resolve_env_var(&config.api_key).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "API key for providers.{role} not set (configured as '{}')",
                config.api_key
            ))
        })?;

        Ok(Box::new(super::openai::ChatCompletionsProvider::new(
            &name, config, &api_key,
        )))
    }
}
