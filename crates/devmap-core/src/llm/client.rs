//! Inference client: one provider plus the instruction template.

use super::provider::{LlmProvider, LlmRequest};
use crate::error::ProviderError;
use crate::extract::extract_array;
use crate::types::InferenceRecord;
use std::sync::Arc;

/// Sends labels to one provider and extracts the records from its answer.
///
/// Cheap to clone; clones share the provider and its HTTP client.
#[derive(Clone)]
pub struct InferenceClient {
    provider: Arc<dyn LlmProvider>,
    template: Arc<str>,
}

impl InferenceClient {
    pub fn new(provider: Box<dyn LlmProvider>, template: &str) -> Self {
        Self {
            provider: Arc::from(provider),
            template: Arc::from(template),
        }
    }

    /// Provider name for logging.
    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Map `labels` in a single request.
    ///
    /// Fails on any HTTP-level error and on text that holds no parseable
    /// array; the caller decides how far the failure reaches.
    pub async fn infer(&self, labels: &[String]) -> Result<Vec<InferenceRecord>, ProviderError> {
        let request = LlmRequest::map_devices(&self.template, labels);
        let response = self.provider.generate(&request).await?;
        tracing::debug!(
            provider = self.provider.name(),
            model = %response.model,
            latency_ms = response.latency_ms,
            tokens = ?response.tokens_used,
            "Response received"
        );
        Ok(extract_array(&response.text)?)
    }
}
