//! OpenAI-compatible chat completions provider.
//!
//! Both inference services speak this dialect: a POST with
//! `{model, messages, temperature, max_tokens}` and bearer auth, answering
//! with the generated text in `choices[0].message.content`.

use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Chat completions provider bound to one endpoint, key and model.
pub struct ChatCompletionsProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: Option<String>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    pub fn new(name: &str, config: &ProviderConfig, api_key: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    fn call_failure(&self, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError::CallFailure {
            provider: self.name.clone(),
            message,
            status_code,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        provider: self.name.clone(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    self.call_failure(format!("request failed: {e}"), None)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(self.call_failure(
                format!("HTTP {status}: {text}"),
                Some(status.as_u16()),
            ));
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| self.call_failure(format!("failed to parse response: {e}"), None))?;

        let text = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.call_failure("response has no message content".to_string(), None))?;

        Ok(LlmResponse {
            text,
            model: chat_resp.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: chat_resp.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
