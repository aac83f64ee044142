//! Inference provider integration.
//!
//! Provides a provider abstraction over OpenAI-compatible chat completions
//! endpoints, the instruction template, and the client that turns a
//! provider's free-form answer into [`crate::types::InferenceRecord`]s.

pub(crate) mod client;
pub(crate) mod openai;
pub(crate) mod prompt;
pub(crate) mod provider;

pub use client::InferenceClient;
pub use openai::ChatCompletionsProvider;
pub use prompt::{load_template, DEFAULT_TEMPLATE};
pub use provider::{resolve_env_var, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
