//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Batch scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Labels per batch; also the number of concurrent calls per provider
    pub size: usize,

    /// Pause between batches in milliseconds
    pub pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 5,
            pause_ms: 2000,
        }
    }
}

/// Input file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Delimited file holding the raw labels
    pub path: PathBuf,

    /// Header name of the label column
    pub column: String,

    /// Field delimiter (single ASCII character)
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("devices.csv"),
            column: "origin_device_model".to_string(),
            delimiter: ',',
        }
    }
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Delimited file that merged rows are appended to
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cross_check.csv"),
        }
    }
}

/// Instruction template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Optional file replacing the built-in instruction template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// The two inference providers. Primary rows drive the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub primary: ProviderConfig,
    pub secondary: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig {
                name: "deepseek".to_string(),
                endpoint: "https://api.deepseek.com/chat/completions".to_string(),
                api_key: "${DEEPSEEK_API_KEY}".to_string(),
                model: "deepseek-reasoner".to_string(),
                system_prompt: Some("You are a helpful assistant.".to_string()),
                ..ProviderConfig::default()
            },
            secondary: ProviderConfig {
                name: "gemini".to_string(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                    .to_string(),
                api_key: "${GEMINI_API_KEY}".to_string(),
                model: "gemini-3-pro-preview".to_string(),
                system_prompt: None,
                ..ProviderConfig::default()
            },
        }
    }
}

/// One OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Name used in logs
    pub name: String,

    /// Full chat completions URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model identifier sent in the request body
    pub model: String,

    /// Optional system message sent before the user prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            system_prompt: None,
            temperature: 0.1,
            max_tokens: 1800,
            timeout_ms: 120_000,
        }
    }
}
