//! Error types for the device-mapping pipeline.
//!
//! Errors are split by where they can occur: configuration, input reading,
//! and provider calls. Only configuration, input and output errors abort a
//! run; provider errors are isolated to the single label they belong to.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for devmap operations.
#[derive(Error, Debug)]
pub enum DevmapError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input file could not be used
    #[error("Input error: {0}")]
    Input(#[from] InputFormatError),

    /// Provider call errors (only surfaced when a caller asks for them directly)
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// General I/O errors (output sink)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization errors (output sink)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// The input file is missing, unreadable, or lacks the label column.
///
/// Always fatal: it is raised before any provider call is made.
#[derive(Error, Debug)]
pub enum InputFormatError {
    /// The file could not be opened or read
    #[error("Cannot read input file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The header row has no column with the configured name
    #[error("Input file {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    /// The delimited content itself could not be parsed
    #[error("Invalid delimited input: {0}")]
    Csv(#[from] csv::Error),
}

/// Provider text did not contain a usable JSON array.
#[derive(Error, Debug)]
pub enum MalformedResponse {
    #[error("no array start")]
    NoArrayStart,

    #[error("unterminated array")]
    UnterminatedArray,

    #[error("invalid array: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single provider call failed.
///
/// Carries the HTTP status when one was received so callers can tell
/// auth problems from server trouble in the logs.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The call succeeded at the HTTP level but the text was unusable
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] MalformedResponse),

    /// Network error, non-2xx status, or an unreadable response envelope
    #[error("{provider} call failed: {message}")]
    CallFailure {
        provider: String,
        message: String,
        status_code: Option<u16>,
    },

    /// The request exceeded the provider's timeout
    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },
}

impl ProviderError {
    /// HTTP status code of the failed call, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::CallFailure { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Convenience type alias for devmap results.
pub type Result<T> = std::result::Result<T, DevmapError>;
