//! devmap core - reconcile raw device-model strings across two inference providers.
//!
//! Raw device labels (`TAS-AN00`, `SM-G9910`, ...) are filtered, sent one per
//! call to two independent LLM providers, and the structured answers are
//! merged side by side into an append-only CSV.
//!
//! # Architecture
//!
//! ```text
//! CSV rows → Filter → labels → BatchOrchestrator ─┬─ primary calls   ─┐
//!                                                 └─ secondary calls ─┴→ Extract → Reconcile → CSV
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use devmap_core::{read_labels, BatchOrchestrator, Config, RecordWriter};
//!
//! #[tokio::main]
//! async fn main() -> devmap_core::Result<()> {
//!     let config = Config::load()?;
//!     let labels = read_labels(&config.input_path(), &config.input)?;
//!     let orchestrator = BatchOrchestrator::from_config(&config)?;
//!     let mut sink = RecordWriter::append_to(&config.output_path())?;
//!     let stats = orchestrator.run(&labels.labels, &mut sink, |_| {}).await?;
//!     println!("Rows written: {}", stats.rows_written);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod input;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, Overrides};
pub use error::{
    ConfigError, DevmapError, InputFormatError, MalformedResponse, ProviderError, Result,
};
pub use extract::{extract_array, locate_array};
pub use filter::{classify, should_skip, SkipReason};
pub use input::{read_labels, LabelSet};
pub use llm::InferenceClient;
pub use output::RecordWriter;
pub use pipeline::{BatchOptions, BatchOrchestrator, CallOutcome, Progress};
pub use reconcile::{reconcile, SecondaryIndex};
pub use types::{InferenceRecord, MergedRecord, RunStats, SecondaryFields};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
