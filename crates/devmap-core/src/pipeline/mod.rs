//! Batch reconciliation pipeline.
//!
//! Labels are processed in fixed-size batches. Within a batch every label
//! gets its own call to the primary provider, then its own call to the
//! secondary provider; the answers are merged and appended to the output
//! before the next batch starts.

pub mod orchestrator;

pub use orchestrator::{BatchOptions, BatchOrchestrator, CallOutcome, Progress};
