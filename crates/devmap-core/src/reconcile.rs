//! Per-label merge of the primary and secondary providers' records.
//!
//! No arbitration happens here: primary fields are copied verbatim and the
//! secondary answer is stored alongside under `secondary_*` columns.

use crate::types::{InferenceRecord, MergedRecord, SecondaryFields};
use std::collections::HashMap;

/// Secondary records of one batch, keyed by `origin_device_model`.
///
/// When a provider returns the same label more than once, the last record wins.
#[derive(Debug, Default)]
pub struct SecondaryIndex<'a> {
    by_label: HashMap<&'a str, &'a InferenceRecord>,
}

impl<'a> SecondaryIndex<'a> {
    pub fn build(records: &'a [InferenceRecord]) -> Self {
        let mut by_label = HashMap::with_capacity(records.len());
        for record in records {
            by_label.insert(record.origin_device_model.as_str(), record);
        }
        Self { by_label }
    }

    pub fn get(&self, label: &str) -> Option<&'a InferenceRecord> {
        self.by_label.get(label).copied()
    }

    /// Attach the secondary answer for `primary`'s label, or all-null fields.
    pub fn merge(&self, primary: InferenceRecord) -> MergedRecord {
        let secondary = self
            .get(&primary.origin_device_model)
            .map(SecondaryFields::from)
            .unwrap_or_default();
        MergedRecord { primary, secondary }
    }
}

/// One-shot merge of a primary record against a secondary result list.
pub fn reconcile(primary: InferenceRecord, secondary: &[InferenceRecord]) -> MergedRecord {
    SecondaryIndex::build(secondary).merge(primary)
}
