//! Core data types for the device-mapping pipeline.
//!
//! An [`InferenceRecord`] is what one provider says about one label; a
//! [`MergedRecord`] is the output row that puts both providers' answers
//! side by side.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One structured answer for one device label from one provider.
///
/// `None` always means "unknown". Providers are untrusted, so field values are
/// decoded leniently: numbers are accepted where strings are expected, numeric
/// strings where integers are expected, and placeholder text becomes `None`.
/// `origin_device_model` is the correlation key and must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRecord {
    /// The label this record answers, echoed back by the provider
    pub origin_device_model: String,

    /// Consumer-facing brand (e.g., "Huawei")
    #[serde(default, deserialize_with = "lenient_text")]
    pub mapped_brand: Option<String>,

    /// Consumer-facing model name (e.g., "Mate 30")
    #[serde(default, deserialize_with = "lenient_text")]
    pub mapped_device_model: Option<String>,

    /// SoC / CPU marketing name
    #[serde(default, deserialize_with = "lenient_text")]
    pub cpu_name: Option<String>,

    /// CPU core count
    #[serde(default, deserialize_with = "lenient_count")]
    pub cpu_core: Option<u32>,

    /// Memory size as reported (e.g., "8 GB")
    #[serde(default, deserialize_with = "lenient_text")]
    pub ram: Option<String>,

    /// Display refresh rate as reported (e.g., "60 Hz")
    #[serde(default, deserialize_with = "lenient_text")]
    pub refresh_rate: Option<String>,
}

impl InferenceRecord {
    /// A record for `label` with every attribute unknown.
    pub fn unknown(label: impl Into<String>) -> Self {
        Self {
            origin_device_model: label.into(),
            mapped_brand: None,
            mapped_device_model: None,
            cpu_name: None,
            cpu_core: None,
            ram: None,
            refresh_rate: None,
        }
    }
}

/// The secondary provider's attributes, stored under `secondary_*` columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryFields {
    pub mapped_brand: Option<String>,
    pub mapped_device_model: Option<String>,
    pub cpu_name: Option<String>,
    pub cpu_core: Option<u32>,
    pub ram: Option<String>,
    pub refresh_rate: Option<String>,
}

impl SecondaryFields {
    /// True when the secondary provider contributed nothing for this label.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&InferenceRecord> for SecondaryFields {
    fn from(record: &InferenceRecord) -> Self {
        Self {
            mapped_brand: record.mapped_brand.clone(),
            mapped_device_model: record.mapped_device_model.clone(),
            cpu_name: record.cpu_name.clone(),
            cpu_core: record.cpu_core,
            ram: record.ram.clone(),
            refresh_rate: record.refresh_rate.clone(),
        }
    }
}

/// One output row: the primary provider's record plus the secondary
/// provider's answer for the same label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub primary: InferenceRecord,
    pub secondary: SecondaryFields,
}

impl MergedRecord {
    /// Output column order, shared by the header and every row.
    pub const COLUMNS: [&'static str; 13] = [
        "origin_device_model",
        "mapped_brand",
        "mapped_device_model",
        "cpu_name",
        "cpu_core",
        "ram",
        "refresh_rate",
        "secondary_mapped_brand",
        "secondary_mapped_device_model",
        "secondary_cpu_name",
        "secondary_cpu_core",
        "secondary_ram",
        "secondary_refresh_rate",
    ];

    /// The label this row is about.
    pub fn label(&self) -> &str {
        &self.primary.origin_device_model
    }

    /// Render the row in [`Self::COLUMNS`] order; unknown values are empty.
    pub fn to_row(&self) -> [String; 13] {
        let p = &self.primary;
        let s = &self.secondary;
        [
            p.origin_device_model.clone(),
            text(&p.mapped_brand),
            text(&p.mapped_device_model),
            text(&p.cpu_name),
            count(p.cpu_core),
            text(&p.ram),
            text(&p.refresh_rate),
            text(&s.mapped_brand),
            text(&s.mapped_device_model),
            text(&s.cpu_name),
            count(s.cpu_core),
            text(&s.ram),
            text(&s.refresh_rate),
        ]
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Labels dispatched (each one went to both providers)
    pub labels: usize,
    /// Batches processed
    pub batches: usize,
    /// Records received from the primary provider
    pub primary_records: usize,
    /// Records received from the secondary provider
    pub secondary_records: usize,
    /// Primary calls that failed (HTTP, timeout or malformed text)
    pub primary_failures: usize,
    /// Secondary calls that failed
    pub secondary_failures: usize,
    /// Rows written to the output sink
    pub rows_written: usize,
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn count(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Placeholder strings models emit instead of `null`.
fn is_placeholder(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("unknown")
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!is_placeholder(trimmed)).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                trimmed.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    })
}
