//! Instruction template sent ahead of the device labels.

use crate::error::ConfigError;
use std::path::Path;

/// Built-in instruction template.
///
/// Field names here must match [`crate::types::InferenceRecord`].
pub const DEFAULT_TEMPLATE: &str = r#"You are an expert in identifying mobile and consumer devices. Map each raw,
non-standard device model string below to the brand and model name consumers
know, and report the device's key specifications: CPU model, CPU core count,
RAM and screen refresh rate.
Example: TAS-AN00 is brand Huawei, model Mate 30, CPU Kirin 990, 8 cores,
8 GB RAM, 60 Hz refresh rate.

Follow these rules strictly:
1. Prioritize brand, model, CPU model and core count.
2. If a field cannot be confirmed, return null for it.
3. Never guess, infer or invent device information.
4. Output must be valid JSON with no explanatory text.
5. Any character outside the JSON counts as an invalid answer.

Field types (mandatory):
- origin_device_model: string (exactly the input string)
- mapped_brand: string or null
- mapped_device_model: string or null
- cpu_name: string or null
- cpu_core: int or null
- ram: string or null
- refresh_rate: string or null

Return only a JSON array with one object per input line.
"#;

/// Load the template from `path`, or fall back to the built-in one.
pub fn load_template(path: Option<&Path>) -> Result<String, ConfigError> {
    match path {
        Some(path) => {
            let template = std::fs::read_to_string(path)?;
            if template.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "prompt template {} is empty",
                    path.display()
                )));
            }
            Ok(template)
        }
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}
