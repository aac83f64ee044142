//! Tolerant extraction of a JSON array from free-form provider text.
//!
//! Models wrap their answer in code fences, preambles and trailing
//! commentary. The array is located by bracket depth rather than by a
//! pattern so that nested arrays and objects inside records never end the
//! outer array early. Counting is lexical: brackets inside string literals
//! are counted like any other.

use crate::error::MalformedResponse;
use serde::de::DeserializeOwned;

const FENCE: &str = "```";

/// Locate the first complete top-level array in `text` and return it as a slice.
pub fn locate_array(text: &str) -> Result<&str, MalformedResponse> {
    let text = strip_fence(text.trim());

    let start = text.find('[').ok_or(MalformedResponse::NoArrayStart)?;

    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(MalformedResponse::UnterminatedArray)
}

/// Locate the array in `text` and deserialize its elements.
pub fn extract_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, MalformedResponse> {
    let candidate = locate_array(text)?;
    Ok(serde_json::from_str(candidate)?)
}

/// Remove an opening fence (with optional language tag) and a closing fence.
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };
    // The tag runs to the end of the first line; `[` never appears in one.
    let rest = match rest.find(['\n', '[']) {
        Some(pos) if rest.as_bytes()[pos] == b'\n' => &rest[pos + 1..],
        Some(pos) => &rest[pos..],
        None => rest,
    };
    rest.strip_suffix(FENCE).unwrap_or(rest).trim()
}
