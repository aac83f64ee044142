//! Reading device labels from a delimited input file.
//!
//! Input files come from spreadsheets and database exports, so decoding is
//! forgiving: a leading byte-order marker is skipped, invalid UTF-8 bytes are
//! dropped, rows may be ragged, and header names are matched after trimming
//! whitespace and stray quotes.

use crate::config::InputConfig;
use crate::error::InputFormatError;
use crate::filter::{classify, SkipReason};
use std::path::Path;

/// Labels that survived the filter, plus what was dropped along the way.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    /// Kept labels in input order (duplicates preserved)
    pub labels: Vec<String>,
    /// Data rows read (header excluded)
    pub rows_read: usize,
    /// Dropped rows per rule
    pub dropped: Vec<(SkipReason, usize)>,
}

impl LabelSet {
    /// Total number of dropped rows.
    pub fn dropped_total(&self) -> usize {
        self.dropped.iter().map(|(_, n)| n).sum()
    }

    fn record_drop(&mut self, reason: SkipReason) {
        match self.dropped.iter_mut().find(|(r, _)| *r == reason) {
            Some((_, n)) => *n += 1,
            None => self.dropped.push((reason, 1)),
        }
    }
}

/// Read and filter labels from the file described by `config`.
pub fn read_labels(path: &Path, config: &InputConfig) -> Result<LabelSet, InputFormatError> {
    let bytes = std::fs::read(path).map_err(|source| InputFormatError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let content = decode_lossy(&bytes);
    let labels = labels_from_str(&content, config).map_err(|e| match e {
        InputFormatError::MissingColumn { column, .. } => InputFormatError::MissingColumn {
            path: path.to_path_buf(),
            column,
        },
        other => other,
    })?;
    tracing::debug!(
        "Read {} rows from {:?}, kept {}",
        labels.rows_read,
        path,
        labels.labels.len()
    );
    Ok(labels)
}

/// Filter labels out of already-decoded delimited text.
pub fn labels_from_str(content: &str, config: &InputConfig) -> Result<LabelSet, InputFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let wanted = normalize_header(&config.column);
    let column = reader
        .headers()?
        .iter()
        .position(|h| normalize_header(h) == wanted)
        .ok_or_else(|| InputFormatError::MissingColumn {
            path: Default::default(),
            column: config.column.clone(),
        })?;

    let mut set = LabelSet::default();
    for result in reader.records() {
        let record = result?;
        set.rows_read += 1;
        let field = record.get(column);
        match classify(field) {
            Some(reason) => set.record_drop(reason),
            None => set.labels.extend(field.map(str::to_string)),
        }
    }
    Ok(set)
}

/// Decode UTF-8, silently dropping invalid byte sequences and a leading BOM.
fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    match out.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => out,
    }
}

fn normalize_header(name: &str) -> &str {
    name.trim().trim_matches('"').trim()
}
