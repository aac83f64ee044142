//! Durable, append-only output of merged rows.
//!
//! The output file is never truncated: runs append to it. A header is written
//! only when the file was missing or empty, and only together with the first
//! row, so a run that produces nothing leaves the file untouched. Re-running
//! the same input appends the same rows again; nothing is deduplicated.

use crate::types::MergedRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Writes [`MergedRecord`] rows and flushes after each one.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
    header_pending: bool,
    rows_written: usize,
}

impl RecordWriter<File> {
    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: &Path) -> std::io::Result<Self> {
        let has_content = std::fs::metadata(path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::debug!(
            "Appending to {:?} ({})",
            path,
            if has_content { "existing rows" } else { "new file" }
        );
        Ok(Self::new(file, !has_content))
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap `writer`; `write_header` controls whether the first row is preceded by a header.
    pub fn new(writer: W, write_header: bool) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            header_pending: write_header,
            rows_written: 0,
        }
    }

    /// Write one row and flush it through to the underlying writer.
    pub fn write(&mut self, record: &MergedRecord) -> csv::Result<()> {
        if self.header_pending {
            self.writer.write_record(MergedRecord::COLUMNS)?;
            self.header_pending = false;
        }
        self.writer.write_record(record.to_row())?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows written by this writer (the header is not counted).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> std::io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InferenceRecord, SecondaryFields};

    fn merged(label: &str) -> MergedRecord {
        let mut primary = InferenceRecord::unknown(label);
        primary.mapped_brand = Some("Huawei".to_string());
        primary.cpu_core = Some(8);
        MergedRecord {
            primary,
            secondary: SecondaryFields {
                ram: Some("8 GB".to_string()),
                ..SecondaryFields::default()
            },
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_header_then_rows() {
        let mut writer = RecordWriter::new(Vec::new(), true);
        writer.write(&merged("TAS-AN00")).unwrap();
        writer.write(&merged("SM-G9910")).unwrap();
        assert_eq!(writer.rows_written(), 2);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], MergedRecord::COLUMNS.join(","));
        assert_eq!(lines[1], "TAS-AN00,Huawei,,,8,,,,,,,8 GB,");
    }

    #[test]
    fn test_no_rows_no_header() {
        let writer = RecordWriter::new(Vec::new(), true);
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_append_skips_header_for_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("cross_check.csv");

        let mut writer = RecordWriter::append_to(&path).unwrap();
        writer.write(&merged("TAS-AN00")).unwrap();
        drop(writer);

        let mut writer = RecordWriter::append_to(&path).unwrap();
        writer.write(&merged("TAS-AN00")).unwrap();
        drop(writer);

        let rows = read_rows(&path);
        // Header once, then the same row twice: re-runs append duplicates
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "origin_device_model");
        assert_eq!(rows[1], rows[2]);
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cross_check.csv");
        std::fs::write(&path, "").unwrap();

        let mut writer = RecordWriter::append_to(&path).unwrap();
        writer.write(&merged("V2049A")).unwrap();
        drop(writer);

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), MergedRecord::COLUMNS.len());
    }

    #[test]
    fn test_rows_flushed_before_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cross_check.csv");

        let mut writer = RecordWriter::append_to(&path).unwrap();
        writer.write(&merged("TAS-AN00")).unwrap();
        // Still open: the row must already be on disk
        assert_eq!(read_rows(&path).len(), 2);
        drop(writer);
    }
}
